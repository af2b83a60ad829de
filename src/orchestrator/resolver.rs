//! Find-or-create resolution of the sandbox security group.

use crate::aws::ec2::Ec2Operations;
use crate::aws::error::classify_anyhow_error;
use crate::error::AppResult;
use anyhow::Context;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

struct CachedGroup {
    group_id: String,
    resolved_at: Instant,
}

/// Resolves the configured security group to its id, creating it on first
/// use.
///
/// The resolved id is cached and trusted for `cache_ttl`, then re-validated
/// against the provider. The cache lock is held across the provider calls
/// so concurrent first launches cannot create duplicate groups.
pub struct SecurityGroupResolver<E> {
    ec2: Arc<E>,
    group_name: String,
    cache_ttl: Duration,
    cached: Mutex<Option<CachedGroup>>,
}

impl<E: Ec2Operations> SecurityGroupResolver<E> {
    pub fn new(ec2: Arc<E>, group_name: impl Into<String>, cache_ttl: Duration) -> Self {
        Self {
            ec2,
            group_name: group_name.into(),
            cache_ttl,
            cached: Mutex::new(None),
        }
    }

    /// Find-or-create the sandbox security group and return its id.
    ///
    /// `requester_ip` scopes the SSH ingress rule when the group has to be
    /// created. The CIDR is locked in at creation for the life of the
    /// group; later callers with different addresses reuse the group
    /// as-is.
    pub async fn resolve(&self, requester_ip: Ipv4Addr) -> AppResult<String> {
        let mut cached = self.cached.lock().await;

        if let Some(entry) = cached.as_ref() {
            if entry.resolved_at.elapsed() < self.cache_ttl {
                debug!(group_id = %entry.group_id, "Reusing cached security group");
                return Ok(entry.group_id.clone());
            }
            debug!(group_id = %entry.group_id, "Cached security group is stale, re-validating");
        }

        if let Some(group_id) = self.ec2.find_security_group(&self.group_name).await? {
            info!(group_id = %group_id, name = %self.group_name, "Found existing security group");
            *cached = Some(CachedGroup {
                group_id: group_id.clone(),
                resolved_at: Instant::now(),
            });
            return Ok(group_id);
        }

        let ssh_cidr = format!("{requester_ip}/32");
        let group_id = match self
            .ec2
            .create_security_group(&self.group_name, &ssh_cidr)
            .await
        {
            Ok(group_id) => group_id,
            Err(e) if classify_anyhow_error(&e).is_already_exists() => {
                // Lost a creation race with another process using the same
                // group name; the group exists now, so fall back to lookup.
                self.ec2
                    .find_security_group(&self.group_name)
                    .await?
                    .context("Security group reported as duplicate but not found")?
            }
            Err(e) => return Err(e.into()),
        };

        *cached = Some(CachedGroup {
            group_id: group_id.clone(),
            resolved_at: Instant::now(),
        });

        Ok(group_id)
    }
}
