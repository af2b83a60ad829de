//! Security group lookup and creation

use super::Ec2Client;
use crate::defaults::{
    LISTENER_PORT_END, LISTENER_PORT_START, SECURITY_GROUP_DESCRIPTION, SSH_PORT,
};
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{Filter, IpPermission, IpRange};
use tracing::{debug, info};

impl Ec2Client {
    /// Look up a security group by name, returning its id if one exists.
    pub async fn find_security_group(&self, name: &str) -> Result<Option<String>> {
        let response = self
            .client
            .describe_security_groups()
            .filters(Filter::builder().name("group-name").values(name).build())
            .send()
            .await
            .context("Failed to describe security groups")?;

        let group_id = response
            .security_groups()
            .first()
            .and_then(|g| g.group_id())
            .map(str::to_string);

        debug!(name = %name, group_id = ?group_id, "Security group lookup");

        Ok(group_id)
    }

    /// Create the sandbox security group with its two ingress rules: SSH
    /// restricted to the requester's address, and the listener port range
    /// open to all sources.
    ///
    /// `ssh_cidr` is the requester's address in CIDR form (e.g.,
    /// "203.0.113.5/32"). The group lands in the region's default VPC.
    pub async fn create_security_group(&self, name: &str, ssh_cidr: &str) -> Result<String> {
        info!(name = %name, ssh_cidr = %ssh_cidr, "Creating security group");

        let create_response = self
            .client
            .create_security_group()
            .group_name(name)
            .description(SECURITY_GROUP_DESCRIPTION)
            .send()
            .await
            .context("Failed to create security group")?;

        let group_id = create_response
            .group_id()
            .context("No security group ID in response")?
            .to_string();

        let ssh_permission = IpPermission::builder()
            .ip_protocol("tcp")
            .from_port(SSH_PORT)
            .to_port(SSH_PORT)
            .ip_ranges(
                IpRange::builder()
                    .cidr_ip(ssh_cidr)
                    .description("SSH access for the requester")
                    .build(),
            )
            .build();

        let listener_permission = IpPermission::builder()
            .ip_protocol("tcp")
            .from_port(LISTENER_PORT_START)
            .to_port(LISTENER_PORT_END)
            .ip_ranges(
                IpRange::builder()
                    .cidr_ip("0.0.0.0/0")
                    .description("Ephemeral listener range")
                    .build(),
            )
            .build();

        self.client
            .authorize_security_group_ingress()
            .group_id(&group_id)
            .ip_permissions(ssh_permission)
            .ip_permissions(listener_permission)
            .send()
            .await
            .context("Failed to add ingress rules to security group")?;

        info!(group_id = %group_id, "Security group created with SSH and listener rules");

        Ok(group_id)
    }
}
