//! Sandbox instance lifecycle: launch, readiness, idle reaping, teardown.

use crate::aws::ec2::{Ec2Operations, LaunchTemplate};
use crate::aws::error::classify_anyhow_error;
use crate::defaults::INSTANCE_USERNAME;
use crate::error::{AppError, AppResult};
use crate::orchestrator::registry::{InstanceRecord, InstanceRegistry};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Drives a sandbox through `Requested → Running → Terminated`.
///
/// Launch blocks (bounded) until the instance is reachable, records its
/// connection metadata, and arms a cancellable idle reaper. Terminate tears
/// an instance down on demand and disarms its reaper.
pub struct InstanceLifecycle<E> {
    ec2: Arc<E>,
    template: LaunchTemplate,
    key_path: PathBuf,
    ready_timeout: Duration,
    idle_timeout: Duration,
    registry: InstanceRegistry,
}

impl<E: Ec2Operations + 'static> InstanceLifecycle<E> {
    pub fn new(
        ec2: Arc<E>,
        template: LaunchTemplate,
        key_path: PathBuf,
        ready_timeout: Duration,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            ec2,
            template,
            key_path,
            ready_timeout,
            idle_timeout,
            registry: InstanceRegistry::new(),
        }
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    /// Launch one sandbox into the given security group and wait for it to
    /// become reachable.
    ///
    /// On success the stored record is overwritten with the new instance
    /// and its idle reaper is armed. A readiness timeout best-effort
    /// terminates the stuck instance and surfaces as
    /// [`AppError::ProvisioningTimeout`]; no record is kept in that case.
    pub async fn launch(&self, security_group_id: &str) -> AppResult<InstanceRecord> {
        let instance_id = self
            .ec2
            .run_instance(&self.template, security_group_id)
            .await?;

        let wait = self.ec2.wait_for_running(&instance_id);
        let public_ip = match tokio::time::timeout(self.ready_timeout, wait).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    instance_id = %instance_id,
                    timeout_secs = self.ready_timeout.as_secs(),
                    "Instance never became ready, tearing it down"
                );
                if let Err(e) = self.ec2.terminate_instance(&instance_id).await {
                    warn!(
                        instance_id = %instance_id,
                        error = %format!("{e:#}"),
                        "Failed to tear down stuck instance"
                    );
                }
                return Err(AppError::ProvisioningTimeout {
                    instance_id,
                    timeout_secs: self.ready_timeout.as_secs(),
                });
            }
        };

        let record = InstanceRecord {
            instance_id: instance_id.clone(),
            public_ip,
            username: INSTANCE_USERNAME.to_string(),
            key_path: self.key_path.clone(),
            launched_at: Utc::now(),
        };

        let reaper = self.registry.store(record.clone()).await;
        self.spawn_reaper(instance_id, reaper);

        Ok(record)
    }

    /// Arm the idle reaper: after `idle_timeout` the instance is
    /// terminated and the stored record cleared if it still refers to it.
    ///
    /// Termination failures here are logged and swallowed; there is no
    /// caller to report to. The token disarms the reaper when the instance
    /// is manually terminated first.
    fn spawn_reaper(&self, instance_id: String, cancel: CancellationToken) {
        let ec2 = Arc::clone(&self.ec2);
        let registry = self.registry.clone();
        let idle_timeout = self.idle_timeout;

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(instance_id = %instance_id, "Idle reaper disarmed");
                }
                _ = tokio::time::sleep(idle_timeout) => {
                    info!(
                        instance_id = %instance_id,
                        idle_secs = idle_timeout.as_secs(),
                        "Idle timeout reached, terminating instance"
                    );
                    if let Err(e) = ec2.terminate_instance(&instance_id).await {
                        if classify_anyhow_error(&e).is_not_found() {
                            debug!(instance_id = %instance_id, "Instance already gone");
                        } else {
                            warn!(
                                instance_id = %instance_id,
                                error = %format!("{e:#}"),
                                "Idle termination failed"
                            );
                        }
                    }
                    registry.clear_if(&instance_id).await;
                }
            }
        });
    }

    /// Terminate an instance on demand.
    ///
    /// If the stored record still refers to this instance, its pending
    /// reaper is disarmed and the record cleared; otherwise both are left
    /// untouched.
    pub async fn terminate(&self, instance_id: &str) -> AppResult<()> {
        self.ec2.terminate_instance(instance_id).await?;

        if self.registry.cancel_and_clear_if(instance_id).await {
            debug!(instance_id = %instance_id, "Cleared sandbox record and disarmed idle reaper");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEc2;

    const READY_TIMEOUT: Duration = Duration::from_secs(30);
    const IDLE_TIMEOUT: Duration = Duration::from_secs(900);

    fn lifecycle(fake: Arc<FakeEc2>) -> InstanceLifecycle<FakeEc2> {
        InstanceLifecycle::new(
            fake,
            LaunchTemplate {
                ami_id: "ami-0test".to_string(),
                instance_type: "t3.micro".to_string(),
                key_name: "sandbox-key".to_string(),
                user_data: "#!/bin/bash\n".to_string(),
            },
            PathBuf::from("/keys/sandbox-key.pem"),
            READY_TIMEOUT,
            IDLE_TIMEOUT,
        )
    }

    /// Let spawned reaper tasks observe an advanced clock.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn launch_stores_record_with_connection_metadata() {
        let fake = Arc::new(FakeEc2::new());
        let lifecycle = lifecycle(Arc::clone(&fake));

        let record = lifecycle.launch("sg-1").await.unwrap();

        assert!(record.instance_id.starts_with("i-"));
        assert!(!record.public_ip.is_empty());
        assert_eq!(record.username, "ubuntu");
        assert_eq!(record.key_path, PathBuf::from("/keys/sandbox-key.pem"));

        let stored = lifecycle.registry().current().await.unwrap();
        assert_eq!(stored.instance_id, record.instance_id);
    }

    #[tokio::test(start_paused = true)]
    async fn launch_failure_leaves_no_record() {
        let fake = Arc::new(FakeEc2::new().with_run_failure("InstanceLimitExceeded"));
        let lifecycle = lifecycle(Arc::clone(&fake));

        let err = lifecycle.launch("sg-1").await.unwrap_err();

        assert!(err.to_string().contains("InstanceLimitExceeded"));
        assert!(lifecycle.registry().current().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_timeout_surfaces_as_provisioning_timeout() {
        let fake = Arc::new(FakeEc2::new().with_hanging_wait());
        let lifecycle = lifecycle(Arc::clone(&fake));

        let err = lifecycle.launch("sg-1").await.unwrap_err();

        assert!(matches!(err, AppError::ProvisioningTimeout { .. }));
        assert!(lifecycle.registry().current().await.is_none());
        // The stuck instance was torn down best-effort
        assert_eq!(fake.terminated().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_reaper_terminates_instance_and_clears_record() {
        let fake = Arc::new(FakeEc2::new());
        let lifecycle = lifecycle(Arc::clone(&fake));

        let record = lifecycle.launch("sg-1").await.unwrap();
        assert!(fake.terminated().is_empty());

        tokio::time::advance(IDLE_TIMEOUT + Duration::from_secs(1)).await;
        settle().await;

        assert_eq!(fake.terminated(), vec![record.instance_id]);
        assert!(lifecycle.registry().current().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_terminate_disarms_the_reaper() {
        let fake = Arc::new(FakeEc2::new());
        let lifecycle = lifecycle(Arc::clone(&fake));

        let record = lifecycle.launch("sg-1").await.unwrap();
        lifecycle.terminate(&record.instance_id).await.unwrap();
        assert!(lifecycle.registry().current().await.is_none());

        tokio::time::advance(IDLE_TIMEOUT + Duration::from_secs(1)).await;
        settle().await;

        // Only the manual terminate reached the provider
        assert_eq!(fake.terminated(), vec![record.instance_id]);
    }

    #[tokio::test(start_paused = true)]
    async fn terminate_of_unknown_instance_keeps_record() {
        let fake = Arc::new(FakeEc2::new());
        let lifecycle = lifecycle(Arc::clone(&fake));

        let record = lifecycle.launch("sg-1").await.unwrap();
        lifecycle.terminate("i-something-else").await.unwrap();

        let stored = lifecycle.registry().current().await.unwrap();
        assert_eq!(stored.instance_id, record.instance_id);
    }

    #[tokio::test(start_paused = true)]
    async fn overwritten_instance_is_still_reaped() {
        let fake = Arc::new(FakeEc2::new());
        let lifecycle = lifecycle(Arc::clone(&fake));

        let first = lifecycle.launch("sg-1").await.unwrap();

        tokio::time::advance(IDLE_TIMEOUT + Duration::from_secs(1)).await;
        settle().await;

        // First sandbox reaped before the second launch
        assert_eq!(fake.terminated(), vec![first.instance_id.clone()]);
        assert!(lifecycle.registry().current().await.is_none());

        let second = lifecycle.launch("sg-1").await.unwrap();
        assert_ne!(second.instance_id, first.instance_id);

        let stored = lifecycle.registry().current().await.unwrap();
        assert_eq!(stored.instance_id, second.instance_id);
    }

    #[tokio::test(start_paused = true)]
    async fn reaper_of_older_instance_spares_newer_record() {
        let fake = Arc::new(FakeEc2::new());
        let lifecycle = lifecycle(Arc::clone(&fake));

        let first = lifecycle.launch("sg-1").await.unwrap();
        // Second launch overwrites the record while the first reaper is
        // still armed
        let second = lifecycle.launch("sg-1").await.unwrap();

        tokio::time::advance(IDLE_TIMEOUT + Duration::from_secs(1)).await;
        settle().await;

        let terminated = fake.terminated();
        assert!(terminated.contains(&first.instance_id));
        assert!(terminated.contains(&second.instance_id));
        assert!(lifecycle.registry().current().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reaper_swallows_termination_failure() {
        let fake = Arc::new(FakeEc2::new().with_terminate_failure("InvalidInstanceID.NotFound"));
        let lifecycle = lifecycle(Arc::clone(&fake));

        lifecycle.launch("sg-1").await.unwrap();

        tokio::time::advance(IDLE_TIMEOUT + Duration::from_secs(1)).await;
        settle().await;

        // The failure is logged and discarded; bookkeeping still clears
        assert!(lifecycle.registry().current().await.is_none());
    }
}
