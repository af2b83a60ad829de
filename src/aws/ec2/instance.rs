//! EC2 instance lifecycle operations

use super::Ec2Client;
use super::types::LaunchTemplate;
use crate::wait::{PollConfig, poll_until};
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{InstanceStateName, InstanceType, ResourceType, Tag, TagSpecification};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::info;

impl Ec2Client {
    /// Request exactly one instance with the given template and security
    /// group, returning its id. The instance is still `pending` when this
    /// returns; follow up with [`Ec2Client::wait_for_running`].
    pub async fn run_instance(
        &self,
        template: &LaunchTemplate,
        security_group_id: &str,
    ) -> Result<String> {
        let instance_type: InstanceType = template
            .instance_type
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid instance type: {}", template.instance_type))?;

        info!(
            ami = %template.ami_id,
            instance_type = %template.instance_type,
            security_group_id = %security_group_id,
            "Launching instance"
        );

        let user_data_b64 = STANDARD.encode(template.user_data.as_bytes());

        let response = self
            .client
            .run_instances()
            .image_id(&template.ami_id)
            .instance_type(instance_type)
            .key_name(&template.key_name)
            .security_group_ids(security_group_id)
            .min_count(1)
            .max_count(1)
            .user_data(user_data_b64)
            .tag_specifications(
                TagSpecification::builder()
                    .resource_type(ResourceType::Instance)
                    .tags(Tag::builder().key("Name").value("burnbox-sandbox").build())
                    .build(),
            )
            .send()
            .await
            .context("Failed to launch instance")?;

        let instance_id = response
            .instances()
            .first()
            .context("No instance returned")?
            .instance_id()
            .context("No instance ID")?
            .to_string();

        info!(instance_id = %instance_id, "Instance launched");

        Ok(instance_id)
    }

    /// Poll until the instance reports `running` with a public IP
    /// assigned, returning that IP.
    ///
    /// The loop is unbounded; callers wrap it in `tokio::time::timeout`.
    /// An instance that lands in any state other than `pending` or
    /// `running` aborts the wait with the provider's state reason.
    pub async fn wait_for_running(&self, instance_id: &str) -> Result<String> {
        poll_until(
            &PollConfig::default(),
            &format!("EC2 instance {instance_id} running"),
            || async {
                let response = self
                    .client
                    .describe_instances()
                    .instance_ids(instance_id)
                    .send()
                    .await
                    .context("Failed to describe instance")?;

                let instance = response
                    .reservations()
                    .first()
                    .and_then(|r| r.instances().first())
                    .context("Instance not found")?;

                let state = instance
                    .state()
                    .and_then(|s| s.name())
                    .unwrap_or(&InstanceStateName::Pending);

                match state {
                    InstanceStateName::Running => match instance.public_ip_address() {
                        Some(ip) => {
                            info!(instance_id = %instance_id, public_ip = %ip, "Instance is running");
                            Ok(Some(ip.to_string()))
                        }
                        // Running but the address is not visible yet
                        None => Ok(None),
                    },
                    InstanceStateName::Pending => Ok(None),
                    _ => {
                        let reason = instance
                            .state_reason()
                            .and_then(|r| r.message())
                            .unwrap_or("no state reason provided");
                        anyhow::bail!(
                            "Instance {} entered unexpected state {:?}: {}",
                            instance_id,
                            state,
                            reason
                        );
                    }
                }
            },
        )
        .await
    }

    /// Terminate an instance
    pub async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        info!(instance_id = %instance_id, "Terminating instance");

        self.client
            .terminate_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .context("Failed to terminate instance")?;

        Ok(())
    }
}
