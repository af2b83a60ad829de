//! EC2 operations trait for testing

use super::Ec2Client;
use super::types::LaunchTemplate;
use anyhow::Result;
use std::future::Future;

/// Trait over the EC2 operations the orchestration layer needs, so it can
/// be exercised against a fake instead of real AWS.
pub trait Ec2Operations: Send + Sync {
    /// Request exactly one instance, returning its id
    fn run_instance(
        &self,
        template: &LaunchTemplate,
        security_group_id: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Wait until the instance is running, returning its public IP
    fn wait_for_running(&self, instance_id: &str) -> impl Future<Output = Result<String>> + Send;

    /// Terminate an instance
    fn terminate_instance(&self, instance_id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Look up a security group by name
    fn find_security_group(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Create the sandbox security group with its ingress rules
    fn create_security_group(
        &self,
        name: &str,
        ssh_cidr: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

impl Ec2Operations for Ec2Client {
    async fn run_instance(
        &self,
        template: &LaunchTemplate,
        security_group_id: &str,
    ) -> Result<String> {
        Ec2Client::run_instance(self, template, security_group_id).await
    }

    async fn wait_for_running(&self, instance_id: &str) -> Result<String> {
        Ec2Client::wait_for_running(self, instance_id).await
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        Ec2Client::terminate_instance(self, instance_id).await
    }

    async fn find_security_group(&self, name: &str) -> Result<Option<String>> {
        Ec2Client::find_security_group(self, name).await
    }

    async fn create_security_group(&self, name: &str, ssh_cidr: &str) -> Result<String> {
        Ec2Client::create_security_group(self, name, ssh_cidr).await
    }
}
