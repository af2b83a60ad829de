//! In-memory fake of the EC2 control plane for orchestration and handler
//! tests.

use crate::aws::ec2::{Ec2Operations, LaunchTemplate};
use anyhow::Result;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fake [`Ec2Operations`] implementation that records every call and can
/// be pre-loaded with failure modes.
#[derive(Debug, Default)]
pub struct FakeEc2 {
    counter: AtomicUsize,
    existing_group: Mutex<Option<String>>,
    created_groups: Mutex<Vec<(String, String)>>,
    launched: Mutex<Vec<String>>,
    terminated: Mutex<Vec<String>>,
    find_calls: AtomicUsize,
    run_failure: Mutex<Option<String>>,
    create_group_failure: Mutex<Option<String>>,
    terminate_failure: Mutex<Option<String>>,
    duplicate_race_winner: Mutex<Option<String>>,
    hang_wait: Mutex<bool>,
}

impl FakeEc2 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a group so name lookup succeeds without creation.
    pub fn with_existing_group(self, group_id: &str) -> Self {
        *self.existing_group.lock().unwrap() = Some(group_id.to_string());
        self
    }

    /// Make group creation fail with `InvalidGroup.Duplicate`, after which
    /// lookup returns `winner_id` (simulates losing a creation race).
    pub fn with_duplicate_group_race(self, winner_id: &str) -> Self {
        *self.duplicate_race_winner.lock().unwrap() = Some(winner_id.to_string());
        self
    }

    pub fn with_create_group_failure(self, message: &str) -> Self {
        *self.create_group_failure.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn with_run_failure(self, message: &str) -> Self {
        *self.run_failure.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn with_terminate_failure(self, message: &str) -> Self {
        *self.terminate_failure.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Make the readiness wait never complete.
    pub fn with_hanging_wait(self) -> Self {
        *self.hang_wait.lock().unwrap() = true;
        self
    }

    /// Groups created so far, as `(name, ssh_cidr)` pairs.
    pub fn created_groups(&self) -> Vec<(String, String)> {
        self.created_groups.lock().unwrap().clone()
    }

    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }

    pub fn terminated(&self) -> Vec<String> {
        self.terminated.lock().unwrap().clone()
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    fn next_id(&self) -> usize {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Ec2Operations for FakeEc2 {
    async fn run_instance(
        &self,
        _template: &LaunchTemplate,
        _security_group_id: &str,
    ) -> Result<String> {
        if let Some(message) = self.run_failure.lock().unwrap().as_ref() {
            anyhow::bail!("Failed to launch instance: {message}");
        }
        let instance_id = format!("i-fake{:08x}", self.next_id());
        self.launched.lock().unwrap().push(instance_id.clone());
        Ok(instance_id)
    }

    async fn wait_for_running(&self, _instance_id: &str) -> Result<String> {
        let hang = *self.hang_wait.lock().unwrap();
        if hang {
            std::future::pending::<()>().await;
        }
        Ok("198.51.100.23".to_string())
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        self.terminated.lock().unwrap().push(instance_id.to_string());
        if let Some(message) = self.terminate_failure.lock().unwrap().as_ref() {
            anyhow::bail!("Failed to terminate instance: {message}");
        }
        Ok(())
    }

    async fn find_security_group(&self, _name: &str) -> Result<Option<String>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.existing_group.lock().unwrap().clone())
    }

    async fn create_security_group(&self, name: &str, ssh_cidr: &str) -> Result<String> {
        if let Some(winner) = self.duplicate_race_winner.lock().unwrap().take() {
            *self.existing_group.lock().unwrap() = Some(winner);
            anyhow::bail!("The security group '{name}' already exists (InvalidGroup.Duplicate)");
        }
        if let Some(message) = self.create_group_failure.lock().unwrap().as_ref() {
            anyhow::bail!("Failed to create security group: {message}");
        }
        let group_id = format!("sg-fake{:08x}", self.next_id());
        self.created_groups
            .lock()
            .unwrap()
            .push((name.to_string(), ssh_cidr.to_string()));
        *self.existing_group.lock().unwrap() = Some(group_id.clone());
        Ok(group_id)
    }
}
