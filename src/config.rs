//! Service configuration.
//!
//! Composed of focused sub-configs; the binary builds these from CLI
//! flags, each backed by an environment variable.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Provider connection settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// AWS region
    pub region: String,
}

/// Template for every sandbox this process launches.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Machine image identifier
    pub ami_id: String,
    /// Instance size class
    pub instance_type: String,
    /// Registered key pair name
    pub key_name: String,
    /// Local key-material path reported in connection details; defaults to
    /// `<key_name>.pem`
    pub key_path: Option<PathBuf>,
}

impl SandboxConfig {
    /// Key-material path to report to callers, absolutized best-effort.
    pub fn resolved_key_path(&self) -> PathBuf {
        let path = self
            .key_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.pem", self.key_name)));
        std::path::absolute(&path).unwrap_or(path)
    }
}

/// Runtime behavior knobs.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP listen address
    pub listen_addr: SocketAddr,
    /// Name of the sandbox security group
    pub security_group_name: String,
    /// Idle lifetime before the reaper terminates a sandbox
    pub idle_timeout: Duration,
    /// Upper bound on the readiness wait
    pub ready_timeout: Duration,
    /// How long a resolved security-group id is trusted
    pub sg_cache_ttl: Duration,
}

/// Full configuration for one service process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub sandbox: SandboxConfig,
    pub service: ServiceConfig,
}
