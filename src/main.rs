//! burnbox: single-use EC2 sandbox provisioner.
//!
//! Serves `POST /launch-instance` and `POST /terminate-instance` over a
//! configured AWS region. Every
//! launched sandbox is reaped automatically after a fixed idle timeout.

use anyhow::{Context, Result};
use burnbox::aws::ec2::{Ec2Client, LaunchTemplate};
use burnbox::aws::AwsContext;
use burnbox::config::{AppConfig, ProviderConfig, SandboxConfig, ServiceConfig};
use burnbox::defaults::{
    DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_LISTEN_ADDR, DEFAULT_READY_TIMEOUT_SECS,
    DEFAULT_SG_CACHE_TTL_SECS,
};
use burnbox::orchestrator::user_data::BOOTSTRAP_SCRIPT;
use burnbox::orchestrator::{InstanceLifecycle, SecurityGroupResolver};
use burnbox::server::{self, AppState};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "burnbox")]
#[command(about = "Single-use EC2 sandboxes with automatic idle teardown")]
#[command(version)]
struct Args {
    /// AWS region
    #[arg(long, env = "AWS_REGION")]
    region: String,

    /// Machine image to launch sandboxes from
    #[arg(long, env = "AMI_ID")]
    ami_id: String,

    /// Instance size class (e.g., "t3.micro")
    #[arg(long, env = "INSTANCE_TYPE")]
    instance_type: String,

    /// Registered key pair name to authorize for SSH
    #[arg(long, env = "KEY_NAME")]
    key_name: String,

    /// Name of the sandbox security group
    #[arg(long, env = "SECURITY_GROUP_NAME")]
    security_group_name: String,

    /// Local key-material path reported in connection details
    /// (default: <KEY_NAME>.pem)
    #[arg(long, env = "KEY_PATH")]
    key_path: Option<PathBuf>,

    /// HTTP listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    listen_addr: SocketAddr,

    /// Idle lifetime in seconds before a sandbox is reaped
    #[arg(long, default_value_t = DEFAULT_IDLE_TIMEOUT_SECS)]
    idle_timeout: u64,

    /// Upper bound in seconds on the readiness wait after launch
    #[arg(long, default_value_t = DEFAULT_READY_TIMEOUT_SECS)]
    ready_timeout: u64,
}

impl From<Args> for AppConfig {
    fn from(args: Args) -> Self {
        Self {
            provider: ProviderConfig {
                region: args.region,
            },
            sandbox: SandboxConfig {
                ami_id: args.ami_id,
                instance_type: args.instance_type,
                key_name: args.key_name,
                key_path: args.key_path,
            },
            service: ServiceConfig {
                listen_addr: args.listen_addr,
                security_group_name: args.security_group_name,
                idle_timeout: Duration::from_secs(args.idle_timeout),
                ready_timeout: Duration::from_secs(args.ready_timeout),
                sg_cache_ttl: Duration::from_secs(DEFAULT_SG_CACHE_TTL_SECS),
            },
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print the error and its cause chain
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "\nError: {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  Caused by: {cause}");
        source = cause.source();
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config: AppConfig = Args::parse().into();

    info!(
        region = %config.provider.region,
        ami = %config.sandbox.ami_id,
        instance_type = %config.sandbox.instance_type,
        "Starting burnbox"
    );

    let aws = AwsContext::new(&config.provider.region).await;
    let ec2 = Arc::new(Ec2Client::from_context(&aws));

    let template = LaunchTemplate {
        ami_id: config.sandbox.ami_id.clone(),
        instance_type: config.sandbox.instance_type.clone(),
        key_name: config.sandbox.key_name.clone(),
        user_data: BOOTSTRAP_SCRIPT.to_string(),
    };

    let lifecycle = Arc::new(InstanceLifecycle::new(
        Arc::clone(&ec2),
        template,
        config.sandbox.resolved_key_path(),
        config.service.ready_timeout,
        config.service.idle_timeout,
    ));
    let resolver = Arc::new(SecurityGroupResolver::new(
        ec2,
        config.service.security_group_name.clone(),
        config.service.sg_cache_ttl,
    ));

    let app = server::build_router(AppState {
        lifecycle,
        resolver,
    });

    let listener = tokio::net::TcpListener::bind(config.service.listen_addr)
        .await
        .context("Failed to bind listen address")?;
    info!(addr = %config.service.listen_addr, "Listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
