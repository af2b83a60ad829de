//! Launch and terminate request handlers.

use super::AppState;
use crate::aws::ec2::Ec2Operations;
use crate::defaults::LISTENER_PORT_START;
use crate::error::{AppError, AppResult};
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct LaunchRequest {
    /// Requester's public address; scopes the SSH ingress rule
    #[serde(default)]
    pub user_ip: String,
    /// Contact identifier, logged but operationally unused
    pub user_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LaunchResponse {
    pub instance_id: String,
    pub public_ip: String,
    pub ssh_command: String,
    pub netcat_command: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct TerminateRequest {
    #[serde(default)]
    pub instance_id: String,
}

#[derive(Debug, Serialize)]
pub struct TerminateResponse {
    pub status: String,
}

/// `POST /launch-instance`: resolve the security group, launch one
/// sandbox, and respond with its connection details once it is reachable.
pub async fn launch_instance<E: Ec2Operations + 'static>(
    State(state): State<AppState<E>>,
    Json(request): Json<LaunchRequest>,
) -> AppResult<Json<LaunchResponse>> {
    if request.user_ip.is_empty() {
        return Err(AppError::Validation("user_ip is required".to_string()));
    }
    let requester_ip: Ipv4Addr = request.user_ip.parse().map_err(|_| {
        AppError::Validation("user_ip must be a valid IPv4 address".to_string())
    })?;

    if let Some(email) = request.user_email.as_deref() {
        info!(user_email = %email, user_ip = %requester_ip, "Launch requested");
    } else {
        info!(user_ip = %requester_ip, "Launch requested");
    }

    let group_id = state.resolver.resolve(requester_ip).await?;
    let record = state.lifecycle.launch(&group_id).await?;

    let ssh_command = format!(
        "ssh -i {} {}@{}",
        record.key_path.display(),
        record.username,
        record.public_ip
    );
    let netcat_command = format!("nc -lvnp {LISTENER_PORT_START}");

    Ok(Json(LaunchResponse {
        instance_id: record.instance_id,
        public_ip: record.public_ip,
        ssh_command,
        netcat_command,
        status: "running".to_string(),
    }))
}

/// `POST /terminate-instance`: tear down the given instance on demand.
pub async fn terminate_instance<E: Ec2Operations + 'static>(
    State(state): State<AppState<E>>,
    Json(request): Json<TerminateRequest>,
) -> AppResult<Json<TerminateResponse>> {
    if request.instance_id.is_empty() {
        return Err(AppError::Validation("instance_id is required".to_string()));
    }

    state.lifecycle.terminate(&request.instance_id).await?;

    Ok(Json(TerminateResponse {
        status: "terminated".to_string(),
    }))
}
