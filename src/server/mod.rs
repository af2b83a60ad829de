//! HTTP surface: router and shared application state.

mod handlers;

pub use handlers::{LaunchRequest, LaunchResponse, TerminateRequest, TerminateResponse};

use crate::aws::ec2::Ec2Operations;
use crate::orchestrator::{InstanceLifecycle, SecurityGroupResolver};
use axum::Router;
use axum::routing::post;
use std::sync::Arc;

/// Shared state handed to every request handler.
pub struct AppState<E> {
    pub lifecycle: Arc<InstanceLifecycle<E>>,
    pub resolver: Arc<SecurityGroupResolver<E>>,
}

impl<E> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: Arc::clone(&self.lifecycle),
            resolver: Arc::clone(&self.resolver),
        }
    }
}

/// Build the service router over any EC2 backend.
pub fn build_router<E: Ec2Operations + 'static>(state: AppState<E>) -> Router {
    Router::new()
        .route("/launch-instance", post(handlers::launch_instance::<E>))
        .route("/terminate-instance", post(handlers::terminate_instance::<E>))
        .with_state(state)
}
