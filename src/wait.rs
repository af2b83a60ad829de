//! Readiness polling with exponential backoff.
//!
//! The loop itself is unbounded; callers bound the whole wait with
//! `tokio::time::timeout` so a timeout can surface as its own error kind.

use anyhow::Result;
use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Poll cadence between readiness checks.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Initial delay between checks
    pub initial_delay: Duration,
    /// Cap for exponential growth
    pub max_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(15),
        }
    }
}

/// Poll `check` until it yields a value, sleeping with exponential backoff
/// and jitter between attempts.
///
/// `check` returns `Ok(Some(value))` when the resource is ready,
/// `Ok(None)` to keep waiting, or `Err` to abort the wait.
pub async fn poll_until<T, F, Fut>(config: &PollConfig, resource: &str, check: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let backoff = ExponentialBuilder::default()
        .with_min_delay(config.initial_delay)
        .with_max_delay(config.max_delay)
        .with_factor(2.0)
        .with_jitter()
        .build();
    let mut delays = backoff.into_iter();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(value) = check().await? {
            debug!(resource, attempts, "Resource ready");
            return Ok(value);
        }

        let delay = delays.next().unwrap_or(config.max_delay);
        debug!(
            resource,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            "Resource not ready, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
