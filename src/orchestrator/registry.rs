//! Bookkeeping for the most recently launched sandbox.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Connection metadata for the last launched sandbox.
///
/// Advisory and process-local; the provider's own instance state is
/// authoritative.
#[derive(Debug, Clone)]
pub struct InstanceRecord {
    pub instance_id: String,
    pub public_ip: String,
    pub username: String,
    pub key_path: PathBuf,
    pub launched_at: DateTime<Utc>,
}

struct ActiveInstance {
    record: InstanceRecord,
    reaper: CancellationToken,
}

/// Holds the single retained [`InstanceRecord`] together with the
/// cancellation handle of its pending idle reaper.
#[derive(Clone, Default)]
pub struct InstanceRegistry {
    inner: Arc<Mutex<Option<ActiveInstance>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fresh record, returning the reaper token minted for it.
    ///
    /// Any previous record is overwritten unconditionally. Its reaper is
    /// left running: the older instance still deserves teardown, and the
    /// reaper's own conditional clear keeps it from touching this record.
    pub async fn store(&self, record: InstanceRecord) -> CancellationToken {
        let token = CancellationToken::new();
        *self.inner.lock().await = Some(ActiveInstance {
            record,
            reaper: token.clone(),
        });
        token
    }

    pub async fn current(&self) -> Option<InstanceRecord> {
        self.inner.lock().await.as_ref().map(|a| a.record.clone())
    }

    /// Reaper path: drop the record if it still refers to `instance_id`.
    pub async fn clear_if(&self, instance_id: &str) -> bool {
        let mut slot = self.inner.lock().await;
        match slot.as_ref() {
            Some(active) if active.record.instance_id == instance_id => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Manual-terminate path: cancel the pending reaper and drop the
    /// record, if it still refers to `instance_id`.
    pub async fn cancel_and_clear_if(&self, instance_id: &str) -> bool {
        let mut slot = self.inner.lock().await;
        match slot.as_ref() {
            Some(active) if active.record.instance_id == instance_id => {
                active.reaper.cancel();
                *slot = None;
                true
            }
            _ => false,
        }
    }
}
