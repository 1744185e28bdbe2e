//! Periodic removal of expired file locks.
//!
//! Expiry is checked on every lock read, so the janitor only reclaims rows
//! that nobody refreshed. Its first run happens one period after start and
//! runs never overlap.

use std::sync::Arc;
use std::time::Duration;

use mdedit_core::file_lock::{LeaseStore, LockManager};
use mdedit_core::types::local_now;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Handle to the running sweep task.
#[derive(Debug)]
pub struct LockJanitor {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl LockJanitor {
    /// Spawn the sweep loop with the given period.
    pub fn start<S>(locks: Arc<LockManager<S>>, period: Duration) -> Self
    where
        S: LeaseStore + 'static,
    {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            tracing::info!(interval_secs = period.as_secs(), "Lock janitor started");

            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => {
                        tracing::info!("Lock janitor stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        sweep_once(&locks).await;
                    }
                }
            }
        });

        Self { cancel, handle }
    }

    /// Cancel the loop and wait up to `timeout` for it to finish.
    pub async fn stop(self, timeout: Duration) {
        self.cancel.cancel();
        if tokio::time::timeout(timeout, self.handle).await.is_err() {
            tracing::warn!("Lock janitor did not stop in time");
        }
    }
}

/// Delete every lease expired as of now.
///
/// Returns the number of rows removed, or `None` when the store failed. The
/// failure is logged and the next run retries.
pub async fn sweep_once<S: LeaseStore>(locks: &LockManager<S>) -> Option<u64> {
    match locks.sweep_expired(local_now()).await {
        Ok(deleted) => {
            if deleted > 0 {
                tracing::info!(deleted, "Lock janitor: removed expired locks");
            } else {
                tracing::debug!("Lock janitor: no expired locks");
            }
            Some(deleted)
        }
        Err(e) => {
            tracing::error!(error = %e, "Lock janitor: sweep failed");
            None
        }
    }
}
