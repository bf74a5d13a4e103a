//! Eviction Task
//!
//! Background task that periodically deletes expired entries and unloads
//! idle payloads from memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::StoreInner;

/// Spawns the eviction loop for a store.
///
/// The task sleeps for `interval` between sweeps and exits as soon as
/// `shutdown` is cancelled. Each sweep classifies entries under the shared
/// lock, then deletes and unloads under the exclusive lock.
///
/// # Returns
/// A JoinHandle the store awaits when it is closed.
pub(crate) fn spawn_eviction_task(
    store: Arc<StoreInner>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting eviction task with interval of {:?}", interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let report = store.run_eviction_check().await;
            if report.is_empty() {
                debug!("Eviction: nothing to remove or unload");
            } else {
                info!(
                    "Eviction: removed {} expired entries, unloaded {} idle entries",
                    report.removed, report.unloaded
                );
            }
        }

        info!("Eviction task stopped");
    })
}
