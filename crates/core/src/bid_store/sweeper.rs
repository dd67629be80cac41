use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::BidStore;
use crate::metrics::PipelineMetrics;

/// Spawn a task that physically removes expired bids every `interval`.
///
/// Removal runs on its own timer so expired entries go away even when no
/// campaign reads them. Failures are logged and retried on the next sweep.
pub fn spawn_expiry_sweeper(
    store: Arc<dyn BidStore>,
    interval: Duration,
    metrics: PipelineMetrics,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Expiry sweeper started (every {:?})", interval);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Expiry sweeper received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    match store.purge_expired().await {
                        Ok(0) => {}
                        Ok(removed) => {
                            debug!("Purged {} expired bids", removed);
                            metrics.record_expired_purged(removed);
                        }
                        Err(e) => {
                            warn!("Expiry sweep failed: {}", e);
                            metrics.record_store_error();
                        }
                    }
                }
            }
        }
        info!("Expiry sweeper stopped");
    })
}
