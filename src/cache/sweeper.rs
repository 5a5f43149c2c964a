//! Periodic expiry sweep.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::PersistentCache;

/// Run `cache.sweep()` every `interval` until `cancel` fires.
///
/// The first sweep happens one full interval after spawn. Storage failures are
/// logged and the loop keeps going.
pub fn spawn_sweeper(
    cache: Arc<PersistentCache>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("cache sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match cache.sweep() {
                        Ok(0) => {}
                        Ok(removed) => tracing::debug!(removed, "swept expired cache entries"),
                        Err(e) => tracing::warn!("cache sweep failed: {}", e),
                    }
                }
            }
        }
    })
}
