//! Periodic removal of MSUs that stopped re-registering.

use std::sync::Arc;
use std::time::Duration;

use pilot_msu::MsuManager;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Spawn a task that prunes MSUs older than `ttl_ms` every `every`, until
/// `cancel` fires. Sticky room bindings are left untouched.
pub fn start_msu_sweeper(
    msus: Arc<MsuManager>,
    every: Duration,
    ttl_ms: i64,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let _ = ticker.tick().await;
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = msus.prune_stale(ttl_ms, None);
                    debug!(removed = removed.len(), remaining = msus.msu_count(), "msu sweep");
                }
            }
        }
    })
}
