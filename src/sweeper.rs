use crate::store::ConversationStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runs `expire` on `store` every `interval` until `shutdown` fires.
///
/// A zero `interval` turns the proactive sweep off; the task then only waits for
/// `shutdown`. Must be called from within a tokio runtime.
pub fn spawn_sweeper(
    store: Arc<dyn ConversationStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    if interval.is_zero() {
        info!(op = "sweep", "proactive session sweep disabled");
        return tokio::spawn(async move {
            shutdown.cancelled().await;
        });
    }
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(op = "sweep", "session sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = store.expire();
                    debug!(op = "sweep", removed, remaining = store.len(), "swept sessions");
                }
            }
        }
    })
}
