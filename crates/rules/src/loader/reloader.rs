//! Periodic hot-reload task.
//!
//! Polling rather than filesystem notifications: mounted config volumes are
//! updated through symlink swaps that file watchers report unreliably.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::core::{ReloadOutcome, RuleLoader};

/// Spawn the reload loop. The first pass runs immediately.
///
/// The task exits when `shutdown` flips to `true` or its sender is dropped.
pub fn spawn_reloader(
    loader: Arc<RuleLoader>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            path = %loader.rules_dir().display(),
            interval_secs = interval.as_secs(),
            "rule reloader started"
        );
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let pass = Arc::clone(&loader);
                    match tokio::task::spawn_blocking(move || pass.reload()).await {
                        Ok(report) => {
                            let updated = [&report.ignore, &report.block]
                                .into_iter()
                                .filter(|o| matches!(o, ReloadOutcome::Updated))
                                .count();
                            if updated > 0 {
                                info!(updated, "rule configuration swapped in");
                            }
                        }
                        Err(e) => warn!(error = %e, "rule reload task failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("rule reloader stopped");
    })
}
