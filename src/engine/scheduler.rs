use super::{SyncEngine, WeakSyncEngine};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Fires a bulk refresh every `period`, the first one immediately.
///
/// Each tick spawns its own refresh task, so a slow or failing refresh never
/// delays the next tick. Manual refreshes do not touch the cadence.
pub struct RefreshScheduler {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RefreshScheduler {
    pub fn spawn(engine: &SyncEngine, period: Duration) -> Self {
        let weak = engine.downgrade();
        let (shutdown, mut stop) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut tick = 0u64;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tick += 1;
                        if !fire(&weak, tick) {
                            break;
                        }
                    }
                    _ = stop.changed() => break,
                }
            }
            debug!(ticks = tick, "Refresh scheduler stopped");
        });

        info!(period_secs = period.as_secs(), "Refresh scheduler started");
        Self { shutdown, handle }
    }

    pub fn stop(self) {
        let _ = self.shutdown.send(true);
        self.handle.abort();
    }
}

fn fire(weak: &WeakSyncEngine, tick: u64) -> bool {
    let Some(engine) = weak.upgrade() else {
        return false;
    };
    if !engine.is_alive() {
        return false;
    }
    debug!(tick, "Scheduled refresh");
    tokio::spawn(async move {
        if let Err(e) = engine.refresh().await {
            warn!(tick, error = %e, "Scheduled refresh failed");
        }
    });
    true
}
