//! Background sweep tasks with explicit shutdown.
//!
//! Sweeps are a liveness optimization only: cache expiry and limiter
//! decisions stay correct if a sweep never fires. Each sweep is an
//! owned tokio task joined on shutdown via its handle.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to a running background sweep. Dropping the handle without
/// calling [`SweepHandle::shutdown`] stops the task on its next tick.
pub struct SweepHandle {
    shutdown: watch::Sender<()>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Signal the sweep to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let SweepHandle { shutdown, task } = self;
        drop(shutdown);
        let _ = task.await;
    }
}

/// Run `sweep` every `every` until the returned handle shuts down.
pub fn spawn_sweep(every: Duration, mut sweep: impl FnMut() + Send + 'static) -> SweepHandle {
    let (tx, mut rx) = watch::channel(());
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so the cadence
        // starts one interval after spawn.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => sweep(),
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    });
    SweepHandle { shutdown: tx, task }
}
