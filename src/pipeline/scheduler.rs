use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::monitoring::SnapshotWriter;
use super::{Tracker, TrackerContext};

/// Drives tracker cycles on a fixed cadence until shutdown is signalled.
///
/// Every tick runs a cycle; the ticker alone sets the cadence. A cycle always
/// runs to completion and shutdown is observed between cycles.
pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Returns the number of cycles that ran.
    pub async fn run(
        &self,
        tracker: &Tracker,
        ctx: &mut TrackerContext,
        snapshot: Option<&SnapshotWriter>,
        mut shutdown: watch::Receiver<bool>,
    ) -> usize {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0;

        info!("Scheduler started, polling every {:?}", self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = tracker.run_cycle(ctx).await;
                    cycles += 1;

                    if let Some(writer) = snapshot {
                        if let Err(e) = writer.write(&report).await {
                            error!("Failed to write snapshot: {:#}", e);
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown requested, scheduler stopping after {} cycles", cycles);
                        break;
                    }
                }
            }
        }
        cycles
    }
}
