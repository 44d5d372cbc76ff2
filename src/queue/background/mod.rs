//! Background task: dispatch loop plus periodic snapshots.
//!
//! Module organization:
//! - `snapshot.rs` - snapshot persistence

mod snapshot;

pub use snapshot::SnapshotReport;

use std::sync::Arc;

use tokio::time::{interval, sleep, Duration, Interval, MissedTickBehavior};
use tracing::info;

use super::manager::QueueManager;

impl QueueManager {
    /// Run until shutdown: dispatch whenever work is admissible, back off for
    /// `poll_interval` after a pass that admitted nothing, and snapshot on
    /// every tick.
    pub(crate) async fn background_tasks(self: Arc<Self>) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let snapshots = self.store.is_some() && self.config.snapshot.enabled;
        let mut snapshot_ticker = snapshots.then(|| {
            let mut ticker = interval(self.config.snapshot.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            snapshots,
            "Background tasks started"
        );

        loop {
            if self.is_shutdown() {
                info!("Background tasks received shutdown signal, stopping...");
                return;
            }

            let admitted = self.dispatch_once();
            let backoff = if admitted > 0 {
                Duration::ZERO
            } else {
                self.config.poll_interval
            };

            tokio::select! {
                _ = shutdown_rx.changed() => {}
                _ = tick(&mut snapshot_ticker) => {
                    self.snapshot_all(false).await;
                }
                _ = self.wakeup.notified() => {}
                _ = sleep(backoff) => {}
            }
        }
    }
}

/// Next tick of an optional ticker; never resolves when there is none.
async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
