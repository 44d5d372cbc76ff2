//! Snapshot persistence.
//!
//! Only queues whose mutation counter moved by at least `min_changes` since
//! their last stored snapshot are written. A failed write is logged and
//! retried on the next pass; the store keeps the previous snapshot.

use tracing::{debug, error};

use super::super::manager::QueueManager;

/// Outcome of one snapshot pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    pub written: usize,
    pub failed: usize,
}

impl QueueManager {
    /// Export and persist every queue with pending changes.
    ///
    /// `force` ignores `min_changes` (any change at all is written); used for
    /// the final flush on shutdown. Without a store this is a no-op.
    pub async fn snapshot_all(&self, force: bool) -> SnapshotReport {
        let mut report = SnapshotReport::default();
        let Some(ref store) = self.store else {
            return report;
        };

        let min_changes = self.config.snapshot.min_changes.max(1);
        let mut persisted = self.persisted.lock().await;

        for (name, queue) in self.queue_list() {
            let last = persisted.get(&name).copied().unwrap_or(0);
            let due = queue.changes().saturating_sub(last);
            if due == 0 || (!force && due < min_changes) {
                continue;
            }

            let (snapshot, version) = queue.export_with_changes();
            let bytes = match serde_json::to_vec(&snapshot) {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(queue = %name, error = %e, "Snapshot serialization failed");
                    self.metrics.record_snapshot(false);
                    report.failed += 1;
                    continue;
                }
            };

            match store.put(&name, &bytes).await {
                Ok(()) => {
                    debug!(
                        queue = %name,
                        pending = snapshot.pending.len(),
                        processing = snapshot.processing.len(),
                        bytes = bytes.len(),
                        "Snapshot completed"
                    );
                    persisted.insert(name.clone(), version);
                    self.metrics.record_snapshot(true);
                    report.written += 1;
                }
                Err(e) => {
                    error!(queue = %name, error = %e, "Snapshot failed");
                    self.metrics.record_snapshot(false);
                    report.failed += 1;
                }
            }
        }

        report
    }
}
