//! Manager-wide atomic counters.
//!
//! Queue depths are read straight from each queue; these counters only track
//! event totals that cannot be recomputed from current state.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Default)]
pub struct ManagerMetrics {
    pub total_added: AtomicU64,
    pub total_admitted: AtomicU64,
    pub total_completed: AtomicU64,
    pub total_cancelled: AtomicU64,
    pub snapshots_written: AtomicU64,
    pub snapshot_failures: AtomicU64,
}

impl ManagerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn record_add(&self) {
        self.total_added.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_admit(&self) {
        self.total_admitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_complete(&self) {
        self.total_completed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_cancel(&self) {
        self.total_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_snapshot(&self, ok: bool) {
        if ok {
            self.snapshots_written.fetch_add(1, Ordering::Relaxed);
        } else {
            self.snapshot_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_added: self.total_added.load(Ordering::Relaxed),
            total_admitted: self.total_admitted.load(Ordering::Relaxed),
            total_completed: self.total_completed.load(Ordering::Relaxed),
            total_cancelled: self.total_cancelled.load(Ordering::Relaxed),
            snapshots_written: self.snapshots_written.load(Ordering::Relaxed),
            snapshot_failures: self.snapshot_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ManagerMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub total_added: u64,
    pub total_admitted: u64,
    pub total_completed: u64,
    pub total_cancelled: u64,
    pub snapshots_written: u64,
    pub snapshot_failures: u64,
}

/// Depths of one queue at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub window: i64,
}
