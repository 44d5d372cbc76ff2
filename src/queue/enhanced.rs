//! Window-bounded admission queue.
//!
//! A key is in exactly one of three states: absent, pending (waiting in the
//! priority heap) or processing (admitted and running). At most `window` keys
//! may be admitted at once; `pop_pending` reports `Blocked` instead of waiting
//! when the window is full, so callers poll.
//!
//! Every public operation takes the same mutex, so concurrent callers observe
//! a single serial order of mutations.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::error::SnapshotError;
use super::types::{FxHashMap, Item, PriorityQueue, ProcessingEntry, QueueSnapshot, QueueStats};

/// Outcome of [`EnhancedQueue::pop_pending`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Key moved from pending to processing.
    Admitted(String),
    /// Work is pending but the window is full.
    Blocked,
    /// Nothing is pending.
    Empty,
}

impl Admission {
    #[inline]
    pub fn key(&self) -> Option<&str> {
        match self {
            Admission::Admitted(key) => Some(key),
            Admission::Blocked | Admission::Empty => None,
        }
    }

    #[inline]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }
}

struct State {
    pending: PriorityQueue,
    processing: FxHashMap<String, ProcessingEntry>,
    window: i64,
}

impl State {
    #[inline]
    fn has_capacity(&self) -> bool {
        (self.processing.len() as i64) < self.window
    }

    #[inline]
    fn contains(&self, key: &str) -> bool {
        self.pending.contains(key) || self.processing.contains_key(key)
    }
}

pub struct EnhancedQueue {
    state: Mutex<State>,
    /// Bumped on every mutation, read by the snapshot loop.
    changes: AtomicU64,
}

impl EnhancedQueue {
    /// Negative windows are treated as zero.
    pub fn new(window: i64) -> Self {
        Self {
            state: Mutex::new(State {
                pending: PriorityQueue::new(),
                processing: FxHashMap::default(),
                window: window.max(0),
            }),
            changes: AtomicU64::new(0),
        }
    }

    #[inline]
    fn touch(&self) {
        self.changes.fetch_add(1, Ordering::Release);
    }

    /// Mutation counter; changes whenever queue state does.
    #[inline]
    pub fn changes(&self) -> u64 {
        self.changes.load(Ordering::Acquire)
    }

    // ============== Submission ==============

    /// Queue a key. Returns `false` without changing anything if the key is
    /// already pending or processing.
    pub fn add(
        &self,
        key: impl Into<String>,
        priority: i64,
        creation_time: DateTime<Utc>,
    ) -> bool {
        let key = key.into();
        let mut state = self.state.lock();
        if state.contains(&key) {
            return false;
        }
        if state
            .pending
            .push(Item::new(key, priority, creation_time))
            .is_err()
        {
            return false;
        }
        self.touch();
        true
    }

    /// Drop a key that has not been admitted yet.
    pub fn remove_pending(&self, key: &str) -> bool {
        let removed = self.state.lock().pending.remove(key);
        if removed {
            self.touch();
        }
        removed
    }

    /// Re-prioritize a pending key. Processing keys are not affected.
    pub fn update_priority(&self, key: &str, priority: i64) -> bool {
        let updated = self.state.lock().pending.update_priority(key, priority);
        if updated {
            self.touch();
        }
        updated
    }

    // ============== Admission ==============

    /// Admit the highest-priority pending key if the window has room.
    pub fn pop_pending(&self) -> Admission {
        let mut state = self.state.lock();
        if state.pending.is_empty() {
            return Admission::Empty;
        }
        if !state.has_capacity() {
            return Admission::Blocked;
        }
        let Some(item) = state.pending.pop() else {
            return Admission::Empty;
        };

        let entry = ProcessingEntry::admit(item, Utc::now());
        let key = entry.key.clone();
        state.processing.insert(key.clone(), entry);
        self.touch();
        Admission::Admitted(key)
    }

    /// Key that `pop_pending` would admit next, ignoring the window.
    pub fn peek_pending(&self) -> Option<String> {
        self.state
            .lock()
            .pending
            .peek()
            .map(|item| item.key().to_string())
    }

    /// Release a processing key and free its window slot.
    ///
    /// Returns `None` if the key is not processing; repeated completion is a
    /// no-op.
    pub fn pop_processing(&self, key: &str) -> Option<String> {
        let entry = self.state.lock().processing.remove(key)?;
        self.touch();
        Some(entry.key)
    }

    /// Presence check on the processing set.
    pub fn peek_processing(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .processing
            .get(key)
            .map(|entry| entry.key.clone())
    }

    // ============== Window ==============

    /// Change the window. Takes effect on the next `pop_pending`; keys already
    /// processing are never evicted.
    pub fn set_window(&self, window: i64) {
        let mut state = self.state.lock();
        let window = window.max(0);
        if state.window != window {
            state.window = window;
            self.touch();
        }
    }

    #[inline]
    pub fn processing_window(&self) -> i64 {
        self.state.lock().window
    }

    // ============== Introspection ==============

    #[inline]
    pub fn in_pending(&self, key: &str) -> bool {
        self.state.lock().pending.contains(key)
    }

    #[inline]
    pub fn in_processing(&self, key: &str) -> bool {
        self.state.lock().processing.contains_key(key)
    }

    #[inline]
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    #[inline]
    pub fn processing_len(&self) -> usize {
        self.state.lock().processing.len()
    }

    /// Pending items in serve order.
    pub fn pending_queue(&self) -> Vec<Item> {
        self.state.lock().pending.sorted()
    }

    /// Processing entries in admission order.
    pub fn processing_queue(&self) -> Vec<ProcessingEntry> {
        let state = self.state.lock();
        sorted_processing(&state.processing)
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        QueueStats {
            pending: state.pending.len(),
            processing: state.processing.len(),
            window: state.window,
        }
    }

    // ============== Snapshot ==============

    pub fn export(&self) -> QueueSnapshot {
        self.export_with_changes().0
    }

    /// Snapshot plus the mutation counter it corresponds to.
    pub(crate) fn export_with_changes(&self) -> (QueueSnapshot, u64) {
        let state = self.state.lock();
        let snapshot = QueueSnapshot {
            window: state.window,
            pending: state.pending.export(),
            processing: sorted_processing(&state.processing),
        };
        (snapshot, self.changes())
    }

    /// Replace pending, processing and window with the snapshot's.
    ///
    /// The snapshot is fully validated before the swap; on error the queue
    /// is untouched.
    pub fn import(&self, snapshot: QueueSnapshot) -> Result<(), SnapshotError> {
        if snapshot.window < 0 {
            return Err(SnapshotError::InvalidWindow(snapshot.window));
        }

        let pending = PriorityQueue::from_snapshot(snapshot.pending)?;

        let mut processing =
            FxHashMap::with_capacity_and_hasher(snapshot.processing.len(), Default::default());
        for entry in snapshot.processing {
            if pending.contains(&entry.key) {
                return Err(SnapshotError::Overlap { key: entry.key });
            }
            if processing.contains_key(&entry.key) {
                return Err(SnapshotError::DuplicateKey { key: entry.key });
            }
            processing.insert(entry.key.clone(), entry);
        }

        let mut state = self.state.lock();
        *state = State {
            pending,
            processing,
            window: snapshot.window,
        };
        self.touch();
        Ok(())
    }

    pub fn export_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.export())
    }

    pub fn import_json(&self, bytes: &[u8]) -> Result<(), SnapshotError> {
        let snapshot: QueueSnapshot = serde_json::from_slice(bytes)?;
        self.import(snapshot)
    }
}

fn sorted_processing(processing: &FxHashMap<String, ProcessingEntry>) -> Vec<ProcessingEntry> {
    let mut entries: Vec<ProcessingEntry> = processing.values().cloned().collect();
    entries.sort_by(|a, b| {
        a.admitted_at
            .cmp(&b.admitted_at)
            .then_with(|| a.key.cmp(&b.key))
    });
    entries
}
