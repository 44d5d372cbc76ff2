//! A single unit of work held by a [`PriorityQueue`](super::PriorityQueue).

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

/// Ordered unit of work: key, priority and creation time.
///
/// Higher priority is served first; equal priorities are served oldest first.
/// `index` is the item's position in the owning heap and is maintained by the
/// queue only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    key: String,
    priority: i64,
    creation_time: DateTime<Utc>,
    index: usize,
}

impl Item {
    pub fn new(key: impl Into<String>, priority: i64, creation_time: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            priority,
            creation_time,
            index: 0,
        }
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn priority(&self) -> i64 {
        self.priority
    }

    #[inline]
    pub fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Change the priority of a detached item.
    ///
    /// Items already inside a queue must go through
    /// [`PriorityQueue::update_priority`](super::PriorityQueue::update_priority)
    /// so the heap is restored.
    #[inline]
    pub fn set_priority(&mut self, priority: i64) {
        self.priority = priority;
    }

    #[inline]
    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub(crate) fn into_key(self) -> String {
        self.key
    }

    /// Returns `true` if `self` must be popped before `other`.
    ///
    /// Priority descending, then creation time ascending, then key ascending
    /// so that exact ties still pop in a reproducible order.
    #[inline]
    pub(crate) fn precedes(&self, other: &Item) -> bool {
        self.serve_order(other) == Ordering::Less
    }

    #[inline]
    pub(crate) fn serve_order(&self, other: &Item) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.creation_time.cmp(&other.creation_time))
            .then_with(|| self.key.cmp(&other.key))
    }
}
