//! Serializable queue state.
//!
//! Wire format (JSON, timestamps RFC3339):
//!
//! ```text
//! {
//!   "window": 10,
//!   "pending":    [ { "key", "priority", "creationTime", "index" }, ... ],
//!   "processing": [ { "key", "priority", "creationTime", "admittedAt" }, ... ]
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Item;

/// One heap slot of a [`PriorityQueue`](super::PriorityQueue) snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    pub key: String,
    pub priority: i64,
    pub creation_time: DateTime<Utc>,
    pub index: usize,
}

impl From<&Item> for ItemSnapshot {
    fn from(item: &Item) -> Self {
        Self {
            key: item.key().to_string(),
            priority: item.priority(),
            creation_time: item.creation_time(),
            index: item.index(),
        }
    }
}

/// Metadata kept for a key while it is admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingEntry {
    pub key: String,
    pub priority: i64,
    pub creation_time: DateTime<Utc>,
    pub admitted_at: DateTime<Utc>,
}

impl ProcessingEntry {
    pub(crate) fn admit(item: Item, admitted_at: DateTime<Utc>) -> Self {
        let priority = item.priority();
        let creation_time = item.creation_time();
        Self {
            key: item.into_key(),
            priority,
            creation_time,
            admitted_at,
        }
    }
}

/// Complete state of an [`EnhancedQueue`](crate::queue::EnhancedQueue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub window: i64,
    pub pending: Vec<ItemSnapshot>,
    pub processing: Vec<ProcessingEntry>,
}
