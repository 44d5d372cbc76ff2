//! Type definitions for the admission queue.
//!
//! Module organization:
//! - `item.rs` - Item and its serve order
//! - `priority_queue.rs` - keyed binary heap
//! - `snapshot.rs` - serializable queue state
//! - `metrics.rs` - manager counters and queue stats

mod item;
mod metrics;
mod priority_queue;
mod snapshot;

pub use item::Item;
pub use metrics::{ManagerMetrics, MetricsSnapshot, QueueStats};
pub use priority_queue::PriorityQueue;
pub use rustc_hash::{FxHashMap, FxHashSet};
pub use snapshot::{ItemSnapshot, ProcessingEntry, QueueSnapshot};
