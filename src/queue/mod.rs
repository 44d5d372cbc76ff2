//! Queue module - priority-ordered, window-bounded admission.
//!
//! ## Module Organization
//!
//! - `types/` - Item, PriorityQueue, snapshot types, metrics
//! - `enhanced.rs` - EnhancedQueue: pending heap + processing set + window
//! - `manager.rs` - QueueManager registry, constructors, recovery
//! - `dispatch.rs` - admission pass that feeds the executor
//! - `background/` - dispatch loop and periodic snapshots
//! - `executor.rs` - handoff to the external execution engine
//! - `storage.rs` - SnapshotStore trait and in-memory store
//! - `file_store.rs` - directory-backed store
//! - `error.rs` - error types

mod background;
mod dispatch;
mod enhanced;
mod error;
mod executor;
mod file_store;
mod manager;
mod storage;
pub mod types;

#[cfg(test)]
mod tests;

pub use background::SnapshotReport;
pub use enhanced::{Admission, EnhancedQueue};
pub use error::{ManagerError, QueueError, SnapshotError};
pub use executor::{ChannelExecutor, Completion, DispatchTicket, Executor};
pub use file_store::FileStore;
pub use manager::QueueManager;
pub use storage::{MemoryStore, SnapshotStore, StorageError};
pub use types::{Item, ItemSnapshot, PriorityQueue, ProcessingEntry, QueueSnapshot, QueueStats};
