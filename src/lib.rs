//! admitq - priority-ordered, window-bounded admission queue.
//!
//! Decides which pending executions may start now, caps how many run at
//! once per named queue, and survives restarts through per-queue snapshots.

pub mod config;
pub mod queue;
pub mod telemetry;

pub use config::{ManagerConfig, RecoveryPolicy, SnapshotConfig};
pub use queue::{
    Admission, ChannelExecutor, DispatchTicket, EnhancedQueue, Executor, FileStore, MemoryStore,
    QueueManager, SnapshotStore,
};
