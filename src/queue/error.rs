//! Error types for queue operations and snapshot import.

use super::storage::StorageError;

/// Validation errors returned by queue mutations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("key already queued: {key}")]
    DuplicateKey { key: String },
}

/// Rejection reasons for a snapshot passed to `import`.
///
/// An import that fails with any of these leaves the target queue untouched.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("duplicate key in snapshot: {key}")]
    DuplicateKey { key: String },

    #[error("heap index {index} of key {key} out of range for {len} items")]
    IndexOutOfRange { key: String, index: usize, len: usize },

    #[error("heap index {index} used more than once")]
    DuplicateIndex { index: usize },

    #[error("key {key} is both pending and processing")]
    Overlap { key: String },

    #[error("invalid window: {0}")]
    InvalidWindow(i64),
}

/// Errors surfaced by [`QueueManager`](super::QueueManager) lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("queue {queue}: {source}")]
    Snapshot {
        queue: String,
        #[source]
        source: SnapshotError,
    },

    #[error("queue manager is shutting down")]
    ShuttingDown,
}
