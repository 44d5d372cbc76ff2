//! Snapshot storage abstraction.
//!
//! The manager writes one opaque snapshot per queue name and reads them back
//! on startup. A `put` must replace the previous value atomically: a failed
//! write leaves the last good snapshot readable.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

/// Storage error type.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Backend(String),
}

/// Durable key/value store for queue snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Persist the snapshot for `queue`, replacing any previous one.
    async fn put(&self, queue: &str, snapshot: &[u8]) -> Result<(), StorageError>;

    /// Last snapshot written for `queue`, if any.
    async fn get(&self, queue: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Every queue name with a stored snapshot.
    async fn queue_names(&self) -> Result<Vec<String>, StorageError>;
}

/// In-process store. Useful for tests and for embedding without durability.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Arc<[u8]>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, queue: &str, snapshot: &[u8]) -> Result<(), StorageError> {
        self.entries.insert(queue.to_string(), Arc::from(snapshot));
        Ok(())
    }

    async fn get(&self, queue: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.get(queue).map(|entry| entry.value().to_vec()))
    }

    async fn queue_names(&self) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }
}
