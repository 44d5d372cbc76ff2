//! Queue tests.
//!
//! Module organization:
//! - `priority_queue.rs` - heap ordering, remove, update, snapshot import
//! - `enhanced.rs` - window enforcement, state machine, idempotence
//! - `snapshot.rs` - EnhancedQueue export/import and JSON format
//! - `storage.rs` - MemoryStore and FileStore
//! - `manager.rs` - registry, dispatch, snapshot loop, recovery
//! - `concurrent.rs` - multi-task mutation

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use super::*;
use crate::config::{ManagerConfig, RecoveryPolicy};

mod snapshot;
mod storage;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn item(key: &str, priority: i64, creation_time: DateTime<Utc>) -> Item {
    Item::new(key, priority, creation_time)
}

/// Admit and complete everything, returning keys in admission order.
fn drain(queue: &EnhancedQueue) -> Vec<String> {
    let mut keys = Vec::new();
    while let Admission::Admitted(key) = queue.pop_pending() {
        queue.pop_processing(&key);
        keys.push(key);
    }
    keys
}

/// Executor that keeps every ticket for inspection.
fn recording_executor() -> (Arc<dyn Executor>, Arc<Mutex<Vec<DispatchTicket>>>) {
    let tickets = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&tickets);
    let executor: Arc<dyn Executor> = Arc::new(move |ticket: DispatchTicket| {
        sink.lock().push(ticket);
    });
    (executor, tickets)
}

/// Manager without a background task; tests drive dispatch and snapshots.
fn setup() -> (Arc<QueueManager>, Arc<Mutex<Vec<DispatchTicket>>>) {
    let (executor, tickets) = recording_executor();
    (
        QueueManager::create(ManagerConfig::default(), None, executor),
        tickets,
    )
}

fn setup_with_store(
    config: ManagerConfig,
    store: Arc<dyn SnapshotStore>,
) -> (Arc<QueueManager>, Arc<Mutex<Vec<DispatchTicket>>>) {
    let (executor, tickets) = recording_executor();
    (QueueManager::create(config, Some(store), executor), tickets)
}

fn ticket_keys(tickets: &Mutex<Vec<DispatchTicket>>) -> Vec<String> {
    tickets.lock().iter().map(|t| t.key.clone()).collect()
}
