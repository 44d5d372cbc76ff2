//! Core QueueManager struct, constructors and recovery.
//!
//! The manager owns the named-queue registry. Queues are created lazily on
//! first reference and live until the manager is dropped. The registry lock
//! is only held to look up or insert a queue handle, never while a queue's
//! own lock is taken.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::enhanced::EnhancedQueue;
use super::error::ManagerError;
use super::executor::Executor;
use super::storage::SnapshotStore;
use super::types::{FxHashMap, ManagerMetrics, MetricsSnapshot, QueueStats};
use crate::config::{ManagerConfig, RecoveryPolicy};

pub struct QueueManager {
    pub(crate) queues: RwLock<FxHashMap<CompactString, Arc<EnhancedQueue>>>,
    pub(crate) config: ManagerConfig,
    pub(crate) store: Option<Arc<dyn SnapshotStore>>,
    pub(crate) executor: Arc<dyn Executor>,
    pub(crate) metrics: Arc<ManagerMetrics>,
    /// Queue -> mutation counter covered by its last stored snapshot.
    /// Also serializes snapshot passes.
    pub(crate) persisted: tokio::sync::Mutex<FxHashMap<CompactString, u64>>,
    /// Wakes the dispatch loop early on submissions and completions.
    pub(crate) wakeup: Arc<Notify>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
    pub(crate) background: Mutex<Option<JoinHandle<()>>>,
}

impl QueueManager {
    /// In-memory manager with the dispatch loop running. No persistence.
    pub fn new(config: ManagerConfig, executor: Arc<dyn Executor>) -> Arc<Self> {
        let manager = Self::create(config, None, executor);
        manager.spawn_background();
        manager
    }

    /// Recover every stored queue, then start dispatching and snapshotting.
    ///
    /// No key is admitted before recovery has finished. With
    /// [`RecoveryPolicy::FailClosed`] a snapshot that cannot be read or
    /// imported aborts startup.
    pub async fn start(
        config: ManagerConfig,
        store: Arc<dyn SnapshotStore>,
        executor: Arc<dyn Executor>,
    ) -> Result<Arc<Self>, ManagerError> {
        let manager = Self::create(config, Some(store), executor);
        manager.recover().await?;
        manager.spawn_background();
        Ok(manager)
    }

    /// Build a manager without recovering or spawning the background task.
    ///
    /// The caller drives it with [`recover`](Self::recover),
    /// [`dispatch_once`](Self::dispatch_once) and
    /// [`snapshot_all`](Self::snapshot_all).
    pub fn create(
        config: ManagerConfig,
        store: Option<Arc<dyn SnapshotStore>>,
        executor: Arc<dyn Executor>,
    ) -> Arc<Self> {
        let config = config.validated();
        let (shutdown_tx, _) = watch::channel(false);

        if let Some(ref s) = store {
            info!(backend = %s.name(), "Snapshot persistence enabled");
        }

        Arc::new(Self {
            queues: RwLock::new(FxHashMap::default()),
            config,
            store,
            executor,
            metrics: Arc::new(ManagerMetrics::new()),
            persisted: tokio::sync::Mutex::new(FxHashMap::default()),
            wakeup: Arc::new(Notify::new()),
            shutdown_tx,
            background: Mutex::new(None),
        })
    }

    fn spawn_background(self: &Arc<Self>) {
        let mgr = Arc::clone(self);
        let handle = tokio::spawn(async move {
            mgr.background_tasks().await;
        });
        *self.background.lock() = Some(handle);
    }

    #[inline]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    #[inline]
    pub fn has_storage(&self) -> bool {
        self.store.is_some()
    }

    pub fn storage_backend_name(&self) -> &'static str {
        self.store.as_ref().map(|s| s.name()).unwrap_or("none")
    }

    // ============== Registry ==============

    /// Queue handle for `name`, created with the configured window on first use.
    pub fn queue(&self, name: &str) -> Arc<EnhancedQueue> {
        if let Some(queue) = self.queues.read().get(name) {
            return Arc::clone(queue);
        }

        let mut queues = self.queues.write();
        let queue = queues.entry(CompactString::from(name)).or_insert_with(|| {
            let window = self.config.window_for(name);
            info!(queue = %name, window, "Queue created");
            Arc::new(EnhancedQueue::new(window))
        });
        Arc::clone(queue)
    }

    pub fn get_queue(&self, name: &str) -> Option<Arc<EnhancedQueue>> {
        self.queues.read().get(name).cloned()
    }

    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues.read().keys().map(|k| k.to_string()).collect();
        names.sort();
        names
    }

    /// Handles to every queue, copied out so the registry lock is released.
    pub(crate) fn queue_list(&self) -> Vec<(CompactString, Arc<EnhancedQueue>)> {
        self.queues
            .read()
            .iter()
            .map(|(name, queue)| (name.clone(), Arc::clone(queue)))
            .collect()
    }

    // ============== Operations ==============

    /// Submit a key. `Ok(false)` means it was already pending or processing.
    pub fn add(
        &self,
        queue: &str,
        key: impl Into<String>,
        priority: i64,
        creation_time: DateTime<Utc>,
    ) -> Result<bool, ManagerError> {
        if self.is_shutdown() {
            return Err(ManagerError::ShuttingDown);
        }
        let added = self.queue(queue).add(key, priority, creation_time);
        if added {
            self.metrics.record_add();
            self.wakeup.notify_one();
        }
        Ok(added)
    }

    /// Mark an admitted key finished. Redundant calls return `false`.
    pub fn complete(&self, queue: &str, key: &str) -> bool {
        let released = self
            .get_queue(queue)
            .and_then(|q| q.pop_processing(key))
            .is_some();
        if released {
            self.metrics.record_complete();
            self.wakeup.notify_one();
        }
        released
    }

    /// Withdraw a key that has not been admitted yet.
    pub fn cancel(&self, queue: &str, key: &str) -> bool {
        let removed = self
            .get_queue(queue)
            .map(|q| q.remove_pending(key))
            .unwrap_or(false);
        if removed {
            self.metrics.record_cancel();
        }
        removed
    }

    pub fn set_window(&self, queue: &str, window: i64) {
        self.queue(queue).set_window(window);
        info!(queue = %queue, window, "Window changed");
        self.wakeup.notify_one();
    }

    pub fn queue_stats(&self) -> Vec<(String, QueueStats)> {
        let mut stats: Vec<(String, QueueStats)> = self
            .queue_list()
            .into_iter()
            .map(|(name, queue)| (name.to_string(), queue.stats()))
            .collect();
        stats.sort_by(|a, b| a.0.cmp(&b.0));
        stats
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    // ============== Shutdown ==============

    #[inline]
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Stop dispatching, wait for the background task and flush a final
    /// snapshot of every changed queue.
    pub async fn shutdown(&self) -> super::SnapshotReport {
        self.shutdown_tx.send_replace(true);

        let handle = self.background.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Background task ended abnormally");
            }
        }

        let report = self.snapshot_all(true).await;
        info!(
            written = report.written,
            failed = report.failed,
            "Queue manager stopped"
        );
        report
    }

    // ============== Recovery ==============

    /// Import the stored snapshot of every queue the store knows about.
    ///
    /// Returns the number of queues restored. Processing keys are restored as
    /// processing; they are not re-dispatched.
    pub async fn recover(&self) -> Result<usize, ManagerError> {
        let Some(ref store) = self.store else {
            return Ok(0);
        };

        let names = match store.queue_names().await {
            Ok(names) => names,
            Err(e) => {
                self.recovery_failed(None, ManagerError::Storage(e))?;
                return Ok(0);
            }
        };

        let mut restored = 0;
        for name in names {
            let bytes = match store.get(&name).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(e) => {
                    self.recovery_failed(Some(&name), ManagerError::Storage(e))?;
                    continue;
                }
            };

            let queue = self.queue(&name);
            if let Err(e) = queue.import_json(&bytes) {
                self.recovery_failed(
                    Some(&name),
                    ManagerError::Snapshot {
                        queue: name.clone(),
                        source: e,
                    },
                )?;
                continue;
            }

            self.persisted
                .lock()
                .await
                .insert(CompactString::from(name.as_str()), queue.changes());
            let stats = queue.stats();
            info!(
                queue = %name,
                pending = stats.pending,
                processing = stats.processing,
                window = stats.window,
                "Recovered queue from snapshot"
            );
            restored += 1;
        }

        if restored > 0 {
            info!(count = restored, backend = %store.name(), "Recovered queues from storage");
        }
        Ok(restored)
    }

    fn recovery_failed(&self, queue: Option<&str>, err: ManagerError) -> Result<(), ManagerError> {
        match self.config.recovery {
            RecoveryPolicy::FailOpen => {
                warn!(queue = ?queue, error = %err, "Recovery failed, starting empty");
                Ok(())
            }
            RecoveryPolicy::FailClosed => {
                error!(queue = ?queue, error = %err, "Recovery failed");
                Err(err)
            }
        }
    }
}
