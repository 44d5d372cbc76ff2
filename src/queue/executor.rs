//! Handoff to the external execution engine.
//!
//! The dispatch loop hands each admitted key to an [`Executor`] as a
//! [`DispatchTicket`]. The engine runs the work and calls
//! [`DispatchTicket::complete`] (or a cloned [`Completion`]) when it finishes,
//! whether it succeeded or failed. Completing more than once is harmless.

use std::sync::Arc;

use compact_str::CompactString;
use tokio::sync::{mpsc, Notify};
use tracing::warn;

use super::enhanced::EnhancedQueue;
use super::types::ManagerMetrics;

/// Engine side of admission. Must not block: spawn or enqueue and return.
pub trait Executor: Send + Sync {
    fn dispatch(&self, ticket: DispatchTicket);
}

impl<F> Executor for F
where
    F: Fn(DispatchTicket) + Send + Sync,
{
    fn dispatch(&self, ticket: DispatchTicket) {
        self(ticket)
    }
}

/// Frees the window slot held by one admitted key.
#[derive(Clone)]
pub struct Completion {
    queue: Arc<EnhancedQueue>,
    metrics: Arc<ManagerMetrics>,
    wakeup: Arc<Notify>,
    key: String,
}

impl Completion {
    pub(crate) fn new(
        queue: Arc<EnhancedQueue>,
        metrics: Arc<ManagerMetrics>,
        wakeup: Arc<Notify>,
        key: String,
    ) -> Self {
        Self {
            queue,
            metrics,
            wakeup,
            key,
        }
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns `true` the first time, `false` on redundant calls.
    pub fn complete(&self) -> bool {
        let released = self.queue.pop_processing(&self.key).is_some();
        if released {
            self.metrics.record_complete();
            self.wakeup.notify_one();
        }
        released
    }
}

/// One admitted key handed to the executor.
pub struct DispatchTicket {
    pub queue: CompactString,
    pub key: String,
    completion: Completion,
}

impl DispatchTicket {
    pub(crate) fn new(queue: CompactString, key: String, completion: Completion) -> Self {
        Self {
            queue,
            key,
            completion,
        }
    }

    /// Cloneable completion handle, for engines that move the ticket apart.
    pub fn completion(&self) -> Completion {
        self.completion.clone()
    }

    #[inline]
    pub fn complete(&self) -> bool {
        self.completion.complete()
    }
}

impl std::fmt::Debug for DispatchTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTicket")
            .field("queue", &self.queue)
            .field("key", &self.key)
            .finish()
    }
}

/// Forwards tickets over an unbounded channel to a consumer task.
pub struct ChannelExecutor {
    tx: mpsc::UnboundedSender<DispatchTicket>,
}

impl ChannelExecutor {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DispatchTicket>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Executor for ChannelExecutor {
    fn dispatch(&self, ticket: DispatchTicket) {
        if let Err(mpsc::error::SendError(ticket)) = self.tx.send(ticket) {
            // Key stays processing until someone completes it.
            warn!(queue = %ticket.queue, key = %ticket.key, "Executor channel closed, ticket dropped");
        }
    }
}
