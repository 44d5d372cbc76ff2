//! Dispatch: move admissible pending keys into processing and hand them off.

use std::sync::Arc;

use tracing::debug;

use super::enhanced::Admission;
use super::executor::{Completion, DispatchTicket};
use super::manager::QueueManager;

impl QueueManager {
    /// One pass over every queue, admitting until each is blocked or empty.
    ///
    /// Returns the number of keys handed to the executor. Does nothing once
    /// shutdown has begun.
    pub fn dispatch_once(&self) -> usize {
        let mut admitted = 0;

        for (name, queue) in self.queue_list() {
            loop {
                if self.is_shutdown() {
                    return admitted;
                }

                let key = match queue.pop_pending() {
                    Admission::Admitted(key) => key,
                    Admission::Blocked | Admission::Empty => break,
                };

                self.metrics.record_admit();
                debug!(queue = %name, key = %key, "Admitted");

                let completion = Completion::new(
                    Arc::clone(&queue),
                    Arc::clone(&self.metrics),
                    Arc::clone(&self.wakeup),
                    key.clone(),
                );
                self.executor
                    .dispatch(DispatchTicket::new(name.clone(), key, completion));
                admitted += 1;
            }
        }

        admitted
    }
}
