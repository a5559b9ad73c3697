use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use batchwire_core::EncodedItem;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::batcher::{Batcher, Command};
use crate::{BatchPolicy, PendingRequest, ResultHandle, Transport};

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) submitted: AtomicU64,
    pub(crate) batches_sent: AtomicU64,
    pub(crate) failed_batches: AtomicU64,
    pub(crate) in_flight: AtomicUsize,
    /// Every id below this value has left the queue.
    pub(crate) dispatched_below: AtomicU64,
}

/// Point-in-time view of scheduler activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Items the batcher has taken into its queue.
    pub submitted: u64,
    pub batches_sent: u64,
    pub failed_batches: u64,
    pub in_flight: usize,
}

struct Enqueue {
    next_id: u64,
    tx: mpsc::UnboundedSender<Command>,
}

/// Aggregates single-item submissions into batches and routes each batch's
/// rows back to the submitters.
///
/// Ids are assigned under the same lock that enqueues, so queue order and id
/// order agree.
pub struct BatchScheduler {
    queue: Mutex<Enqueue>,
    counters: Arc<Counters>,
    task: Mutex<Option<JoinHandle<()>>>,
    policy: BatchPolicy,
}

impl BatchScheduler {
    /// Spawns the batcher task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(transport: Arc<dyn Transport>, policy: BatchPolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let batcher = Batcher::new(policy.clone(), rx, transport, Arc::clone(&counters));
        let task = tokio::spawn(batcher.run());

        Self {
            queue: Mutex::new(Enqueue { next_id: 0, tx }),
            counters,
            task: Mutex::new(Some(task)),
            policy,
        }
    }

    /// Queues one item and returns immediately.
    pub fn submit(&self, item: EncodedItem) -> ResultHandle {
        let (slot, rx) = oneshot::channel();
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let id = queue.next_id;
        queue.next_id += 1;

        let req = PendingRequest { id, item, slot };
        if queue.tx.send(Command::Submit(req)).is_err() {
            // The request (and its slot) is dropped, so the handle reports closed.
            debug!(id, "submit after scheduler shutdown");
        }
        ResultHandle::new(id, rx)
    }

    /// Sends whatever is queued without waiting for the batch to fill.
    pub fn flush(&self) {
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = queue.tx.send(Command::Flush);
    }

    /// Whether the item with `id` has been handed to a batch.
    pub fn is_dispatched(&self, id: u64) -> bool {
        id < self.counters.dispatched_below.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: self.counters.submitted.load(Ordering::Acquire),
            batches_sent: self.counters.batches_sent.load(Ordering::Acquire),
            failed_batches: self.counters.failed_batches.load(Ordering::Acquire),
            in_flight: self.counters.in_flight.load(Ordering::Acquire),
        }
    }

    pub fn policy(&self) -> &BatchPolicy {
        &self.policy
    }

    /// Flushes queued items, waits for in-flight batches, then stops the
    /// batcher. Later submissions resolve to `SchedulerClosed`.
    pub async fn shutdown(&self) {
        {
            let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = queue.tx.send(Command::Shutdown);
        }
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "batcher task failed");
            }
        }
    }
}
