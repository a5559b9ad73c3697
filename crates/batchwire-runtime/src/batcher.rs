use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{sleep_until, timeout, Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::scheduler::Counters;
use crate::{BatchPayload, PendingRequest, PredictionError, Transport, TransportError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchPolicy {
    pub max_batch: usize,
    pub max_delay: Duration,
    pub max_in_flight: usize,
    pub request_timeout: Duration,
}

/// Requests collected between two flushes, sent in one transport call.
#[derive(Debug)]
pub struct Batch {
    pub seq: u64,
    pub requests: Vec<PendingRequest>,
    pub created_at: Instant,
}

#[derive(Debug)]
pub(crate) enum Command {
    Submit(PendingRequest),
    Flush,
    Shutdown,
}

/// Owns the pending queue. Runs as a single task; sends happen in spawned
/// dispatch tasks so the next batch can form while one is in flight.
pub(crate) struct Batcher {
    policy: BatchPolicy,
    rx: mpsc::UnboundedReceiver<Command>,
    transport: Arc<dyn Transport>,
    counters: Arc<Counters>,
    permits: Arc<Semaphore>,
    next_seq: u64,
}

impl Batcher {
    pub(crate) fn new(
        policy: BatchPolicy,
        rx: mpsc::UnboundedReceiver<Command>,
        transport: Arc<dyn Transport>,
        counters: Arc<Counters>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(policy.max_in_flight));
        Self {
            policy,
            rx,
            transport,
            counters,
            permits,
            next_seq: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut pending: Vec<PendingRequest> = Vec::new();
        let mut first_seen: Option<Instant> = None;
        let mut in_flight = JoinSet::new();

        info!(
            max_batch = self.policy.max_batch,
            max_delay_ms = self.policy.max_delay.as_millis() as u64,
            "batcher started"
        );

        loop {
            // Only polled while something is queued.
            let deadline = first_seen.map_or_else(Instant::now, |t0| t0 + self.policy.max_delay);

            tokio::select! {
                cmd = self.rx.recv() => {
                    match cmd {
                        None | Some(Command::Shutdown) => break,
                        Some(Command::Submit(req)) => {
                            self.counters.submitted.fetch_add(1, Ordering::AcqRel);
                            if pending.is_empty() { first_seen = Some(Instant::now()); }
                            pending.push(req);
                            if pending.len() >= self.policy.max_batch {
                                self.flush(&mut pending, &mut in_flight);
                                first_seen = None;
                            }
                        }
                        Some(Command::Flush) => {
                            self.flush(&mut pending, &mut in_flight);
                            first_seen = None;
                        }
                    }
                }
                _ = sleep_until(deadline), if first_seen.is_some() => {
                    self.flush(&mut pending, &mut in_flight);
                    first_seen = None;
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "batch dispatch task failed");
                    }
                }
            }
        }

        // Drain: queued items still go out, in-flight batches finish.
        // Anything submitted after this point is dropped with the receiver.
        self.rx.close();
        self.flush(&mut pending, &mut in_flight);
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "batch dispatch task failed");
            }
        }
        info!(batches = self.next_seq, "batcher stopped");
    }

    fn flush(&mut self, pending: &mut Vec<PendingRequest>, in_flight: &mut JoinSet<()>) {
        while !pending.is_empty() {
            let take = pending.len().min(self.policy.max_batch);
            let reqs: Vec<PendingRequest> = pending.drain(..take).collect();

            let seq = self.next_seq;
            self.next_seq += 1;
            if let Some(last) = reqs.last() {
                self.counters
                    .dispatched_below
                    .fetch_max(last.id + 1, Ordering::AcqRel);
            }

            debug!(batch = seq, size = reqs.len(), "dispatching batch");
            let batch = Batch {
                seq,
                requests: reqs,
                created_at: Instant::now(),
            };
            in_flight.spawn(dispatch(
                batch,
                Arc::clone(&self.transport),
                Arc::clone(&self.permits),
                Arc::clone(&self.counters),
                self.policy.request_timeout,
            ));
        }
    }
}

/// Sends one batch and resolves every slot in it, in batch order.
async fn dispatch(
    batch: Batch,
    transport: Arc<dyn Transport>,
    permits: Arc<Semaphore>,
    counters: Arc<Counters>,
    request_timeout: Duration,
) {
    let Batch {
        seq,
        requests,
        created_at,
    } = batch;
    let (slots, rows): (Vec<_>, Vec<_>) = requests.into_iter().map(|r| (r.slot, r.item)).unzip();
    let size = rows.len();

    // The semaphore is never closed; a failed acquire drops the slots,
    // which resolves their handles as closed.
    let Ok(_permit) = permits.acquire().await else {
        return;
    };
    counters.in_flight.fetch_add(1, Ordering::AcqRel);
    let queued_us = created_at.elapsed().as_micros() as u64;
    let t0 = Instant::now();

    let outcome = match timeout(request_timeout, transport.send(BatchPayload { rows })).await {
        Err(_) => Err(PredictionError::Timeout(request_timeout)),
        Ok(Err(e)) => Err(PredictionError::Transport(e)),
        Ok(Ok(resp)) if resp.rows.len() != size => {
            Err(PredictionError::Transport(TransportError::RowCount {
                expected: size,
                actual: resp.rows.len(),
            }))
        }
        Ok(Ok(resp)) => Ok(resp),
    };

    counters.in_flight.fetch_sub(1, Ordering::AcqRel);
    counters.batches_sent.fetch_add(1, Ordering::AcqRel);
    let send_us = t0.elapsed().as_micros() as u64;

    match outcome {
        Ok(resp) => {
            debug!(batch = seq, size, queued_us, send_us, "batch answered");
            for (slot, row) in slots.into_iter().zip(resp.rows) {
                // A dropped handle means the caller stopped waiting.
                let _ = slot.send(row.into_result());
            }
        }
        Err(err) => {
            counters.failed_batches.fetch_add(1, Ordering::AcqRel);
            warn!(batch = seq, size, send_us, error = %err, "batch failed");
            for slot in slots {
                let _ = slot.send(Err(err.clone()));
            }
        }
    }
}
