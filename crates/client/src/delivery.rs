//! Background delivery of batches with retry, backoff, and bounded
//! concurrency.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use beacon_protocol::Batch;
use tokio::sync::{Notify, Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::ClientConfig;
use crate::endpoint::{IngestEndpoint, SendError};
use crate::stats::Counters;

/// Capacity of the submit channel between the batch loop and the dispatch
/// loop. Submitters wait when dispatch falls this far behind.
const SUBMIT_BACKLOG: usize = 64;

/// Terminal state of a batch delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeliveryOutcome {
    Delivered,
    Dropped,
}

/// Shared state for the dispatch loop and per-batch delivery tasks.
pub(crate) struct DeliveryContext {
    pub(crate) endpoint: Arc<dyn IngestEndpoint>,
    pub(crate) config: ClientConfig,
    pub(crate) counters: Arc<Counters>,
    pub(crate) cancel: CancellationToken,
}

/// Drives one batch to a terminal state: delivered or dropped.
///
/// Each attempt is one endpoint call bounded by `send_timeout`; retryable
/// failures sleep `backoff(attempt)` before the next attempt, racing the
/// cancellation token so shutdown abandons pending retries promptly.
pub(crate) async fn deliver_with_retry(ctx: &DeliveryContext, batch: &Batch) -> DeliveryOutcome {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        trace!(batch = %batch.id, attempt, records = batch.len(), "sending batch");

        let result = tokio::time::timeout(ctx.config.send_timeout, ctx.endpoint.send(batch)).await;
        let err = match result {
            Ok(Ok(())) => {
                ctx.counters
                    .batches_delivered
                    .fetch_add(1, Ordering::Relaxed);
                debug!(batch = %batch.id, attempt, records = batch.len(), "batch delivered");
                return DeliveryOutcome::Delivered;
            }
            Ok(Err(e)) => e,
            Err(_) => SendError::Network("send timed out".into()),
        };

        if !err.is_retryable() {
            ctx.counters.batches_dropped.fetch_add(1, Ordering::Relaxed);
            warn!(batch = %batch.id, error = %err, "batch rejected by endpoint, dropping");
            return DeliveryOutcome::Dropped;
        }

        if attempt >= ctx.config.max_attempts {
            ctx.counters.batches_dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                batch = %batch.id,
                attempts = attempt,
                error = %err,
                "retries exhausted, dropping batch"
            );
            return DeliveryOutcome::Dropped;
        }

        ctx.counters.delivery_retries.fetch_add(1, Ordering::Relaxed);
        let delay = ctx.config.backoff.delay_for_attempt(attempt);
        debug!(
            batch = %batch.id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "delivery failed, retrying"
        );

        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                ctx.counters.batches_dropped.fetch_add(1, Ordering::Relaxed);
                debug!(batch = %batch.id, "delivery cancelled, dropping batch");
                return DeliveryOutcome::Dropped;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Handle to the background dispatch loop.
///
/// Batches submitted here are delivered concurrently, up to the configured
/// concurrency limit; ordering across batches is not guaranteed.
#[derive(Clone)]
pub(crate) struct DeliveryWorker {
    tx: mpsc::Sender<Batch>,
    in_flight: Arc<AtomicUsize>,
    settled: Arc<Notify>,
    counters: Arc<Counters>,
}

impl DeliveryWorker {
    /// Spawns the dispatch loop.
    pub(crate) fn spawn(ctx: DeliveryContext) -> Self {
        let (tx, mut rx) = mpsc::channel::<Batch>(SUBMIT_BACKLOG);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let settled = Arc::new(Notify::new());
        let semaphore = Arc::new(Semaphore::new(ctx.config.delivery_concurrency.max(1)));

        let loop_in_flight = Arc::clone(&in_flight);
        let loop_settled = Arc::clone(&settled);
        let cancel = ctx.cancel.clone();
        let counters = Arc::clone(&ctx.counters);
        let ctx = Arc::new(ctx);

        tokio::spawn(async move {
            loop {
                let batch = tokio::select! {
                    _ = cancel.cancelled() => break,
                    batch = rx.recv() => match batch {
                        Some(b) => b,
                        None => break,
                    },
                };

                let permit = tokio::select! {
                    _ = cancel.cancelled() => {
                        drop_undelivered(&ctx, &loop_in_flight, &loop_settled, &batch);
                        break;
                    }
                    permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                        Ok(p) => p,
                        Err(_) => break,
                    },
                };

                let ctx = Arc::clone(&ctx);
                let in_flight = Arc::clone(&loop_in_flight);
                let settled = Arc::clone(&loop_settled);
                tokio::spawn(async move {
                    let _permit = permit;
                    let _ = deliver_with_retry(&ctx, &batch).await;
                    if in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
                        settled.notify_waiters();
                    }
                });
            }

            // Account for batches still sitting in the channel at shutdown.
            rx.close();
            while let Ok(batch) = rx.try_recv() {
                drop_undelivered(&ctx, &loop_in_flight, &loop_settled, &batch);
            }
            debug!("delivery worker stopped");
        });

        Self {
            tx,
            in_flight,
            settled,
            counters,
        }
    }

    /// Hands a batch to the dispatch loop.
    ///
    /// Waits only for channel capacity, never for network I/O. Submitting
    /// after shutdown counts the batch as dropped.
    pub(crate) async fn submit(&self, batch: Batch) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        if let Err(err) = self.tx.send(batch).await {
            // Dispatch loop is gone; count the loss and undo the accounting.
            self.counters.batches_dropped.fetch_add(1, Ordering::Relaxed);
            warn!(batch = %err.0.id, "delivery worker stopped, dropping batch");
            if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
                self.settled.notify_waiters();
            }
        }
    }

    /// Whether no batches are queued for dispatch or in flight.
    pub(crate) fn is_idle(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) == 0
    }

    /// Waits until all submitted batches reach a terminal state.
    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.settled.notified();
            tokio::pin!(notified);
            // Register for wakeups before re-checking, so a notify between
            // the check and the await is not lost.
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

fn drop_undelivered(
    ctx: &DeliveryContext,
    in_flight: &AtomicUsize,
    settled: &Notify,
    batch: &Batch,
) {
    ctx.counters.batches_dropped.fetch_add(1, Ordering::Relaxed);
    debug!(batch = %batch.id, records = batch.len(), "batch dropped at shutdown");
    if in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
        settled.notify_waiters();
    }
}
