//! Public entry point: the telemetry client facade.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use beacon_protocol::Record;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::batcher::Batcher;
use crate::config::ClientConfig;
use crate::delivery::{DeliveryContext, DeliveryWorker};
use crate::endpoint::IngestEndpoint;
use crate::error::FlushError;
use crate::queue::RecordQueue;
use crate::stats::{ClientStats, Counters};

/// Telemetry shipping client.
///
/// One instance is owned by the application's composition root and passed
/// by reference to call sites; its lifecycle is tied to application
/// startup/shutdown. Recording is non-blocking and never surfaces delivery
/// failures to callers; losses are visible through [`stats`](Self::stats).
///
/// Must be created from within a tokio runtime: construction spawns the
/// batcher loop and the delivery worker.
pub struct TelemetryClient {
    queue: Arc<RecordQueue>,
    batcher: Arc<Batcher>,
    worker: DeliveryWorker,
    counters: Arc<Counters>,
    cancel: CancellationToken,
    closed: AtomicBool,
    size_trigger: Arc<Notify>,
    max_batch_size: usize,
    shutdown_grace: Duration,
}

impl TelemetryClient {
    /// Creates the client and spawns its background tasks.
    pub fn new(config: ClientConfig, endpoint: Arc<dyn IngestEndpoint>) -> Self {
        let counters = Arc::new(Counters::default());
        let queue = Arc::new(RecordQueue::new(
            config.queue_capacity,
            config.overflow_policy,
            Arc::clone(&counters),
        ));
        let batcher = Arc::new(Batcher::new(
            Arc::clone(&queue),
            config.namespace.clone(),
            config.max_batch_size,
            config.max_batch_age,
        ));
        let cancel = CancellationToken::new();
        let size_trigger = Arc::new(Notify::new());

        let worker = DeliveryWorker::spawn(DeliveryContext {
            endpoint,
            config: config.clone(),
            counters: Arc::clone(&counters),
            cancel: cancel.clone(),
        });

        tokio::spawn(batch_loop(
            Arc::clone(&batcher),
            worker.clone(),
            tick_interval(config.max_batch_age),
            Arc::clone(&size_trigger),
            cancel.clone(),
        ));

        info!(
            namespace = %config.namespace,
            queue_capacity = config.queue_capacity,
            max_batch_size = config.max_batch_size,
            "telemetry client started"
        );

        Self {
            queue,
            batcher,
            worker,
            counters,
            cancel,
            closed: AtomicBool::new(false),
            size_trigger,
            max_batch_size: config.max_batch_size,
            shutdown_grace: config.shutdown_grace,
        }
    }

    /// Records a numeric metric observation. Non-blocking; a rejected
    /// record is counted, never surfaced.
    pub fn record_metric(
        &self,
        name: impl Into<String>,
        value: f64,
        tags: HashMap<String, String>,
    ) {
        self.enqueue(Record::metric(name, value, tags));
    }

    /// Records a log message. Non-blocking; a rejected record is counted,
    /// never surfaced.
    pub fn record_log(&self, message: impl Into<String>, tags: HashMap<String, String>) {
        self.enqueue(Record::log(message, tags));
    }

    /// Cuts all currently queued records into batches and waits up to
    /// `timeout` for outstanding deliveries to settle.
    pub async fn flush(&self, timeout: Duration) -> Result<(), FlushError> {
        let flushed = tokio::time::timeout(timeout, async {
            while let Some(batch) = self.batcher.cut() {
                self.worker.submit(batch).await;
            }
            self.worker.wait_idle().await;
        })
        .await;

        match flushed {
            Ok(()) => Ok(()),
            Err(_) => {
                debug!("flush timed out with deliveries outstanding");
                Err(FlushError::Timeout)
            }
        }
    }

    /// Stops accepting records, performs a final flush bounded by the
    /// configured grace period, then cancels background tasks and pending
    /// retries. Idempotent.
    pub async fn shutdown(&self) -> Result<(), FlushError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        info!("telemetry client shutting down");
        let result = self.flush(self.shutdown_grace).await;
        if result.is_err() {
            warn!("shutdown flush timed out, abandoning outstanding deliveries");
        }
        self.cancel.cancel();
        result
    }

    /// Point-in-time snapshot of the diagnostic counters.
    pub fn stats(&self) -> ClientStats {
        self.counters.snapshot()
    }

    /// Number of records currently waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn enqueue(&self, record: Record) {
        if self.closed.load(Ordering::Acquire) {
            self.counters.records_dropped.fetch_add(1, Ordering::Relaxed);
            trace!("record dropped, client is shut down");
            return;
        }

        match self.queue.enqueue(record) {
            Ok(()) => {
                self.counters
                    .records_enqueued
                    .fetch_add(1, Ordering::Relaxed);
                if self.queue.len() >= self.max_batch_size {
                    // Wake the batch loop rather than waiting for its tick.
                    self.size_trigger.notify_one();
                }
            }
            Err(_) => {
                // Counted by the queue.
                trace!("record rejected, queue full");
            }
        }
    }
}

impl Drop for TelemetryClient {
    fn drop(&mut self) {
        // Stop background tasks even if the owner never called shutdown.
        self.cancel.cancel();
    }
}

/// How often the batch loop re-checks the age trigger.
fn tick_interval(max_batch_age: Duration) -> Duration {
    (max_batch_age / 4).clamp(Duration::from_millis(10), Duration::from_secs(1))
}

/// Background loop cutting batches on tick or size trigger.
async fn batch_loop(
    batcher: Arc<Batcher>,
    worker: DeliveryWorker,
    tick: Duration,
    size_trigger: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // Skip the first immediate tick.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            _ = size_trigger.notified() => {}
        }

        while let Some(batch) = batcher.tick() {
            worker.submit(batch).await;
        }
    }
    debug!("batch loop stopped");
}
