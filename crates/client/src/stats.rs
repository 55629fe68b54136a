//! Diagnostic counters for the telemetry pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared across the pipeline components. Lock-free; incremented
/// with relaxed ordering since they are diagnostics, not synchronization.
#[derive(Debug, Default)]
pub struct Counters {
    pub(crate) records_enqueued: AtomicU64,
    pub(crate) records_dropped: AtomicU64,
    pub(crate) batches_delivered: AtomicU64,
    pub(crate) batches_dropped: AtomicU64,
    pub(crate) delivery_retries: AtomicU64,
}

impl Counters {
    /// Takes a point-in-time snapshot.
    pub fn snapshot(&self) -> ClientStats {
        ClientStats {
            records_enqueued: self.records_enqueued.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            delivery_retries: self.delivery_retries.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Records accepted into the queue.
    pub records_enqueued: u64,
    /// Records lost to queue overflow, rejection, or post-shutdown intake.
    pub records_dropped: u64,
    /// Batches acknowledged by the endpoint.
    pub batches_delivered: u64,
    /// Batches discarded after exhausted retries, rejection, or shutdown.
    pub batches_dropped: u64,
    /// Individual delivery attempts that were retried.
    pub delivery_retries: u64,
}
