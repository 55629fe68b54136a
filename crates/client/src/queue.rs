//! Bounded in-memory record queue with configurable overflow policy.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use beacon_protocol::Record;

use crate::config::OverflowPolicy;
use crate::error::QueueFull;
use crate::stats::Counters;

struct QueuedRecord {
    record: Record,
    enqueued_at: Instant,
}

/// Bounded FIFO of pending records.
///
/// The single point of contention between producers and the batcher.
/// `enqueue` and `drain` take a short-held lock that is never held across
/// I/O. At capacity the overflow policy decides whether the oldest record
/// is evicted or the new one rejected; either way the shared dropped-record
/// counter is incremented.
pub struct RecordQueue {
    inner: Mutex<VecDeque<QueuedRecord>>,
    capacity: usize,
    policy: OverflowPolicy,
    counters: Arc<Counters>,
}

impl RecordQueue {
    /// Creates a queue with the given capacity and overflow policy.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, policy: OverflowPolicy, counters: Arc<Counters>) -> Self {
        assert!(capacity > 0, "queue capacity must be > 0");
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            policy,
            counters,
        }
    }

    /// Appends a record, applying the overflow policy at capacity.
    pub fn enqueue(&self, record: Record) -> Result<(), QueueFull> {
        let mut buf = self.inner.lock().unwrap();
        if buf.len() == self.capacity {
            match self.policy {
                OverflowPolicy::DropOldest => {
                    buf.pop_front();
                    self.counters.records_dropped.fetch_add(1, Ordering::Relaxed);
                }
                OverflowPolicy::RejectNew => {
                    drop(buf);
                    self.counters.records_dropped.fetch_add(1, Ordering::Relaxed);
                    return Err(QueueFull);
                }
            }
        }
        buf.push_back(QueuedRecord {
            record,
            enqueued_at: Instant::now(),
        });
        Ok(())
    }

    /// Removes and returns up to `max` records in insertion order.
    pub fn drain(&self, max: usize) -> Vec<Record> {
        let mut buf = self.inner.lock().unwrap();
        let take = max.min(buf.len());
        buf.drain(..take).map(|q| q.record).collect()
    }

    /// Number of queued records.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Whether the queue holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Age of the oldest queued record, if any.
    pub fn oldest_age(&self) -> Option<Duration> {
        let buf = self.inner.lock().unwrap();
        buf.front().map(|q| q.enqueued_at.elapsed())
    }

    /// Maximum number of records the queue can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
