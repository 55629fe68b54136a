//! Groups queued records into size- and age-bounded batches.

use std::sync::Arc;
use std::time::Duration;

use beacon_protocol::Batch;

use crate::queue::RecordQueue;

/// Cuts batches from the queue when a size or age threshold is met.
///
/// Pure grouping: records move from the queue into exactly one batch, in
/// insertion order; only the queue may drop records.
pub struct Batcher {
    queue: Arc<RecordQueue>,
    namespace: String,
    max_batch_size: usize,
    max_batch_age: Duration,
}

impl Batcher {
    pub fn new(
        queue: Arc<RecordQueue>,
        namespace: impl Into<String>,
        max_batch_size: usize,
        max_batch_age: Duration,
    ) -> Self {
        Self {
            queue,
            namespace: namespace.into(),
            max_batch_size,
            max_batch_age,
        }
    }

    /// Cuts a batch if the size or age trigger has fired, whichever first.
    pub fn tick(&self) -> Option<Batch> {
        let len = self.queue.len();
        if len == 0 {
            return None;
        }

        let size_due = len >= self.max_batch_size;
        let age_due = self
            .queue
            .oldest_age()
            .is_some_and(|age| age >= self.max_batch_age);

        if size_due || age_due { self.cut() } else { None }
    }

    /// Unconditionally cuts up to `max_batch_size` records into a batch.
    ///
    /// Returns `None` when the queue is empty. Used by flush and shutdown,
    /// which cut repeatedly until the queue drains.
    pub fn cut(&self) -> Option<Batch> {
        let records = self.queue.drain(self.max_batch_size);
        if records.is_empty() {
            return None;
        }
        Some(Batch::new(self.namespace.clone(), records))
    }
}
