//! The seam between the delivery worker and a concrete ingest backend.

use std::future::Future;
use std::pin::Pin;

use beacon_protocol::Batch;

/// Error reported by an ingest endpoint for one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The endpoint asked the client to slow down. Retryable.
    #[error("endpoint throttled the request")]
    Throttled,

    /// The call never completed (connection refused, reset, timed out).
    /// Retryable.
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint refused the batch as malformed. Not retryable.
    #[error("batch rejected: {0}")]
    Rejected(String),
}

impl SendError {
    /// Whether a failed attempt with this error may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled | Self::Network(_))
    }
}

/// Boxed future returned by [`IngestEndpoint::send`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SendError>> + Send + 'a>>;

/// A remote service boundary that accepts batches.
///
/// Implementations perform the actual network call; the delivery worker
/// never sees transport details. One call carries the whole batch.
pub trait IngestEndpoint: Send + Sync {
    fn send<'a>(&'a self, batch: &'a Batch) -> SendFuture<'a>;
}
