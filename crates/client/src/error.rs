//! Error types for the telemetry client.

/// The queue was at capacity and the record was not accepted.
///
/// Never surfaced to recording callers; the facade counts the drop and
/// returns normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("queue full")]
pub struct QueueFull;

/// Returned by `flush` and `shutdown` when deliveries do not settle in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FlushError {
    #[error("flush timed out with deliveries outstanding")]
    Timeout,
}
