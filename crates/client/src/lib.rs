//! Beacon telemetry shipping client.
//!
//! Applications record metrics and logs through [`TelemetryClient`]; records
//! are buffered in a bounded queue, grouped into batches by size and age,
//! and shipped to an [`IngestEndpoint`] by a background worker with
//! exponential-backoff retries and a concurrency cap.
//!
//! Recording never blocks on network I/O and never surfaces delivery
//! failures to the caller; losses are visible through [`ClientStats`].
//! The queue is memory-only: records in flight at crash time are lost.

pub mod batcher;
pub mod client;
pub mod config;
mod delivery;
pub mod endpoint;
pub mod error;
pub mod queue;
pub mod stats;

// Re-export primary types for convenience.
pub use client::TelemetryClient;
pub use config::{BackoffConfig, ClientConfig, OverflowPolicy};
pub use endpoint::{IngestEndpoint, SendError, SendFuture};
pub use error::{FlushError, QueueFull};
pub use stats::{ClientStats, Counters};
