//! Telemetry record and batch model shared across the Beacon crates.

pub mod batch;
pub mod record;

// Re-export primary types for convenience.
pub use batch::Batch;
pub use record::{Record, RecordKind, RecordValue, now_millis};
