use serde::{Deserialize, Serialize};

use crate::record::{Record, now_millis};

/// A bounded group of records delivered as one endpoint call.
///
/// Created by the batcher and owned exclusively by the delivery worker
/// afterwards; never mutated after creation. Each delivery attempt carries
/// the whole batch or none of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    /// Namespace the records belong to, stamped from client config.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub records: Vec<Record>,
    pub created_at_ms: i64,
}

impl Batch {
    /// Creates a batch with a fresh id and the current timestamp.
    pub fn new(namespace: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            namespace: namespace.into(),
            records,
            created_at_ms: now_millis(),
        }
    }

    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
