use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Returns the current unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Discriminates metric observations from log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Metric,
    Log,
}

/// The observed value: numeric for metrics, text for logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Number(f64),
    Text(String),
}

/// A single telemetry observation.
///
/// Immutable once created: the pipeline moves records, it never edits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Metric name. Empty for log records.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub kind: RecordKind,
    pub value: RecordValue,
    pub timestamp_ms: i64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

impl Record {
    /// Creates a metric record stamped with the current time.
    pub fn metric(name: impl Into<String>, value: f64, tags: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            kind: RecordKind::Metric,
            value: RecordValue::Number(value),
            timestamp_ms: now_millis(),
            tags,
        }
    }

    /// Creates a log record stamped with the current time.
    pub fn log(message: impl Into<String>, tags: HashMap<String, String>) -> Self {
        Self {
            name: String::new(),
            kind: RecordKind::Log,
            value: RecordValue::Text(message.into()),
            timestamp_ms: now_millis(),
            tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn metric_constructor_stamps_time() {
        let r = Record::metric("frame_time_ms", 16.6, HashMap::new());
        assert_eq!(r.kind, RecordKind::Metric);
        assert_eq!(r.value, RecordValue::Number(16.6));
        assert!(r.timestamp_ms > 0);
    }

    #[test]
    fn log_constructor_has_no_name() {
        let r = Record::log("player joined", tags(&[("level", "info")]));
        assert_eq!(r.kind, RecordKind::Log);
        assert!(r.name.is_empty());
        assert_eq!(r.value, RecordValue::Text("player joined".into()));
    }

    #[test]
    fn record_json_field_names() {
        let r = Record::metric("fps", 60.0, tags(&[("host", "a1")]));
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"timestampMs\""));
        assert!(json.contains("\"kind\":\"metric\""));
        assert!(json.contains("\"value\":60.0"));
    }

    #[test]
    fn record_omits_empty_fields() {
        let r = Record::metric("fps", 60.0, HashMap::new());
        let json = serde_json::to_string(&r).unwrap();
        assert!(!json.contains("tags"));

        let r = Record::log("hello", HashMap::new());
        let json = serde_json::to_string(&r).unwrap();
        assert!(!json.contains("name"));
    }

    #[test]
    fn record_roundtrip_metric() {
        let r = Record::metric("mem_bytes", 1024.0, tags(&[("region", "eu")]));
        let json = serde_json::to_string(&r).unwrap();
        let parsed: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(r, parsed);
    }

    #[test]
    fn record_roundtrip_log() {
        let r = Record::log("crash in level 3", tags(&[("severity", "error")]));
        let json = serde_json::to_string(&r).unwrap();
        let parsed: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(r, parsed);
    }

    #[test]
    fn value_untagged_serialization() {
        assert_eq!(
            serde_json::to_string(&RecordValue::Number(2.5)).unwrap(),
            "2.5"
        );
        assert_eq!(
            serde_json::to_string(&RecordValue::Text("x".into())).unwrap(),
            "\"x\""
        );
    }
}
