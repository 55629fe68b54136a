//! Client configuration and retry backoff policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Behavior when the record queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued record to make room for the new one.
    DropOldest,
    /// Reject the incoming record and keep the queue unchanged.
    RejectNew,
}

/// Retry backoff policy: exponential with jitter, capped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base: Duration,
    /// Maximum delay between attempts (backoff cap).
    pub cap: Duration,
    /// Multiplier for each subsequent attempt.
    pub factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(250),
            cap: Duration::from_secs(30),
            factor: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Delay for a given attempt number (1-based) before jitter is applied.
    ///
    /// Non-decreasing with the attempt count, capped at `cap`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.base.as_secs_f64() * self.factor.powi(exp);
        Duration::from_secs_f64(secs.min(self.cap.as_secs_f64()))
    }

    /// Jittered delay for a given attempt number (1-based).
    ///
    /// Applies ±25% jitter to avoid synchronized retries across clients;
    /// the result stays within `[0, cap]`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        use rand::Rng;
        let base = self.base_delay(attempt).as_secs_f64();
        let offset: f64 = rand::thread_rng().gen_range(-1.0..1.0);
        let jittered = (base + base * 0.25 * offset).clamp(0.0, self.cap.as_secs_f64());
        Duration::from_secs_f64(jittered)
    }
}

/// Configuration for [`TelemetryClient`](crate::TelemetryClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Namespace stamped on every batch.
    pub namespace: String,
    /// Maximum records per batch.
    pub max_batch_size: usize,
    /// Maximum time a record may wait in the queue before its batch is cut.
    pub max_batch_age: Duration,
    /// Queue capacity; records beyond it hit the overflow policy.
    pub queue_capacity: usize,
    /// What to do with new records when the queue is full.
    pub overflow_policy: OverflowPolicy,
    /// Maximum delivery attempts per batch before it is dropped.
    pub max_attempts: u32,
    /// Retry backoff policy.
    pub backoff: BackoffConfig,
    /// Maximum batches in flight concurrently.
    pub delivery_concurrency: usize,
    /// Deadline for a single endpoint call; overruns count as network
    /// failures and are retried.
    pub send_timeout: Duration,
    /// Upper bound on the final flush performed by `shutdown`.
    pub shutdown_grace: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            max_batch_size: 100,
            max_batch_age: Duration::from_secs(5),
            queue_capacity: 10_000,
            overflow_policy: OverflowPolicy::DropOldest,
            max_attempts: 5,
            backoff: BackoffConfig::default(),
            delivery_concurrency: 4,
            send_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = ClientConfig::default();
        assert_eq!(config.max_batch_size, 100);
        assert_eq!(config.queue_capacity, 10_000);
        assert_eq!(config.overflow_policy, OverflowPolicy::DropOldest);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.send_timeout, Duration::from_secs(10));
    }

    #[test]
    fn base_delay_doubles_up_to_cap() {
        let backoff = BackoffConfig {
            base: Duration::from_millis(250),
            cap: Duration::from_secs(4),
            factor: 2.0,
        };
        // 250ms, 500ms, 1s, 2s, 4s (capped), 4s...
        assert_eq!(backoff.base_delay(1), Duration::from_millis(250));
        assert_eq!(backoff.base_delay(2), Duration::from_millis(500));
        assert_eq!(backoff.base_delay(3), Duration::from_secs(1));
        assert_eq!(backoff.base_delay(4), Duration::from_secs(2));
        assert_eq!(backoff.base_delay(5), Duration::from_secs(4));
        assert_eq!(backoff.base_delay(6), Duration::from_secs(4));
    }

    #[test]
    fn base_delay_non_decreasing() {
        let backoff = BackoffConfig::default();
        let mut prev = Duration::ZERO;
        for attempt in 1..=20 {
            let delay = backoff.base_delay(attempt);
            assert!(delay >= prev, "attempt {attempt}: {delay:?} < {prev:?}");
            assert!(delay <= backoff.cap);
            prev = delay;
        }
    }

    #[test]
    fn jittered_delay_within_bounds() {
        let backoff = BackoffConfig {
            base: Duration::from_millis(100),
            cap: Duration::from_secs(2),
            factor: 2.0,
        };
        for attempt in 1..=10 {
            for _ in 0..50 {
                let delay = backoff.delay_for_attempt(attempt);
                assert!(delay <= backoff.cap, "attempt {attempt}: {delay:?}");
            }
        }
    }

    #[test]
    fn huge_attempt_does_not_overflow() {
        let backoff = BackoffConfig::default();
        assert_eq!(backoff.base_delay(u32::MAX), backoff.cap);
    }

    #[test]
    fn config_json_roundtrip() {
        let config = ClientConfig {
            namespace: "game".into(),
            ..ClientConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"maxBatchSize\""));
        assert!(json.contains("\"drop_oldest\""));
        let parsed: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.namespace, "game");
        assert_eq!(parsed.overflow_policy, OverflowPolicy::DropOldest);
    }
}
