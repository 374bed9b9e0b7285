//! Staleness, eviction, and retry policies.

use std::time::Duration;

use serde::Deserialize;

use crate::error::QueryError;

/// How long a cached result stays fresh, and how long an unused one is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// After this, the entry is stale and the next read refetches.
    pub stale_time: Duration,
    /// After this long without a read, the entry is evicted.
    pub gc_time: Duration,
}

impl CachePolicy {
    /// Resources that change within minutes (dashboard, ledgers, reports).
    pub const REALTIME: Self = Self::new(Duration::from_secs(2 * 60), Duration::from_secs(5 * 60));

    /// Slower-moving reference data (members, owners, settings).
    pub const REFERENCE: Self =
        Self::new(Duration::from_secs(5 * 60), Duration::from_secs(10 * 60));

    pub const fn new(stale_time: Duration, gc_time: Duration) -> Self {
        Self {
            stale_time,
            gc_time,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::REALTIME
    }
}

/// Exponential backoff applied uniformly to failed reads.
///
/// The delay before retry `n` (1-based) is `min(base * 2^(n-1), max)`, so the
/// defaults wait 1s, 2s, 4s across three retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    pub max_retries: u32,
    #[serde(rename = "base_delay_ms", with = "millis")]
    pub base_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "millis")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

impl RetryPolicy {
    /// Never retry. Used for writes, which are not idempotent.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before the given retry (1-based). Retry 0 has no delay.
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exponent = (retry - 1).min(31);
        self.base_delay
            .saturating_mul(2u32.pow(exponent))
            .min(self.max_delay)
    }

    /// The full delay schedule, one entry per permitted retry.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_retries).map(|n| self.delay_for(n)).collect()
    }

    /// Whether to try again after `failures` consecutive failures.
    pub fn should_retry<E: QueryError>(&self, failures: u32, error: &E) -> bool {
        failures <= self.max_retries && error.is_retryable()
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
