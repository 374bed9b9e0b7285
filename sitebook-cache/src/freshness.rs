//! Freshness metadata for cache reads.
//!
//! Every read carries when its data was fetched and whether it came from the
//! cache or the network, so callers never mistake stale data for fresh.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Result of a cache read, carrying staleness metadata.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    fetched_at: DateTime<Utc>,
    was_cache_hit: bool,
    is_stale: bool,
}

impl<T> CacheRead<T> {
    /// A read served from a cached entry.
    pub fn from_cache(value: T, fetched_at: DateTime<Utc>, is_stale: bool) -> Self {
        Self {
            value,
            fetched_at,
            was_cache_hit: true,
            is_stale,
        }
    }

    /// A read that went to the network.
    pub fn from_network(value: T, fetched_at: DateTime<Utc>, is_stale: bool) -> Self {
        Self {
            value,
            fetched_at,
            was_cache_hit: false,
            is_stale,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Wall-clock age of the data.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// Stale data is still served, but the next read will refetch it.
    pub fn is_stale(&self) -> bool {
        self.is_stale
    }

    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            fetched_at: self.fetched_at,
            was_cache_hit: self.was_cache_hit,
            is_stale: self.is_stale,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Lifecycle of a query as a caller sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Not run: disabled by a missing precondition, or never requested.
    Idle,
    /// A request is in flight and there is no data yet.
    Loading,
    Success,
    Error,
}

/// What a read hands back to the UI: data, error, and status together.
#[derive(Debug, Clone)]
pub struct QueryState<T, E> {
    pub data: Option<T>,
    pub error: Option<E>,
    pub status: QueryStatus,
    pub fetched_at: Option<DateTime<Utc>>,
    pub is_stale: bool,
    pub is_fetching: bool,
}

impl<T, E> QueryState<T, E> {
    /// Never ran. Any previously cached data for the key is still shown.
    pub fn idle(cached: Option<CacheRead<T>>) -> Self {
        match cached {
            Some(read) => Self {
                is_stale: read.is_stale(),
                fetched_at: Some(read.fetched_at()),
                data: Some(read.into_value()),
                error: None,
                status: QueryStatus::Idle,
                is_fetching: false,
            },
            None => Self {
                data: None,
                error: None,
                status: QueryStatus::Idle,
                fetched_at: None,
                is_stale: true,
                is_fetching: false,
            },
        }
    }

    pub fn loading() -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Loading,
            fetched_at: None,
            is_stale: true,
            is_fetching: true,
        }
    }

    pub fn success(read: CacheRead<T>) -> Self {
        Self {
            is_stale: read.is_stale(),
            fetched_at: Some(read.fetched_at()),
            data: Some(read.into_value()),
            error: None,
            status: QueryStatus::Success,
            is_fetching: false,
        }
    }

    /// Failed; data from an earlier success is kept alongside the error.
    pub fn failed(error: E, cached: Option<CacheRead<T>>) -> Self {
        let fetched_at = cached.as_ref().map(CacheRead::fetched_at);
        Self {
            data: cached.map(CacheRead::into_value),
            error: Some(error),
            status: QueryStatus::Error,
            fetched_at,
            is_stale: true,
            is_fetching: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == QueryStatus::Idle
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}
