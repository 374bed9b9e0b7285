//! The process-wide query cache.
//!
//! Reads route through [`QueryCache::fetch`]: a fresh entry is served as-is;
//! otherwise the caller joins the single in-flight request for that key, or
//! starts one. Each request runs in its own task with the retry policy
//! applied, and writes its result only to the key it was issued for, so a
//! superseded request can still complete without touching anyone else's
//! entry. Only the latest request issued for a key may store its result.
//!
//! Invalidation never deletes data. It marks matching entries stale and bumps
//! a cache-wide watermark. A read after the bump never joins a request issued
//! before it; it starts a new one instead. A pre-bump request that is still
//! the latest for its key stores its result, but already stale.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::QueryError;
use crate::freshness::{CacheRead, QueryState};
use crate::key::QueryKey;
use crate::policy::{CachePolicy, RetryPolicy};

type Payload = Arc<dyn Any + Send + Sync>;
type SharedFetch<E> = Shared<BoxFuture<'static, Result<Payload, E>>>;

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from a fresh entry.
    pub hits: u64,
    /// Reads that started a network request.
    pub misses: u64,
    /// Reads that joined a request already in flight.
    pub deduplicated: u64,
    /// Entries marked stale by invalidation.
    pub invalidations: u64,
    /// Entries dropped by garbage collection.
    pub evictions: u64,
    /// Entries currently held.
    pub entry_count: u64,
}

impl CacheStats {
    /// Share of reads that did not hit the network (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.deduplicated;
        if total == 0 {
            0.0
        } else {
            (self.hits + self.deduplicated) as f64 / total as f64
        }
    }
}

struct Entry<E> {
    key: QueryKey,
    policy: CachePolicy,
    data: Option<Payload>,
    error: Option<E>,
    fetched_at: Option<DateTime<Utc>>,
    updated_at: Option<Instant>,
    last_access: Instant,
    invalidated: bool,
    /// Watermark of the last invalidation that matched this entry.
    invalidated_at: u64,
    inflight: Option<SharedFetch<E>>,
    /// Watermark at the time the in-flight request was issued.
    inflight_issued_at: u64,
    fetch_id: u64,
}

impl<E: QueryError> Entry<E> {
    fn new(key: QueryKey, policy: CachePolicy, now: Instant) -> Self {
        Self {
            key,
            policy,
            data: None,
            error: None,
            fetched_at: None,
            updated_at: None,
            last_access: now,
            invalidated: false,
            invalidated_at: 0,
            inflight: None,
            inflight_issued_at: 0,
            fetch_id: 0,
        }
    }

    fn is_stale(&self, now: Instant) -> bool {
        match self.updated_at {
            Some(updated_at) => {
                self.invalidated || now.duration_since(updated_at) >= self.policy.stale_time
            }
            None => true,
        }
    }

    /// An in-flight request issued before the entry's last invalidation
    /// cannot answer a read made after it.
    fn joinable(&self) -> Option<&SharedFetch<E>> {
        self.inflight
            .as_ref()
            .filter(|_| self.invalidated_at <= self.inflight_issued_at)
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.inflight.is_none() && now.duration_since(self.last_access) >= self.policy.gc_time
    }
}

struct CacheState<E> {
    entries: HashMap<String, Entry<E>>,
    watermark: u64,
    next_fetch_id: u64,
    stats: CacheStats,
}

/// Shared query cache. Clones share the same entries.
///
/// Only the cache writes entry data; callers read through [`fetch`],
/// [`peek`], and [`state`], and request invalidation.
///
/// [`fetch`]: QueryCache::fetch
/// [`peek`]: QueryCache::peek
/// [`state`]: QueryCache::state
pub struct QueryCache<E> {
    state: Arc<Mutex<CacheState<E>>>,
}

impl<E> Clone for QueryCache<E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<E: QueryError> Default for QueryCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: QueryError> QueryCache<E> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                watermark: 0,
                next_fetch_id: 0,
                stats: CacheStats::default(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<E>> {
        lock_state(&self.state)
    }

    /// Read `key`, going to the network only if the cached entry is missing
    /// or stale.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: &QueryKey,
        policy: CachePolicy,
        retry: RetryPolicy,
        fetcher: F,
    ) -> Result<CacheRead<T>, E>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.load(key, policy, retry, fetcher, false).await
    }

    /// Read `key` from the network regardless of freshness. Still joins a
    /// request already in flight for the key.
    pub async fn refetch<T, F, Fut>(
        &self,
        key: &QueryKey,
        policy: CachePolicy,
        retry: RetryPolicy,
        fetcher: F,
    ) -> Result<CacheRead<T>, E>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.load(key, policy, retry, fetcher, true).await
    }

    async fn load<T, F, Fut>(
        &self,
        key: &QueryKey,
        policy: CachePolicy,
        retry: RetryPolicy,
        fetcher: F,
        force: bool,
    ) -> Result<CacheRead<T>, E>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (fetch_id, pending) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let now = Instant::now();
            let watermark = state.watermark;
            let entry = state
                .entries
                .entry(key.encoded().to_string())
                .or_insert_with(|| Entry::new(key.clone(), policy, now));
            entry.policy = policy;
            entry.last_access = now;

            if !force && !entry.is_stale(now) {
                if let (Some(data), Some(fetched_at)) = (&entry.data, entry.fetched_at) {
                    let value = downcast::<T, E>(key, data)?;
                    state.stats.hits += 1;
                    tracing::trace!(key = %key, "Query cache hit");
                    return Ok(CacheRead::from_cache(value, fetched_at, false));
                }
            }

            if let Some(inflight) = entry.joinable() {
                let inflight = inflight.clone();
                let fetch_id = entry.fetch_id;
                state.stats.deduplicated += 1;
                tracing::trace!(key = %key, "Joining in-flight query");
                (fetch_id, inflight)
            } else {
                if entry.inflight.is_some() {
                    tracing::debug!(key = %key, "In-flight query predates invalidation; superseding");
                }
                let fetch_id = state.next_fetch_id + 1;
                let shared = self.start(key.clone(), fetch_id, watermark, retry, fetcher);
                entry.fetch_id = fetch_id;
                entry.inflight = Some(shared.clone());
                entry.inflight_issued_at = watermark;
                state.next_fetch_id = fetch_id;
                state.stats.misses += 1;
                (fetch_id, shared)
            }
        };

        let payload = pending.await?;
        let value = downcast::<T, E>(key, &payload)?;
        let (fetched_at, is_stale) = {
            let state = self.lock();
            match state.entries.get(key.encoded()) {
                Some(entry) if entry.fetch_id == fetch_id => (
                    entry.fetched_at.unwrap_or_else(Utc::now),
                    entry.is_stale(Instant::now()),
                ),
                _ => (Utc::now(), true),
            }
        };
        Ok(CacheRead::from_network(value, fetched_at, is_stale))
    }

    /// Spawn the request task and wrap its handle so every waiter shares it.
    fn start<T, F, Fut>(
        &self,
        key: QueryKey,
        fetch_id: u64,
        issued_at: u64,
        retry: RetryPolicy,
        fetcher: F,
    ) -> SharedFetch<E>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        tracing::debug!(key = %key, "Starting query");
        let writer = Arc::downgrade(&self.state);
        let task_key = key.clone();
        let task: JoinHandle<Result<Payload, E>> = tokio::spawn(async move {
            let outcome = run_with_retry(&task_key, retry, fetcher)
                .await
                .map(|value| Arc::new(value) as Payload);
            if let Some(state) = writer.upgrade() {
                complete(&state, &task_key, fetch_id, issued_at, &outcome);
            }
            outcome
        });

        let reaper = Arc::downgrade(&self.state);
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    let err = E::cache_failure(format!("query task for {} failed: {}", key, join_err));
                    if let Some(state) = reaper.upgrade() {
                        complete(&state, &key, fetch_id, issued_at, &Err(err.clone()));
                    }
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Cached value for `key` without touching the network.
    pub fn peek<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> Option<CacheRead<T>> {
        let mut state = self.lock();
        let now = Instant::now();
        let entry = state.entries.get_mut(key.encoded())?;
        entry.last_access = now;
        let data = entry.data.as_ref()?;
        let value = data.downcast_ref::<T>()?.clone();
        Some(CacheRead::from_cache(
            value,
            entry.fetched_at.unwrap_or_else(Utc::now),
            entry.is_stale(now),
        ))
    }

    /// Snapshot of a key as a caller would render it right now.
    pub fn state<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<T, E> {
        let (error, fetching) = {
            let state = self.lock();
            match state.entries.get(key.encoded()) {
                Some(entry) => (entry.error.clone(), entry.inflight.is_some()),
                None => (None, false),
            }
        };
        let cached = self.peek::<T>(key);
        let mut view = match (cached, error) {
            (None, None) if fetching => QueryState::loading(),
            (cached, Some(error)) => QueryState::failed(error, cached),
            (Some(read), None) => QueryState::success(read),
            (None, None) => QueryState::idle(None),
        };
        view.is_fetching = fetching;
        view
    }

    /// True when the key has no data, is past its stale time, or was invalidated.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        let state = self.lock();
        state
            .entries
            .get(key.encoded())
            .map_or(true, |entry| entry.is_stale(Instant::now()))
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        let state = self.lock();
        state
            .entries
            .get(key.encoded())
            .is_some_and(|entry| entry.inflight.is_some())
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.lock().entries.contains_key(key.encoded())
    }

    /// Keys currently held, in no particular order.
    pub fn keys(&self) -> Vec<QueryKey> {
        self.lock().entries.values().map(|e| e.key.clone()).collect()
    }

    /// Mark every entry under `prefix` stale. Returns the matched keys.
    pub fn invalidate(&self, prefix: &QueryKey) -> Vec<QueryKey> {
        let mut state = self.lock();
        state.watermark += 1;
        let watermark = state.watermark;
        let mut matched = Vec::new();
        for entry in state.entries.values_mut() {
            if entry.key.starts_with(prefix) {
                entry.invalidated = true;
                entry.invalidated_at = watermark;
                matched.push(entry.key.clone());
            }
        }
        state.stats.invalidations += matched.len() as u64;
        tracing::debug!(prefix = %prefix, matched = matched.len(), "Invalidated queries");
        matched
    }

    /// Mark every entry stale. Returns how many were marked.
    pub fn invalidate_all(&self) -> usize {
        let mut state = self.lock();
        state.watermark += 1;
        let watermark = state.watermark;
        let mut count = 0;
        for entry in state.entries.values_mut() {
            entry.invalidated = true;
            entry.invalidated_at = watermark;
            count += 1;
        }
        state.stats.invalidations += count as u64;
        tracing::debug!(count, "Invalidated all queries");
        count
    }

    /// Drop every entry under `prefix`. Results of requests still in flight
    /// for those keys are discarded on arrival, even if a later read has
    /// recreated the entry.
    pub fn remove(&self, prefix: &QueryKey) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.key.starts_with(prefix));
        before - state.entries.len()
    }

    /// Evict entries nobody has read within their `gc_time`.
    pub fn collect_garbage(&self) -> usize {
        let mut state = self.lock();
        let now = Instant::now();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        let evicted = before - state.entries.len();
        state.stats.evictions += evicted as u64;
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted unused queries");
        }
        evicted
    }

    /// Run garbage collection every `interval` until the cache is dropped.
    pub fn spawn_collector(&self, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Mutex<CacheState<E>>> = Arc::downgrade(&self.state);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(state) = weak.upgrade() else {
                    tracing::debug!("Query cache dropped; collector exiting");
                    break;
                };
                QueryCache { state }.collect_garbage();
            }
        })
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut stats = state.stats.clone();
        stats.entry_count = state.entries.len() as u64;
        stats
    }
}

fn lock_state<E>(state: &Mutex<CacheState<E>>) -> MutexGuard<'_, CacheState<E>> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Store a finished request's outcome on its own key.
fn complete<E: QueryError>(
    state: &Mutex<CacheState<E>>,
    key: &QueryKey,
    fetch_id: u64,
    issued_at: u64,
    outcome: &Result<Payload, E>,
) {
    let mut state = lock_state(state);
    let Some(entry) = state.entries.get_mut(key.encoded()) else {
        tracing::debug!(key = %key, "Query entry removed before completion; dropping result");
        return;
    };
    if entry.fetch_id != fetch_id {
        tracing::debug!(key = %key, fetch_id, "Superseded query finished; dropping result");
        return;
    }
    entry.inflight = None;
    match outcome {
        Ok(payload) => {
            entry.data = Some(Arc::clone(payload));
            entry.error = None;
            entry.fetched_at = Some(Utc::now());
            entry.updated_at = Some(Instant::now());
            entry.invalidated = entry.invalidated_at > issued_at;
        }
        // Prior data stays; only the error is recorded.
        Err(err) => entry.error = Some(err.clone()),
    }
}

async fn run_with_retry<T, F, Fut, E>(key: &QueryKey, retry: RetryPolicy, fetcher: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: QueryError,
{
    let mut failures = 0u32;
    loop {
        match fetcher().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                failures += 1;
                if !retry.should_retry(failures, &err) {
                    tracing::warn!(key = %key, attempts = failures, error = %err, "Query failed");
                    return Err(err);
                }
                let delay = retry.delay_for(failures);
                tracing::debug!(
                    key = %key,
                    attempt = failures,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying query"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn downcast<T: Clone + 'static, E: QueryError>(key: &QueryKey, payload: &Payload) -> Result<T, E> {
    payload.downcast_ref::<T>().cloned().ok_or_else(|| {
        E::cache_failure(format!(
            "cached value for {} is not a {}",
            key,
            std::any::type_name::<T>()
        ))
    })
}
