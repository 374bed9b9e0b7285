//! Sitebook Cache - Query Cache
//!
//! A process-wide, in-memory cache for backend reads with explicit staleness.
//!
//! # Contracts
//!
//! - Entries are identified by a structural [`QueryKey`]; equal values give
//!   equal keys regardless of how they were built.
//! - A fresh entry is served without a request. Concurrent reads of the same
//!   key share one in-flight request.
//! - Failed reads are retried with exponential backoff per [`RetryPolicy`]
//!   when the error says it is retryable.
//! - Invalidation marks matching entries stale. A request issued before the
//!   invalidation stores its result already stale.
//! - Unused entries are evicted after their [`CachePolicy::gc_time`].
//!
//! # Example
//!
//! ```ignore
//! let cache = QueryCache::<ServiceError>::new();
//! let key = QueryKey::new("owner-logs").with(7);
//! let read = cache
//!     .fetch(&key, CachePolicy::REFERENCE, RetryPolicy::default(), move || {
//!         let service = service.clone();
//!         async move { service.list(7).await }
//!     })
//!     .await?;
//! if read.is_stale() {
//!     tracing::debug!("Showing stale owner logs");
//! }
//! ```

pub mod error;
pub mod freshness;
pub mod key;
pub mod policy;
pub mod store;

pub use error::QueryError;
pub use freshness::{CacheRead, QueryState, QueryStatus};
pub use key::QueryKey;
pub use policy::{CachePolicy, RetryPolicy};
pub use store::{CacheStats, QueryCache};
