//! The error contract the cache needs from its fetchers.

/// Errors a query fetcher may fail with.
///
/// The cache clones one failure to every caller awaiting the same key, and
/// consults [`QueryError::is_retryable`] before applying the retry policy.
pub trait QueryError: std::error::Error + Clone + Send + Sync + 'static {
    /// Transport failures and HTTP status failures are retryable; validation
    /// and decode failures are not.
    fn is_retryable(&self) -> bool;

    /// Failure raised by the cache itself (fetch task died, cached value of an
    /// unexpected type).
    fn cache_failure(reason: String) -> Self;
}
