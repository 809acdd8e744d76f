//! Error types for the cache.

use feedcache_codec::RecordId;
use feedcache_store::StoreError;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors returned by the cache.
///
/// Everything except [`CacheError::NotFound`] is a health failure: the
/// cache as a whole is not trusted while one is recorded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The id is not in an otherwise healthy cache.
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// A full scan of the record store failed.
    #[error("snapshot load failed: {0}")]
    Snapshot(StoreError),

    /// The change feed failed; the cache may be behind the store.
    #[error("change feed error: {0}")]
    Feed(StoreError),

    /// The cache was closed.
    #[error("cache closed")]
    Closed,
}

impl CacheError {
    /// Returns true for the not-found outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }

    /// Returns true if this error means the whole cache is suspect.
    pub fn is_health_failure(&self) -> bool {
        !self.is_not_found()
    }

    /// Returns the underlying store error, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            CacheError::Snapshot(e) | CacheError::Feed(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_not_a_health_failure() {
        assert!(CacheError::NotFound(1).is_not_found());
        assert!(!CacheError::NotFound(1).is_health_failure());
        assert!(CacheError::Closed.is_health_failure());
        assert!(CacheError::Feed(StoreError::FeedClosed).is_health_failure());
    }

    #[test]
    fn error_display() {
        let err = CacheError::Feed(StoreError::unavailable("connection refused"));
        assert_eq!(
            err.to_string(),
            "change feed error: store unavailable: connection refused"
        );
        assert_eq!(err.store_error(), Some(&StoreError::unavailable("connection refused")));
        assert_eq!(CacheError::NotFound(7).to_string(), "record 7 not found");
    }
}
