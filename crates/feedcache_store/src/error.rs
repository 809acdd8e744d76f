//! Error types for record store clients.

use feedcache_codec::{CodecError, RecordId};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a record store or one of its cursors/streams.
///
/// The type is `Clone` because the cache keeps the last transport failure
/// as its health state and hands copies to every reader.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An open cursor or change stream broke mid-flight.
    #[error("stream interrupted: {0}")]
    Interrupted(String),

    /// The store ended the change stream.
    #[error("change feed closed by the store")]
    FeedClosed,

    /// Changes after the resume token are no longer retained.
    #[error("change history after the resume token is no longer available")]
    HistoryLost,

    /// The resume token was not issued by this store.
    #[error("invalid resume token")]
    InvalidToken,

    /// A record does not exist.
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// A record with the same id already exists.
    #[error("record {0} already exists")]
    DuplicateKey(RecordId),

    /// A record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl StoreError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Creates an interrupted error.
    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::Interrupted(message.into())
    }

    /// Returns true if retrying the same request can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::Interrupted(_) | StoreError::FeedClosed
        )
    }

    /// Returns true if the resume token can no longer be used and the
    /// subscriber has to start over from a fresh snapshot.
    pub fn requires_resync(&self) -> bool {
        matches!(self, StoreError::HistoryLost | StoreError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(StoreError::unavailable("connection refused").is_retryable());
        assert!(StoreError::interrupted("reset by peer").is_retryable());
        assert!(StoreError::FeedClosed.is_retryable());
        assert!(!StoreError::HistoryLost.is_retryable());
        assert!(!StoreError::NotFound(1).is_retryable());
    }

    #[test]
    fn resync_errors() {
        assert!(StoreError::HistoryLost.requires_resync());
        assert!(StoreError::InvalidToken.requires_resync());
        assert!(!StoreError::FeedClosed.requires_resync());
    }
}
