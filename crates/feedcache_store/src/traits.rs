//! Record store client interfaces.

use crate::error::StoreResult;
use crate::token::ResumeToken;
use async_trait::async_trait;
use bytes::Bytes;
use feedcache_codec::{Record, RecordId};
use std::sync::Arc;

/// One stored record, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Encoded record.
    pub bytes: Bytes,
}

/// One delivered change-feed event, not yet decoded.
///
/// The token is attached by the transport, so it is usable even when the
/// payload turns out to be malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    /// Token that resumes the feed right after this event.
    pub token: ResumeToken,
    /// Encoded change event.
    pub payload: Bytes,
}

/// A remote collection of records with a subscribable change feed.
///
/// This trait abstracts the record store the cache mirrors, allowing for
/// different implementations (a document database driver, the in-memory
/// reference store, test doubles).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Counts all records. Used only as a sizing hint.
    async fn count_all(&self) -> StoreResult<u64>;

    /// Starts a full, unfiltered scan of the collection.
    async fn find_all(&self) -> StoreResult<Box<dyn DocumentCursor>>;

    /// Subscribes to the change feed.
    ///
    /// With `resume_after` the stream starts with the first event after the
    /// token. Without it the stream starts at the moment of subscription.
    async fn open_change_feed(
        &self,
        resume_after: Option<ResumeToken>,
    ) -> StoreResult<Box<dyn ChangeStream>>;
}

/// Cursor over a full scan.
#[async_trait]
pub trait DocumentCursor: Send {
    /// Returns the next document, or `None` when the scan is complete.
    async fn next(&mut self) -> StoreResult<Option<RawDocument>>;
}

/// An open change-feed subscription.
#[async_trait]
pub trait ChangeStream: Send {
    /// Waits for the next event.
    ///
    /// `Ok(None)` means the store ended the stream. Errors are transport
    /// failures; the stream is unusable afterwards.
    async fn next(&mut self) -> StoreResult<Option<RawChange>>;

    /// Token for the current position: the last delivered event, or the
    /// subscription point if nothing was delivered yet.
    fn resume_token(&self) -> Option<ResumeToken>;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    async fn count_all(&self) -> StoreResult<u64> {
        (**self).count_all().await
    }

    async fn find_all(&self) -> StoreResult<Box<dyn DocumentCursor>> {
        (**self).find_all().await
    }

    async fn open_change_feed(
        &self,
        resume_after: Option<ResumeToken>,
    ) -> StoreResult<Box<dyn ChangeStream>> {
        (**self).open_change_feed(resume_after).await
    }
}

/// Point lookups by id.
///
/// Implemented both by direct store adapters and by the cache, so callers
/// can switch between them.
#[async_trait]
pub trait RecordReader: Send + Sync {
    /// Error returned by a failed lookup.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads one record.
    async fn read(&self, id: RecordId) -> Result<Record, Self::Error>;
}

/// Bulk writes of whole records.
#[async_trait]
pub trait RecordWriter: Send + Sync {
    /// Error returned by a failed write.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Writes a batch of new records.
    async fn write(&self, records: &[Record]) -> Result<(), Self::Error>;
}
