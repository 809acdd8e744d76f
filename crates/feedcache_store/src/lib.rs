//! # feedcache Store
//!
//! Record store client interface for feedcache.
//!
//! This crate provides:
//! - The [`RecordStore`] trait the cache consumes: count, full scan and a
//!   resumable change feed
//! - [`ResumeToken`], the opaque progress marker of a change stream
//! - [`RecordReader`] / [`RecordWriter`], the pass-through point read and
//!   bulk write seams
//! - [`MemoryRecordStore`], an in-memory reference store with a bounded
//!   change log and fault injection
//!
//! ## Change feed contract
//!
//! - Events are delivered in commit order
//! - Every delivered event carries a token; resuming with it yields the
//!   next event, never a replay and never a gap
//! - A token whose history was trimmed fails with
//!   [`StoreError::HistoryLost`]

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod token;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryRecordStore, DEFAULT_HISTORY_LIMIT};
pub use token::ResumeToken;
pub use traits::{
    ChangeStream, DocumentCursor, RawChange, RawDocument, RecordReader, RecordStore, RecordWriter,
};
