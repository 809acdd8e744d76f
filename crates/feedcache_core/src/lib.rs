//! # feedcache Core
//!
//! A read cache that mirrors a record collection in memory and heals
//! itself from the collection's change feed.
//!
//! [`FeedCache::open`] subscribes to the change feed, scans the whole
//! collection into memory and spawns a synchronizer task that applies
//! every subsequent insert, replace, update and delete. If the feed drops,
//! the synchronizer reconnects with backoff, resuming from the last token
//! it processed. When the resume position is lost it reloads a full
//! snapshot instead.
//!
//! Reads are served purely from memory. While the synchronizer has an
//! unrecovered failure, reads return that failure so callers never see
//! silently stale data.
//!
//! ```rust,ignore
//! use feedcache_core::{CacheConfig, FeedCache};
//! use feedcache_store::MemoryRecordStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryRecordStore::new());
//! let cache = FeedCache::open(store, CacheConfig::new("users")).await?;
//! let record = cache.read(42)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod decode;
mod error;
mod health;
mod snapshot;
mod stats;
mod store;
mod sync;

pub use cache::FeedCache;
pub use config::{CacheConfig, RetryConfig};
pub use decode::{DecodeErrorHandler, DecodeFailure, DecodeSource, IgnoreDecodeErrors};
pub use error::{CacheError, CacheResult};
pub use health::HealthState;
pub use snapshot::SnapshotReport;
pub use stats::{SyncStats, SyncStatsSnapshot};
pub use store::CacheStore;
pub use sync::SyncState;

pub use feedcache_codec::{Category, Record, RecordId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
