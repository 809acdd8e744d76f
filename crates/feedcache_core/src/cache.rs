//! The public cache handle.

use crate::config::CacheConfig;
use crate::decode::{DecodeErrorHandler, IgnoreDecodeErrors};
use crate::error::{CacheError, CacheResult};
use crate::health::HealthState;
use crate::snapshot::{load_snapshot, SnapshotReport};
use crate::stats::{SyncStats, SyncStatsSnapshot};
use crate::store::CacheStore;
use crate::sync::{FeedSynchronizer, SyncState};
use async_trait::async_trait;
use feedcache_codec::{Record, RecordId};
use feedcache_store::{RecordReader, RecordStore};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

/// State shared between the cache handle and its synchronizer task.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) store: CacheStore,
    pub(crate) health: HealthState,
    pub(crate) stats: SyncStats,
    pub(crate) state: RwLock<SyncState>,
}

/// An in-memory copy of a record collection.
///
/// `open` loads a full snapshot and then keeps the copy current by
/// following the store's change feed on a background task. Reads never
/// touch the store. While the synchronizer is disconnected, or after an
/// unrecovered failure, reads return the recorded failure instead of
/// possibly stale data.
///
/// Must be opened inside a tokio runtime. Dropping the handle stops the
/// background task.
#[derive(Debug)]
pub struct FeedCache {
    name: String,
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    snapshot: SnapshotReport,
}

impl FeedCache {
    /// Opens a cache over `source`, skipping undecodable items silently
    /// apart from logging.
    pub async fn open<S>(source: Arc<S>, config: CacheConfig) -> CacheResult<Self>
    where
        S: RecordStore + 'static,
    {
        Self::open_with_handler(source, config, IgnoreDecodeErrors).await
    }

    /// Opens a cache over `source`, forwarding decode failures to `handler`.
    ///
    /// The change feed is subscribed before the snapshot scan so that no
    /// write between the two is lost. If that subscription fails the cache
    /// still opens, reporting the failure through [`FeedCache::healthcheck`]
    /// until the synchronizer reconnects and resyncs.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Snapshot`] if the snapshot scan fails.
    pub async fn open_with_handler<S, H>(
        source: Arc<S>,
        config: CacheConfig,
        handler: H,
    ) -> CacheResult<Self>
    where
        S: RecordStore + 'static,
        H: DecodeErrorHandler + 'static,
    {
        let source: Arc<dyn RecordStore> = source;
        let handler: Arc<dyn DecodeErrorHandler> = Arc::new(handler);
        let stats = SyncStats::new();

        let initial = match source.open_change_feed(None).await {
            Ok(stream) => {
                stats.record_subscription(false);
                Ok(stream)
            }
            Err(e) => {
                warn!(cache = %config.name, error = %e, "initial change feed subscription failed");
                stats.record_feed_error();
                Err(e)
            }
        };

        let (records, report) = load_snapshot(
            source.as_ref(),
            handler.as_ref(),
            &stats,
            config.initial_capacity,
        )
        .await
        .map_err(CacheError::Snapshot)?;

        let health = HealthState::new();
        let initial = match initial {
            Ok(stream) => Some(stream),
            Err(e) => {
                health.set(CacheError::Feed(e));
                None
            }
        };

        let shared = Arc::new(Shared {
            store: CacheStore::from_map(records),
            health,
            stats,
            state: RwLock::new(if initial.is_some() {
                SyncState::Streaming
            } else {
                SyncState::Connecting
            }),
        });

        info!(
            cache = %config.name,
            loaded = report.loaded,
            skipped = report.skipped,
            "cache opened"
        );

        let (shutdown, shutdown_rx) = watch::channel(false);
        let name = config.name.clone();
        let span = info_span!("feed_sync", cache = %name);
        let synchronizer =
            FeedSynchronizer::new(source, Arc::clone(&shared), handler, config, shutdown_rx);
        let task = tokio::spawn(synchronizer.run(initial).instrument(span));

        Ok(Self {
            name,
            shared,
            shutdown,
            task: Mutex::new(Some(task)),
            snapshot: report,
        })
    }

    /// Returns the cached record with the given id.
    ///
    /// # Errors
    ///
    /// Returns the recorded health failure if there is one, otherwise
    /// [`CacheError::NotFound`] if the id is not cached.
    pub fn read(&self, id: RecordId) -> CacheResult<Record> {
        self.shared.health.check()?;
        self.shared.store.get(id).ok_or(CacheError::NotFound(id))
    }

    /// Returns the recorded failure, or `Ok` if the cache is in sync.
    pub fn healthcheck(&self) -> CacheResult<()> {
        self.shared.health.check()
    }

    /// Stops the synchronizer. Idempotent.
    ///
    /// Subsequent reads and health checks return [`CacheError::Closed`].
    /// The background task finishes asynchronously; use
    /// [`FeedCache::shutdown`] to wait for it.
    pub fn close(&self) {
        let already_closed = self.shutdown.send_replace(true);
        self.shared.health.set(CacheError::Closed);
        if !already_closed {
            info!(cache = %self.name, "cache closed");
        }
    }

    /// Stops the synchronizer and waits for its task to finish.
    pub async fn shutdown(&self) {
        self.close();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(cache = %self.name, error = %e, "synchronizer task failed");
            }
        }
    }

    /// Name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current synchronizer state.
    pub fn state(&self) -> SyncState {
        *self.shared.state.read()
    }

    /// Synchronizer counters.
    pub fn stats(&self) -> SyncStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Outcome of the snapshot taken at open.
    pub fn initial_snapshot(&self) -> SnapshotReport {
        self.snapshot
    }

    /// Number of cached records, regardless of health.
    pub fn len(&self) -> usize {
        self.shared.store.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.shared.store.is_empty()
    }
}

impl Drop for FeedCache {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
impl RecordReader for FeedCache {
    type Error = CacheError;

    async fn read(&self, id: RecordId) -> CacheResult<Record> {
        FeedCache::read(self, id)
    }
}
