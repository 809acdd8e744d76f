//! Background task that keeps the cache in step with the change feed.

use crate::cache::Shared;
use crate::config::CacheConfig;
use crate::decode::{report_decode_error, DecodeErrorHandler, DecodeFailure, DecodeSource};
use crate::error::CacheError;
use crate::snapshot::load_snapshot;
use feedcache_codec::{decode_change, OperationType};
use feedcache_store::{ChangeStream, RawChange, RecordStore, ResumeToken, StoreError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// The current state of the feed synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Opening a change-feed subscription.
    Connecting,
    /// Applying events from an open subscription.
    Streaming,
    /// Waiting before the next connection attempt.
    RetryWait,
    /// Reloading a full snapshot after losing the resume position.
    Resyncing,
    /// Stopped for good.
    Cancelled,
}

impl SyncState {
    /// Returns true while events are being applied.
    pub fn is_streaming(&self) -> bool {
        matches!(self, SyncState::Streaming)
    }

    /// Returns true once the synchronizer has stopped.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncState::Cancelled)
    }
}

/// Marker for "the owner asked us to stop".
struct Cancelled;

/// Owns the resume token and drives the state machine.
pub(crate) struct FeedSynchronizer {
    source: Arc<dyn RecordStore>,
    shared: Arc<Shared>,
    handler: Arc<dyn DecodeErrorHandler>,
    config: CacheConfig,
    shutdown: watch::Receiver<bool>,
    resume_token: Option<ResumeToken>,
    /// Consecutive failed subscriptions, counting streams that broke
    /// right after opening.
    failures: u32,
}

impl FeedSynchronizer {
    pub(crate) fn new(
        source: Arc<dyn RecordStore>,
        shared: Arc<Shared>,
        handler: Arc<dyn DecodeErrorHandler>,
        config: CacheConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            shared,
            handler,
            config,
            shutdown,
            resume_token: None,
            failures: 0,
        }
    }

    /// Runs until cancelled.
    ///
    /// `initial` is the subscription opened before the startup snapshot,
    /// if opening it succeeded.
    pub(crate) async fn run(mut self, initial: Option<Box<dyn ChangeStream>>) {
        let mut pending = match initial {
            Some(stream) => {
                self.resume_token = stream.resume_token();
                Some(stream)
            }
            None => {
                self.failures = 1;
                None
            }
        };

        loop {
            let stream = match pending.take() {
                Some(stream) => stream,
                None => match self.connect().await {
                    Ok(stream) => stream,
                    Err(Cancelled) => break,
                },
            };
            if let Err(Cancelled) = self.consume(stream).await {
                break;
            }
        }

        self.shared.health.set(CacheError::Closed);
        self.set_state(SyncState::Cancelled);
        info!("feed synchronizer stopped");
    }

    /// Opens a subscription, retrying with backoff until it succeeds.
    ///
    /// The backoff grows with consecutive failures, including streams that
    /// broke right after opening. A subscription opened without a
    /// resume token is followed by a resync, since events between the last
    /// snapshot and the subscription point would otherwise be missed.
    async fn connect(&mut self) -> Result<Box<dyn ChangeStream>, Cancelled> {
        loop {
            if self.failures > 0 {
                let delay = self.config.retry.delay_for_attempt(self.failures);
                self.set_state(SyncState::RetryWait);
                debug!(
                    attempt = self.failures,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "waiting to reconnect"
                );
                if delay.is_zero() {
                    cancellable(&mut self.shutdown, tokio::task::yield_now()).await?;
                } else {
                    cancellable(&mut self.shutdown, tokio::time::sleep(delay)).await?;
                }
            }

            self.set_state(SyncState::Connecting);
            let resumed = self.resume_token.is_some();
            let opened = cancellable(
                &mut self.shutdown,
                self.source.open_change_feed(self.resume_token.clone()),
            )
            .await?;

            let stream = match opened {
                Ok(stream) => stream,
                Err(e) => {
                    self.record_feed_error(e);
                    continue;
                }
            };
            self.shared.stats.record_subscription(resumed);
            if let Some(token) = stream.resume_token() {
                self.resume_token = Some(token);
            }

            if !resumed {
                if let Err(e) = self.resync().await? {
                    warn!(error = %e, "resync failed");
                    self.failures = self.failures.saturating_add(1);
                    self.shared.health.set(CacheError::Snapshot(e));
                    self.resume_token = None;
                    continue;
                }
            }

            debug!(resumed, "change feed subscribed");
            self.shared.health.clear();
            return Ok(stream);
        }
    }

    /// Reloads the whole collection and swaps it into the cache.
    async fn resync(&mut self) -> Result<Result<(), StoreError>, Cancelled> {
        self.set_state(SyncState::Resyncing);
        let loaded = cancellable(
            &mut self.shutdown,
            load_snapshot(
                self.source.as_ref(),
                self.handler.as_ref(),
                &self.shared.stats,
                None,
            ),
        )
        .await?;

        Ok(loaded.map(|(records, report)| {
            let previous = self.shared.store.replace_all(records);
            self.shared.stats.record_resync();
            info!(
                loaded = report.loaded,
                skipped = report.skipped,
                previous,
                "cache resynced from snapshot"
            );
        }))
    }

    /// Applies events until the stream fails or ends.
    ///
    /// A stream that stayed up for at least the initial retry delay ends
    /// the run of consecutive failures, even if it never delivered an
    /// event, so idle streams closed by the store reconnect quickly.
    async fn consume(&mut self, mut stream: Box<dyn ChangeStream>) -> Result<(), Cancelled> {
        self.set_state(SyncState::Streaming);
        let opened_at = Instant::now();
        let outcome = loop {
            match cancellable(&mut self.shutdown, stream.next()).await? {
                Ok(Some(raw)) => {
                    self.failures = 0;
                    self.apply(raw);
                }
                Ok(None) => break StoreError::FeedClosed,
                Err(e) => break e,
            }
        };

        if opened_at.elapsed() >= self.config.retry.initial_delay {
            self.failures = 0;
        }
        self.record_feed_error(outcome);
        Ok(())
    }

    /// Applies one delivered event and advances the resume token.
    ///
    /// The token advances even when the payload does not decode, so a
    /// poisoned event is skipped instead of redelivered forever.
    fn apply(&mut self, raw: RawChange) {
        match decode_change(&raw.payload) {
            Ok(event) => {
                match event.operation {
                    OperationType::Insert | OperationType::Replace | OperationType::Update => {
                        if let Some(record) = event.full_document {
                            self.shared.store.upsert(record);
                        }
                    }
                    OperationType::Delete => {
                        self.shared.store.remove(event.document_key);
                    }
                }
                self.shared.stats.record_applied(event.operation);
                debug!(operation = %event.operation, id = event.document_key, "change applied");
            }
            Err(error) => report_decode_error(
                self.handler.as_ref(),
                &self.shared.stats,
                DecodeFailure {
                    source: DecodeSource::ChangeFeed {
                        token: raw.token.clone(),
                    },
                    error,
                },
            ),
        }
        self.resume_token = Some(raw.token);
    }

    fn record_feed_error(&mut self, error: StoreError) {
        self.failures = self.failures.saturating_add(1);
        if error.requires_resync() {
            self.resume_token = None;
        }
        warn!(error = %error, "change feed error recorded");
        self.shared.stats.record_feed_error();
        self.shared.health.set(CacheError::Feed(error));
    }

    fn set_state(&self, state: SyncState) {
        *self.shared.state.write() = state;
    }
}

/// Resolves once shutdown has been requested or the cache handle is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Runs `work` unless shutdown is requested first.
async fn cancellable<F: Future>(
    shutdown: &mut watch::Receiver<bool>,
    work: F,
) -> Result<F::Output, Cancelled> {
    tokio::select! {
        biased;
        _ = shutdown_requested(shutdown) => Err(Cancelled),
        output = work => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_checks() {
        assert!(SyncState::Streaming.is_streaming());
        assert!(!SyncState::Connecting.is_streaming());
        assert!(SyncState::Cancelled.is_terminal());
        assert!(!SyncState::RetryWait.is_terminal());
    }

    #[tokio::test]
    async fn cancellable_prefers_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        assert!(cancellable(&mut rx, async { 1 }).await.is_ok());

        tx.send(true).unwrap();
        assert!(cancellable(&mut rx, async { 1 }).await.is_err());
    }

    #[tokio::test]
    async fn dropped_owner_counts_as_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        assert!(cancellable(&mut rx, std::future::pending::<()>()).await.is_err());
    }
}
