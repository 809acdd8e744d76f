//! Synchronizer counters.
//!
//! All counters are atomic and can be read while the synchronizer runs.
//! Values only increase.

use feedcache_codec::OperationType;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by the snapshot loader and feed synchronizer.
#[derive(Debug, Default)]
pub struct SyncStats {
    /// Records loaded by the initial snapshot and resyncs.
    snapshot_records: AtomicU64,
    /// Change events applied to the cache.
    events_applied: AtomicU64,
    /// Insert, replace and update events applied.
    upserts: AtomicU64,
    /// Delete events applied.
    deletes: AtomicU64,
    /// Documents and events skipped as undecodable.
    decode_errors: AtomicU64,
    /// Transport failures recorded into health.
    feed_errors: AtomicU64,
    /// Subscriptions opened with a resume token.
    resumes: AtomicU64,
    /// Subscriptions opened from the current position.
    fresh_subscriptions: AtomicU64,
    /// Snapshots reloaded after startup.
    resyncs: AtomicU64,
}

impl SyncStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_snapshot(&self, records: u64) {
        self.snapshot_records.fetch_add(records, Ordering::Relaxed);
    }

    pub(crate) fn record_applied(&self, operation: OperationType) {
        self.events_applied.fetch_add(1, Ordering::Relaxed);
        if operation.is_upsert() {
            self.upserts.fetch_add(1, Ordering::Relaxed);
        } else {
            self.deletes.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_feed_error(&self) {
        self.feed_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_subscription(&self, resumed: bool) {
        if resumed {
            self.resumes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.fresh_subscriptions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_resync(&self) {
        self.resyncs.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            snapshot_records: self.snapshot_records.load(Ordering::Relaxed),
            events_applied: self.events_applied.load(Ordering::Relaxed),
            upserts: self.upserts.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            feed_errors: self.feed_errors.load(Ordering::Relaxed),
            resumes: self.resumes.load(Ordering::Relaxed),
            fresh_subscriptions: self.fresh_subscriptions.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`SyncStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatsSnapshot {
    /// Records loaded by the initial snapshot and resyncs.
    pub snapshot_records: u64,
    /// Change events applied to the cache.
    pub events_applied: u64,
    /// Insert, replace and update events applied.
    pub upserts: u64,
    /// Delete events applied.
    pub deletes: u64,
    /// Documents and events skipped as undecodable.
    pub decode_errors: u64,
    /// Transport failures recorded into health.
    pub feed_errors: u64,
    /// Subscriptions opened with a resume token.
    pub resumes: u64,
    /// Subscriptions opened from the current position.
    pub fresh_subscriptions: u64,
    /// Snapshots reloaded after startup.
    pub resyncs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = SyncStats::new();
        stats.record_applied(OperationType::Insert);
        stats.record_applied(OperationType::Update);
        stats.record_applied(OperationType::Delete);
        stats.record_subscription(true);
        stats.record_subscription(false);
        stats.record_snapshot(10);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.events_applied, 3);
        assert_eq!(snapshot.upserts, 2);
        assert_eq!(snapshot.deletes, 1);
        assert_eq!(snapshot.resumes, 1);
        assert_eq!(snapshot.fresh_subscriptions, 1);
        assert_eq!(snapshot.snapshot_records, 10);
    }
}
