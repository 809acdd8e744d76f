//! Full-scan loading of the record store.

use crate::decode::{report_decode_error, DecodeErrorHandler, DecodeFailure, DecodeSource};
use crate::stats::SyncStats;
use feedcache_codec::{decode_record, Record, RecordId};
use feedcache_store::{RecordStore, StoreResult};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Outcome of one full scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    /// Records decoded and loaded.
    pub loaded: usize,
    /// Documents skipped because they failed to decode.
    pub skipped: usize,
}

/// Scans the whole collection into a fresh map.
///
/// Undecodable documents are reported and skipped. A cursor failure aborts
/// the scan. `capacity` overrides the count query used to size the map.
pub(crate) async fn load_snapshot(
    source: &dyn RecordStore,
    handler: &dyn DecodeErrorHandler,
    stats: &SyncStats,
    capacity: Option<usize>,
) -> StoreResult<(HashMap<RecordId, Record>, SnapshotReport)> {
    let capacity = match capacity {
        Some(capacity) => capacity,
        None => match source.count_all().await {
            Ok(count) => usize::try_from(count).unwrap_or(0),
            Err(e) => {
                warn!(error = %e, "record count unavailable, sizing cache lazily");
                0
            }
        },
    };

    let mut records = HashMap::with_capacity(capacity);
    let mut report = SnapshotReport::default();
    let mut cursor = source.find_all().await?;

    while let Some(document) = cursor.next().await? {
        match decode_record(&document.bytes) {
            Ok(record) => {
                records.insert(record.id, record);
                report.loaded += 1;
            }
            Err(error) => {
                report_decode_error(
                    handler,
                    stats,
                    DecodeFailure {
                        source: DecodeSource::Snapshot,
                        error,
                    },
                );
                report.skipped += 1;
            }
        }
    }

    stats.record_snapshot(report.loaded as u64);
    debug!(loaded = report.loaded, skipped = report.skipped, "snapshot scan complete");
    Ok((records, report))
}
