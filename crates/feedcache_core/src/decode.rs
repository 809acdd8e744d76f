//! Pluggable handling of records and events that fail to decode.

use crate::stats::SyncStats;
use feedcache_codec::CodecError;
use feedcache_store::ResumeToken;
use tracing::warn;

/// Where an undecodable item came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeSource {
    /// A document returned by a full scan.
    Snapshot,
    /// A change-feed event, identified by the token it was delivered with.
    ChangeFeed {
        /// Token of the undecodable event.
        token: ResumeToken,
    },
}

/// An item that was skipped because it could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    /// Origin of the item.
    pub source: DecodeSource,
    /// Decoder error.
    pub error: CodecError,
}

/// Receives decode failures. The failing item is skipped either way.
///
/// Implemented for any `Fn(&DecodeFailure) + Send + Sync`.
pub trait DecodeErrorHandler: Send + Sync {
    /// Called once per skipped item.
    fn on_decode_error(&self, failure: &DecodeFailure);
}

impl<F> DecodeErrorHandler for F
where
    F: Fn(&DecodeFailure) + Send + Sync,
{
    fn on_decode_error(&self, failure: &DecodeFailure) {
        self(failure)
    }
}

/// Handler that does nothing beyond the cache's own logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreDecodeErrors;

impl DecodeErrorHandler for IgnoreDecodeErrors {
    fn on_decode_error(&self, _failure: &DecodeFailure) {}
}

/// Logs, counts and forwards a decode failure.
pub(crate) fn report_decode_error(
    handler: &dyn DecodeErrorHandler,
    stats: &SyncStats,
    failure: DecodeFailure,
) {
    warn!(source = ?failure.source, error = %failure.error, "skipping undecodable item");
    stats.record_decode_error();
    handler.on_decode_error(&failure);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn closures_are_handlers() {
        let seen = Mutex::new(Vec::new());
        let handler = |f: &DecodeFailure| seen.lock().push(f.source.clone());
        let stats = SyncStats::new();

        report_decode_error(
            &handler,
            &stats,
            DecodeFailure {
                source: DecodeSource::Snapshot,
                error: CodecError::decoding_failed("bad"),
            },
        );

        assert_eq!(seen.lock().as_slice(), &[DecodeSource::Snapshot]);
        assert_eq!(stats.snapshot().decode_errors, 1);
    }
}
