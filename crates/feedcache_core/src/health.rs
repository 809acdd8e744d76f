//! Last-error health state shared by the synchronizer and readers.

use crate::error::{CacheError, CacheResult};
use parking_lot::RwLock;

/// The most recent failure observed by the snapshot loader or the feed
/// synchronizer, or none while the cache is in sync.
///
/// Values are overwritten, never accumulated. [`CacheError::Closed`] is
/// terminal: once recorded it is never replaced or cleared.
#[derive(Debug, Default)]
pub struct HealthState {
    last_error: RwLock<Option<CacheError>>,
}

impl HealthState {
    /// Creates a healthy state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded failure, if any.
    pub fn get(&self) -> Option<CacheError> {
        self.last_error.read().clone()
    }

    /// Returns the recorded failure as an error.
    pub fn check(&self) -> CacheResult<()> {
        match &*self.last_error.read() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Returns true if no failure is recorded.
    pub fn is_healthy(&self) -> bool {
        self.last_error.read().is_none()
    }

    /// Records a failure.
    pub fn set(&self, error: CacheError) {
        let mut last = self.last_error.write();
        if !matches!(*last, Some(CacheError::Closed)) {
            *last = Some(error);
        }
    }

    /// Marks the cache as in sync.
    pub fn clear(&self) {
        let mut last = self.last_error.write();
        if !matches!(*last, Some(CacheError::Closed)) {
            *last = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedcache_store::StoreError;

    #[test]
    fn latest_error_wins() {
        let health = HealthState::new();
        assert!(health.check().is_ok());

        health.set(CacheError::Feed(StoreError::FeedClosed));
        health.set(CacheError::Feed(StoreError::HistoryLost));
        assert_eq!(health.get(), Some(CacheError::Feed(StoreError::HistoryLost)));

        health.clear();
        assert!(health.is_healthy());
    }

    #[test]
    fn closed_is_terminal() {
        let health = HealthState::new();
        health.set(CacheError::Closed);
        health.clear();
        health.set(CacheError::Feed(StoreError::FeedClosed));
        assert_eq!(health.check(), Err(CacheError::Closed));
    }
}
