//! Polling helpers for eventually consistent assertions.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Polling interval used by the helpers in this module.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Polls `condition` until it holds or `timeout` elapses.
///
/// Returns whether the condition was observed to hold.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Like [`wait_until`] but for asynchronous conditions.
pub async fn wait_until_async<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Panics with `what` if `condition` does not hold within `timeout`.
pub async fn assert_eventually<F>(timeout: Duration, what: &str, condition: F)
where
    F: FnMut() -> bool,
{
    assert!(
        wait_until(timeout, condition).await,
        "timed out after {timeout:?} waiting for {what}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn returns_once_condition_holds() {
        let calls = AtomicUsize::new(0);
        let held = wait_until(Duration::from_secs(1), || {
            calls.fetch_add(1, Ordering::Relaxed) >= 3
        })
        .await;
        assert!(held);
        assert_eq!(calls.load(Ordering::Relaxed), 4);
    }

    #[tokio::test]
    async fn gives_up_after_timeout() {
        assert!(!wait_until(Duration::from_millis(20), || false).await);
        assert!(!wait_until_async(Duration::from_millis(20), || async { false }).await);
    }
}
