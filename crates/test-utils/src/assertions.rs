//! Test assertion helpers.
//!
//! Provides polling-based assertions for async test scenarios.

use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Default polling interval for [`assert_eventually`].
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls a condition until it returns true or the timeout expires.
///
/// Use this instead of a fixed sleep when waiting for the dispatcher or a
/// spawned selection to reach some observable state.
///
/// # Returns
///
/// `true` if the condition became true before timeout, `false` otherwise.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::time::Duration;
/// use tessera_test_utils::assert_eventually;
///
/// #[tokio::test]
/// async fn test_request_is_queued() {
///     let queued = Arc::new(AtomicUsize::new(0));
///     let counter = queued.clone();
///     tokio::spawn(async move {
///         counter.fetch_add(1, Ordering::SeqCst);
///     });
///
///     let seen = assert_eventually(Duration::from_secs(1), || {
///         queued.load(Ordering::SeqCst) == 1
///     })
///     .await;
///     assert!(seen, "request should be queued");
/// }
/// ```
pub async fn assert_eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        sleep(DEFAULT_POLL_INTERVAL).await;
    }

    condition()
}
