//! Sleep and per-attempt timeout primitives

use spotter_core::TimeoutError;
use std::future::Future;
use std::time::Duration;

/// Suspend the current task for `duration`. Always completes.
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await
}

/// Race `operation` against a timer of `timeout`.
///
/// If the timer fires first the operation future is dropped and a
/// [`TimeoutError`] is returned; whatever the operation already sent to a
/// remote service may still complete there. A zero timeout fails without
/// polling the operation at all.
pub async fn with_timeout<F, T>(operation: F, timeout: Duration) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    if timeout.is_zero() {
        return Err(TimeoutError { after: timeout });
    }

    tokio::time::timeout(timeout, operation)
        .await
        .map_err(|_| TimeoutError { after: timeout })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_waits_for_duration() {
        let start = Instant::now();
        sleep(Duration::from_millis(750)).await;
        assert_eq!(start.elapsed(), Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_finishing_first_wins() {
        let result = with_timeout(
            async {
                sleep(Duration::from_millis(10)).await;
                42
            },
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_error_passes_through() {
        let result: Result<Result<(), &str>, _> =
            with_timeout(async { Err("denied") }, Duration::from_secs(1)).await;
        assert_eq!(result, Ok(Err("denied")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_settling_operation_times_out() {
        let start = Instant::now();
        let result = with_timeout(std::future::pending::<()>(), Duration::from_millis(300)).await;

        assert_eq!(
            result,
            Err(TimeoutError {
                after: Duration::from_millis(300)
            })
        );
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_zero_timeout_fails_without_polling() {
        let polled = Arc::new(AtomicBool::new(false));
        let flag = polled.clone();

        let result = with_timeout(
            async move {
                flag.store(true, Ordering::SeqCst);
                1
            },
            Duration::ZERO,
        )
        .await;

        assert!(result.is_err());
        assert!(!polled.load(Ordering::SeqCst));
    }
}
