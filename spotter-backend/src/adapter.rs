//! Runs `{data, error}` calls through the retry executor

use crate::response::RemoteResponse;
use spotter_core::NormalizedError;
use spotter_resilience::{CallHandle, CallOptions};
use std::future::Future;

/// Context recorded for remote calls that don't name one
pub const DEFAULT_REMOTE_CONTEXT: &str = "supabase-call";

/// Execute `remote_call` with retries on `handle`.
///
/// A response with `error` set counts as a failed attempt and is retried
/// like any other failure; otherwise the (possibly absent) `data` is the
/// result. The backend's error travels to the classifier unchanged, so its
/// code, status and details end up on the [`NormalizedError`].
pub async fn execute_remote_call<T, F, Fut>(
    handle: &CallHandle<Option<T>>,
    mut remote_call: F,
    options: CallOptions,
) -> Result<Option<T>, NormalizedError>
where
    T: Clone + Send + Sync + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = RemoteResponse<T>>,
{
    let options = if options.context.is_some() {
        options
    } else {
        options.with_context(DEFAULT_REMOTE_CONTEXT)
    };

    handle
        .execute(
            || {
                let response = remote_call();
                async move { response.await.into_result() }
            },
            options,
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotter_core::{ErrorKind, RemoteError};
    use spotter_logging::NoopCallLogger;
    use spotter_resilience::{RetryExecutor, RetryOptions, RetryOverrides};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn handle<T: Clone + Send + Sync + 'static>() -> CallHandle<Option<T>> {
        let options = RetryOptions {
            base_delay: Duration::from_millis(50),
            ..RetryOptions::default()
        };
        CallHandle::new(RetryExecutor::with_logger(
            options,
            Arc::new(NoopCallLogger),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_data_is_returned() {
        let handle = handle::<i32>();

        let result = execute_remote_call(
            &handle,
            || async { RemoteResponse::success(42) },
            CallOptions::default(),
        )
        .await;

        assert_eq!(result.unwrap(), Some(42));
        assert_eq!(handle.state().data, Some(Some(42)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_null_data_is_a_success() {
        let handle = handle::<i32>();

        let result = execute_remote_call(
            &handle,
            || async { RemoteResponse::empty() },
            CallOptions::default(),
        )
        .await;

        assert_eq!(result.unwrap(), None);
        assert!(handle.state().error.is_none());
        assert_eq!(handle.state().total_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_is_retried_then_reported() {
        let handle = handle::<i32>();
        let calls = AtomicU32::new(0);

        let result = execute_remote_call(
            &handle,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { RemoteResponse::failure(RemoteError::new("denied")) }
            },
            CallOptions::default(),
        )
        .await;

        let error = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(error.message.contains("denied"));
        assert_eq!(error.kind, ErrorKind::Generic);
        assert_eq!(error.context, DEFAULT_REMOTE_CONTEXT);

        let state = handle.state();
        assert!(state.error.unwrap_or_default().contains("denied"));
        assert_eq!(state.total_attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_error() {
        let handle = handle::<Vec<String>>();
        let calls = AtomicU32::new(0);

        let result = execute_remote_call(
            &handle,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n == 1 {
                        RemoteResponse::failure(
                            RemoteError::new("Failed to fetch").with_code("FETCH_ERROR"),
                        )
                    } else {
                        RemoteResponse::success(vec!["Ada".to_string()])
                    }
                }
            },
            CallOptions::default()
                .with_context("athletes")
                .with_retry(RetryOverrides::default().max_attempts(2)),
        )
        .await;

        assert_eq!(result.unwrap(), Some(vec!["Ada".to_string()]));
        assert_eq!(handle.state().last_attempt, 2);
    }
}
