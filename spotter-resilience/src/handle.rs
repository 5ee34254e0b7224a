//! Call handle with observable state
//!
//! A [`CallHandle`] is what a consumer keeps for one kind of backend call.
//! It owns the watch channel that carries [`CallState`] and the liveness
//! token that gates writes to it.

use spotter_core::NormalizedError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

use crate::liveness::Liveness;
use crate::retry::{CallOptions, RetryExecutor, DEFAULT_CONTEXT};
use crate::state::{CallEvent, CallObserver, CallPhase, CallState};

pub struct CallHandle<T> {
    executor: RetryExecutor,
    state: Arc<watch::Sender<CallState<T>>>,
    liveness: Liveness,
}

impl<T> Clone for CallHandle<T> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            state: self.state.clone(),
            liveness: self.liveness.clone(),
        }
    }
}

impl<T> Default for CallHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(RetryExecutor::default())
    }
}

impl<T> CallHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(executor: RetryExecutor) -> Self {
        Self::with_liveness(executor, Liveness::new())
    }

    pub fn with_liveness(executor: RetryExecutor, liveness: Liveness) -> Self {
        let (state, _) = watch::channel(CallState::default());
        Self {
            executor,
            state: Arc::new(state),
            liveness,
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> CallState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CallState<T>> {
        self.state.subscribe()
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    pub fn is_retrying(&self) -> bool {
        self.state.borrow().is_retrying()
    }

    /// Run `operation` with retries, folding progress into this handle's state
    pub async fn execute<F, Fut, E>(
        &self,
        operation: F,
        options: CallOptions,
    ) -> Result<T, NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        let executor = self.executor.with_overrides(&options.retry);
        let writer = StateWriter { state: &self.state };

        executor
            .execute_observed(
                options.context_or(DEFAULT_CONTEXT),
                operation,
                &writer,
                &self.liveness,
            )
            .await
    }

    /// Restore the initial state. No-op once liveness is released.
    pub fn reset(&self) {
        if self.liveness.is_alive() {
            self.state.send_replace(CallState::default());
        }
    }
}

struct StateWriter<'a, T> {
    state: &'a watch::Sender<CallState<T>>,
}

impl<T> CallObserver<T> for StateWriter<'_, T>
where
    T: Clone + Send + Sync,
{
    fn observe(&self, event: CallEvent<'_, T>) {
        self.state.send_modify(|state| match event {
            CallEvent::Started => {
                state.loading = true;
                state.error = None;
                state.last_error = None;
                state.last_attempt = 0;
                state.total_attempts = 0;
                state.phase = CallPhase::Idle;
            }
            CallEvent::Attempting(attempt) => {
                state.last_attempt = attempt.attempt_number;
                state.total_attempts = attempt.attempt_number;
                state.phase = CallPhase::Attempting {
                    attempt: attempt.attempt_number,
                };
            }
            CallEvent::RetryWait {
                attempt,
                delay,
                message,
            } => {
                state.error = Some(message);
                state.last_error = attempt.last_error.clone();
                state.phase = CallPhase::RetryWait {
                    attempt: attempt.attempt_number,
                    delay,
                };
            }
            CallEvent::Succeeded(value) => {
                state.data = Some(value.clone());
                state.loading = false;
                state.error = None;
                state.last_error = None;
                state.phase = CallPhase::Success;
            }
            CallEvent::Failed(error) => {
                state.loading = false;
                state.error = Some(error.message.clone());
                state.last_error = Some(error.clone());
                state.phase = CallPhase::FinalFailure;
            }
        });
    }
}
