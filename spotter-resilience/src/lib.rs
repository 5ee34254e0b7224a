//! Resilience patterns for Spotter backend calls
//!
//! This crate provides the per-attempt timeout, the classifier that turns
//! any failure into a [`NormalizedError`](spotter_core::NormalizedError),
//! exponential backoff, and the retry executor with its observable call
//! state.

pub mod backoff;
pub mod classify;
pub mod handle;
pub mod liveness;
pub mod retry;
pub mod state;
pub mod timeout;

// Re-export commonly used types
pub use backoff::{calculate_retry_delay, BackoffCalculator};
pub use classify::{classify, should_retry_error, ClassifyContext};
pub use handle::CallHandle;
pub use liveness::{Liveness, LivenessGuard};
pub use retry::{CallOptions, RetryExecutor, RetryOptions, RetryOverrides, DEFAULT_CONTEXT};
pub use spotter_config::RetryMode;
pub use state::{CallAttemptState, CallEvent, CallObserver, CallPhase, CallState};
pub use timeout::{sleep, with_timeout};
