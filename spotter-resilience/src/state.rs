//! Observable call state
//!
//! [`CallState`] is what a consumer renders: the last result, whether a call
//! is in flight, the error text to show and attempt counters. The executor
//! reports progress through [`CallObserver`]; [`CallHandle`](crate::CallHandle)
//! folds those events into a `CallState`.

use serde::Serialize;
use spotter_core::NormalizedError;
use std::time::Duration;

/// Where a single `execute` invocation currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum CallPhase {
    #[default]
    Idle,
    Attempting { attempt: u32 },
    RetryWait {
        attempt: u32,
        #[serde(with = "humantime_serde")]
        delay: Duration,
    },
    Success,
    FinalFailure,
}

impl CallPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallPhase::Success | CallPhase::FinalFailure)
    }
}

/// Consumer-visible state of a call handle
#[derive(Debug, Clone, Serialize)]
pub struct CallState<T> {
    pub data: Option<T>,
    pub loading: bool,
    /// Final error message, or the transient "retrying" notice between attempts
    pub error: Option<String>,
    pub last_attempt: u32,
    pub total_attempts: u32,
    pub phase: CallPhase,
    /// Classified error behind `error`, kept for callers that need the kind
    #[serde(skip)]
    pub last_error: Option<NormalizedError>,
}

// Manual impl so `T` doesn't need `Default`
impl<T> Default for CallState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            last_attempt: 0,
            total_attempts: 0,
            phase: CallPhase::Idle,
            last_error: None,
        }
    }
}

impl<T> CallState<T> {
    /// A call is in flight and has already made at least one attempt
    pub fn is_retrying(&self) -> bool {
        self.loading && self.last_attempt > 0
    }
}

/// Per-attempt bookkeeping passed to observers
#[derive(Debug, Clone)]
pub struct CallAttemptState {
    pub attempt_number: u32,
    pub max_attempts: u32,
    pub last_error: Option<NormalizedError>,
    /// Sum of backoff delays slept so far
    pub elapsed_delay: Duration,
}

impl CallAttemptState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt_number: 0,
            max_attempts,
            last_error: None,
            elapsed_delay: Duration::ZERO,
        }
    }

    pub fn is_final(&self) -> bool {
        self.attempt_number >= self.max_attempts
    }
}

/// Progress reported by the executor
#[derive(Debug)]
pub enum CallEvent<'a, T> {
    Started,
    Attempting(&'a CallAttemptState),
    RetryWait {
        attempt: &'a CallAttemptState,
        delay: Duration,
        message: String,
    },
    Succeeded(&'a T),
    Failed(&'a NormalizedError),
}

/// Receiver of executor progress
pub trait CallObserver<T>: Send + Sync {
    fn observe(&self, event: CallEvent<'_, T>);
}

impl<T> CallObserver<T> for () {
    fn observe(&self, _event: CallEvent<'_, T>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle() {
        let state: CallState<String> = CallState::default();
        assert!(state.data.is_none());
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(state.last_attempt, 0);
        assert_eq!(state.total_attempts, 0);
        assert_eq!(state.phase, CallPhase::Idle);
    }

    #[test]
    fn test_is_retrying() {
        let mut state: CallState<u32> = CallState::default();
        state.loading = true;
        assert!(!state.is_retrying());

        state.last_attempt = 2;
        assert!(state.is_retrying());

        state.loading = false;
        assert!(!state.is_retrying());
    }

    #[test]
    fn test_attempt_state_is_final_on_last_attempt() {
        let mut attempt = CallAttemptState::new(3);
        assert!(!attempt.is_final());

        attempt.attempt_number = 2;
        assert!(!attempt.is_final());

        attempt.attempt_number = 3;
        assert!(attempt.is_final());
    }

    #[test]
    fn test_phase_serialization() {
        let phase = CallPhase::RetryWait {
            attempt: 1,
            delay: Duration::from_millis(1500),
        };
        let json = serde_json::to_value(phase).unwrap();
        assert_eq!(json["phase"], "retry_wait");
        assert_eq!(json["attempt"], 1);
        assert_eq!(json["delay"], "1s 500ms");

        assert!(CallPhase::Success.is_terminal());
        assert!(!CallPhase::Attempting { attempt: 1 }.is_terminal());
    }
}
