//! The call-logging collaborator

use serde_json::Value as JsonValue;
use spotter_core::{CallId, NormalizedError};
use tracing::{error, info, warn};

/// Fire-and-forget sink for backend call lifecycle events.
///
/// Implementations must not block and must not fail; the retry executor
/// never reads anything back except the returned [`CallId`].
pub trait CallLogger: Send + Sync {
    /// Record the start of a call and hand out its identifier
    fn log_call_start(&self, context: &str) -> CallId;

    /// Record that attempt `attempt` of `max_attempts` is about to run
    /// after `error` ended the previous one
    fn log_retry(
        &self,
        call_id: CallId,
        attempt: u32,
        max_attempts: u32,
        error: Option<&NormalizedError>,
    );

    /// Record a successful settlement
    fn log_success(&self, call_id: CallId, summary: Option<JsonValue>);

    /// Record the final failure of a call
    fn log_failure(&self, call_id: CallId, error: &NormalizedError);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallLogger;

impl CallLogger for NoopCallLogger {
    fn log_call_start(&self, _context: &str) -> CallId {
        CallId::new()
    }

    fn log_retry(&self, _: CallId, _: u32, _: u32, _: Option<&NormalizedError>) {}

    fn log_success(&self, _: CallId, _: Option<JsonValue>) {}

    fn log_failure(&self, _: CallId, _: &NormalizedError) {}
}

/// Writes call events straight to `tracing` without keeping state
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingCallLogger;

impl CallLogger for TracingCallLogger {
    fn log_call_start(&self, context: &str) -> CallId {
        let call_id = CallId::new();
        info!(%call_id, context, "Starting backend call");
        call_id
    }

    fn log_retry(
        &self,
        call_id: CallId,
        attempt: u32,
        max_attempts: u32,
        error: Option<&NormalizedError>,
    ) {
        let reason = error.map(|e| e.message.as_str()).unwrap_or("unknown");
        warn!(%call_id, attempt, max_attempts, reason, "Retrying backend call");
    }

    fn log_success(&self, call_id: CallId, _summary: Option<JsonValue>) {
        info!(%call_id, "Backend call succeeded");
    }

    fn log_failure(&self, call_id: CallId, error: &NormalizedError) {
        error!(%call_id, kind = %error.kind, message = %error.message, "Backend call failed");
    }
}
