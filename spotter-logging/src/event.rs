//! Call log entries and the messages that produce them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use spotter_config::LogLevel;
use spotter_core::{CallId, NormalizedError};
use tokio::sync::oneshot;
use tokio::time::Instant;
use uuid::Uuid;

/// Outcome tag attached to a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Success,
    Error,
    Retry,
}

/// A single line of the call log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub context: String,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EntryStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempt: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

impl LogEntry {
    pub fn new(level: LogLevel, context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level,
            context: context.into(),
            message: message.into(),
            data: None,
            duration_ms: None,
            status: None,
            retry_attempt: None,
            max_retries: None,
        }
    }

    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_status(mut self, status: EntryStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_retry(mut self, attempt: u32, max_retries: u32) -> Self {
        self.retry_attempt = Some(attempt);
        self.max_retries = Some(max_retries);
        self
    }
}

/// Lifecycle status of a tracked call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Pending,
    Success,
    Error,
}

/// Bookkeeping for one backend call from start to settlement
#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    pub id: CallId,
    pub started_at: DateTime<Utc>,
    pub context: String,
    pub retry_attempts: u32,
    pub status: CallStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<NormalizedError>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,

    #[serde(skip)]
    pub(crate) started: Instant,

    #[serde(skip)]
    pub(crate) finished: Option<Instant>,
}

/// Messages sent from callers to the call log.
///
/// Instants are captured by the sender so durations stay accurate when the
/// log worker lags behind.
#[derive(Debug)]
pub enum CallLogMessage {
    Started {
        call_id: CallId,
        context: String,
        at: Instant,
    },
    Retry {
        call_id: CallId,
        attempt: u32,
        max_attempts: u32,
        error: Option<NormalizedError>,
    },
    Succeeded {
        call_id: CallId,
        summary: Option<JsonValue>,
        at: Instant,
    },
    Failed {
        call_id: CallId,
        error: NormalizedError,
        at: Instant,
    },
    Flush(oneshot::Sender<()>),
}
