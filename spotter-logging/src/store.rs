//! Bounded in-memory call log

use crate::event::{CallLogMessage, CallRecord, CallStatus, EntryStatus, LogEntry};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use spotter_config::{CallLogConfig, LogLevel};
use spotter_core::{CallId, NormalizedError};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

/// Errors newer than this many seconds count as recent in [`CallLogStats`]
const RECENT_ERROR_WINDOW_SECS: i64 = 300;

/// Maximum number of recent errors reported in [`CallLogStats`]
const RECENT_ERROR_LIMIT: usize = 10;

/// A call still pending after this many retention windows is presumed abandoned
const PENDING_RETENTION_FACTOR: u32 = 10;

/// Summary of the call log contents
#[derive(Debug, Clone, Serialize)]
pub struct CallLogStats {
    pub total_logs: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub active_calls: usize,
    pub recent_errors: Vec<LogEntry>,
}

/// Call log keeping the newest `max_entries` entries and at most
/// `max_entries` calls.
///
/// Finished calls are kept for the retention window. Pending calls are kept
/// for [`PENDING_RETENTION_FACTOR`] windows, since a caller that was dropped
/// mid-call never settles its record.
#[derive(Debug)]
pub struct CallLogStore {
    entries: VecDeque<LogEntry>,
    calls: HashMap<CallId, CallRecord>,
    max_entries: usize,
    retention: Duration,
}

impl CallLogStore {
    pub fn new(max_entries: usize, retention: Duration) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(1024)),
            calls: HashMap::new(),
            max_entries: max_entries.max(1),
            retention,
        }
    }

    pub fn from_config(config: &CallLogConfig) -> Self {
        Self::new(config.max_entries, config.retention)
    }

    /// Apply one message from a caller
    pub fn apply(&mut self, message: CallLogMessage) {
        match message {
            CallLogMessage::Started {
                call_id,
                context,
                at,
            } => self.start_call(call_id, context, at),
            CallLogMessage::Retry {
                call_id,
                attempt,
                max_attempts,
                error,
            } => self.record_retry(call_id, attempt, max_attempts, error.as_ref()),
            CallLogMessage::Succeeded {
                call_id,
                summary,
                at,
            } => self.record_success(call_id, summary, at),
            CallLogMessage::Failed { call_id, error, at } => {
                self.record_failure(call_id, error, at)
            }
            CallLogMessage::Flush(reply) => {
                let _ = reply.send(());
            }
        }
        self.prune_expired(Instant::now());
    }

    pub fn start_call(&mut self, call_id: CallId, context: String, at: Instant) {
        self.calls.insert(
            call_id,
            CallRecord {
                id: call_id,
                started_at: Utc::now(),
                context: context.clone(),
                retry_attempts: 0,
                status: CallStatus::Pending,
                error: None,
                duration_ms: None,
                data: None,
                started: at,
                finished: None,
            },
        );

        self.evict_excess_calls();

        self.push(
            LogEntry::new(LogLevel::Info, context, "Starting backend call")
                .with_data(json!({ "call_id": call_id }))
                .with_status(EntryStatus::Success),
        );
    }

    pub fn record_retry(
        &mut self,
        call_id: CallId,
        attempt: u32,
        max_attempts: u32,
        error: Option<&NormalizedError>,
    ) {
        let Some(call) = self.calls.get_mut(&call_id) else {
            return;
        };
        call.retry_attempts = attempt;
        let context = call.context.clone();

        self.push(
            LogEntry::new(
                LogLevel::Warn,
                context,
                format!(
                    "Attempt {}/{} failed, retrying",
                    attempt.saturating_sub(1),
                    max_attempts
                ),
            )
            .with_data(json!({
                "call_id": call_id,
                "attempt": attempt,
                "max_attempts": max_attempts,
                "error": error,
            }))
            .with_status(EntryStatus::Retry)
            .with_retry(attempt, max_attempts),
        );
    }

    pub fn record_success(&mut self, call_id: CallId, summary: Option<JsonValue>, at: Instant) {
        let Some(call) = self.calls.get_mut(&call_id) else {
            return;
        };
        let duration_ms = at.saturating_duration_since(call.started).as_millis() as u64;
        call.status = CallStatus::Success;
        call.duration_ms = Some(duration_ms);
        call.data = summary.clone();
        call.finished = Some(at);
        let context = call.context.clone();

        self.push(
            LogEntry::new(
                LogLevel::Info,
                context,
                format!("Backend call succeeded in {}ms", duration_ms),
            )
            .with_data(json!({
                "call_id": call_id,
                "duration_ms": duration_ms,
                "data": summary,
            }))
            .with_duration_ms(duration_ms)
            .with_status(EntryStatus::Success),
        );
    }

    pub fn record_failure(&mut self, call_id: CallId, error: NormalizedError, at: Instant) {
        let Some(call) = self.calls.get_mut(&call_id) else {
            return;
        };
        let duration_ms = at.saturating_duration_since(call.started).as_millis() as u64;
        call.status = CallStatus::Error;
        call.duration_ms = Some(duration_ms);
        call.finished = Some(at);
        let context = call.context.clone();
        let data = json!({
            "call_id": call_id,
            "duration_ms": duration_ms,
            "error": &error,
        });
        call.error = Some(error);

        self.push(
            LogEntry::new(
                LogLevel::Error,
                context,
                format!("Backend call failed after {}ms", duration_ms),
            )
            .with_data(data)
            .with_duration_ms(duration_ms)
            .with_status(EntryStatus::Error),
        );
    }

    /// Record a free-form entry not tied to a call
    pub fn log(
        &mut self,
        level: LogLevel,
        context: impl Into<String>,
        message: impl Into<String>,
        data: Option<JsonValue>,
    ) {
        let mut entry = LogEntry::new(level, context, message);
        entry.data = data;
        self.push(entry);
    }

    /// Drop finished calls older than the retention window and pending calls
    /// presumed abandoned
    pub fn prune_expired(&mut self, now: Instant) {
        let retention = self.retention;
        let pending_retention = retention.saturating_mul(PENDING_RETENTION_FACTOR);
        self.calls.retain(|_, call| match call.finished {
            Some(finished) => now.saturating_duration_since(finished) < retention,
            None => now.saturating_duration_since(call.started) < pending_retention,
        });
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Number of calls currently tracked, pending or finished
    pub fn tracked_calls(&self) -> usize {
        self.calls.len()
    }

    /// The newest `limit` entries, oldest first; all entries when `limit` is `None`
    pub fn logs(&self, limit: Option<usize>) -> Vec<LogEntry> {
        let skip = limit
            .map(|limit| self.entries.len().saturating_sub(limit))
            .unwrap_or(0);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Entries of one level, newest `limit` of them
    pub fn logs_by_level(&self, level: LogLevel, limit: Option<usize>) -> Vec<LogEntry> {
        let filtered: Vec<LogEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.level == level)
            .cloned()
            .collect();
        match limit {
            Some(limit) => filtered[filtered.len().saturating_sub(limit)..].to_vec(),
            None => filtered,
        }
    }

    /// Calls that have started but not settled
    pub fn active_calls(&self) -> Vec<CallRecord> {
        self.calls
            .values()
            .filter(|call| call.status == CallStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn call(&self, call_id: &CallId) -> Option<&CallRecord> {
        self.calls.get(call_id)
    }

    pub fn stats(&self) -> CallLogStats {
        let now = Utc::now();
        let window = chrono::Duration::seconds(RECENT_ERROR_WINDOW_SECS);

        let errors: Vec<&LogEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.level == LogLevel::Error)
            .collect();
        let recent: Vec<LogEntry> = errors
            .iter()
            .filter(|entry| now - entry.timestamp < window)
            .map(|entry| (*entry).clone())
            .collect();

        CallLogStats {
            total_logs: self.entries.len(),
            error_count: errors.len(),
            warning_count: self
                .entries
                .iter()
                .filter(|entry| entry.level == LogLevel::Warn)
                .count(),
            active_calls: self
                .calls
                .values()
                .filter(|call| call.status == CallStatus::Pending)
                .count(),
            recent_errors: recent[recent.len().saturating_sub(RECENT_ERROR_LIMIT)..].to_vec(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.calls.clear();
    }

    /// Pretty-printed JSON dump of entries, tracked calls and stats
    pub fn export_json(&self) -> serde_json::Result<String> {
        let calls: Vec<&CallRecord> = self.calls.values().collect();
        serde_json::to_string_pretty(&json!({
            "timestamp": Utc::now(),
            "logs": &self.entries,
            "calls": calls,
            "stats": self.stats(),
        }))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict finished calls first, oldest settlement first, then the oldest
    /// pending calls
    fn evict_excess_calls(&mut self) {
        while self.calls.len() > self.max_entries {
            let victim = self
                .calls
                .values()
                .filter_map(|call| call.finished.map(|finished| (finished, call.id)))
                .min_by_key(|(finished, _)| *finished)
                .or_else(|| {
                    self.calls
                        .values()
                        .map(|call| (call.started, call.id))
                        .min_by_key(|(started, _)| *started)
                })
                .map(|(_, id)| id);

            match victim {
                Some(id) => {
                    self.calls.remove(&id);
                }
                None => break,
            }
        }
    }

    fn push(&mut self, entry: LogEntry) {
        emit(&entry);
        self.entries.push_back(entry);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }
}

impl Default for CallLogStore {
    fn default() -> Self {
        Self::from_config(&CallLogConfig::default())
    }
}

fn emit(entry: &LogEntry) {
    let context = entry.context.as_str();
    let message = entry.message.as_str();
    match entry.level {
        LogLevel::Error => tracing::error!(target: "spotter::calls", context, "{}", message),
        LogLevel::Warn => tracing::warn!(target: "spotter::calls", context, "{}", message),
        LogLevel::Info => tracing::info!(target: "spotter::calls", context, "{}", message),
        LogLevel::Debug => tracing::debug!(target: "spotter::calls", context, "{}", message),
        LogLevel::Trace => tracing::trace!(target: "spotter::calls", context, "{}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotter_core::ErrorKind;

    fn failure(message: &str) -> NormalizedError {
        NormalizedError::new(ErrorKind::Generic, message, "athletes")
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_lifecycle_success() {
        let mut store = CallLogStore::new(100, Duration::from_secs(60));
        let call_id = CallId::new();
        let start = Instant::now();

        store.start_call(call_id, "athletes".to_string(), start);
        assert_eq!(store.active_calls().len(), 1);

        store.record_retry(call_id, 2, 3, Some(&failure("boom")));
        assert_eq!(store.call(&call_id).unwrap().retry_attempts, 2);

        tokio::time::advance(Duration::from_millis(250)).await;
        store.record_success(call_id, Some(json!({"rows": 3})), Instant::now());

        let call = store.call(&call_id).unwrap();
        assert_eq!(call.status, CallStatus::Success);
        assert_eq!(call.duration_ms, Some(250));
        assert!(store.active_calls().is_empty());

        let logs = store.logs(None);
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[1].status, Some(EntryStatus::Retry));
        assert_eq!(logs[1].retry_attempt, Some(2));
        assert_eq!(logs[2].duration_ms, Some(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_recorded() {
        let mut store = CallLogStore::default();
        let call_id = CallId::new();
        store.start_call(call_id, "sessions".to_string(), Instant::now());
        store.record_failure(call_id, failure("denied"), Instant::now());

        let call = store.call(&call_id).unwrap();
        assert_eq!(call.status, CallStatus::Error);
        assert_eq!(call.error.as_ref().unwrap().message, "denied");

        let stats = store.stats();
        assert_eq!(stats.error_count, 1);
        assert_eq!(stats.recent_errors.len(), 1);
        assert_eq!(stats.active_calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_for_unknown_call_are_ignored() {
        let mut store = CallLogStore::default();
        store.record_retry(CallId::new(), 2, 3, None);
        store.record_success(CallId::new(), None, Instant::now());
        store.record_failure(CallId::new(), failure("x"), Instant::now());
        assert!(store.is_empty());
    }

    #[test]
    fn test_entries_are_bounded() {
        let mut store = CallLogStore::new(5, Duration::from_secs(60));
        for i in 0..12 {
            store.log(LogLevel::Info, "ctx", format!("entry {}", i), None);
        }

        assert_eq!(store.len(), 5);
        let logs = store.logs(None);
        assert_eq!(logs.first().unwrap().message, "entry 7");
        assert_eq!(logs.last().unwrap().message, "entry 11");
    }

    #[test]
    fn test_log_queries() {
        let mut store = CallLogStore::default();
        store.log(LogLevel::Info, "a", "one", None);
        store.log(LogLevel::Warn, "a", "two", None);
        store.log(LogLevel::Warn, "a", "three", None);
        store.log(LogLevel::Error, "a", "four", None);

        assert_eq!(store.logs(Some(2)).len(), 2);
        assert_eq!(store.logs(Some(2))[0].message, "three");
        assert_eq!(store.logs(Some(100)).len(), 4);

        let warnings = store.logs_by_level(LogLevel::Warn, Some(1));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "three");

        let stats = store.stats();
        assert_eq!(stats.total_logs, 4);
        assert_eq!(stats.warning_count, 2);
        assert_eq!(stats.error_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_calls_expire_after_retention() {
        let mut store = CallLogStore::new(100, Duration::from_secs(60));
        let finished = CallId::new();
        let pending = CallId::new();

        store.start_call(finished, "a".to_string(), Instant::now());
        store.start_call(pending, "b".to_string(), Instant::now());
        store.record_success(finished, None, Instant::now());

        tokio::time::advance(Duration::from_secs(30)).await;
        store.prune_expired(Instant::now());
        assert!(store.call(&finished).is_some());

        tokio::time::advance(Duration::from_secs(31)).await;
        store.prune_expired(Instant::now());
        assert!(store.call(&finished).is_none());
        assert!(store.call(&pending).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_pending_calls_expire() {
        let mut store = CallLogStore::new(100, Duration::from_secs(60));
        let abandoned = CallId::new();
        store.start_call(abandoned, "a".to_string(), Instant::now());

        tokio::time::advance(Duration::from_secs(9 * 60)).await;
        store.prune_expired(Instant::now());
        assert!(store.call(&abandoned).is_some());

        tokio::time::advance(Duration::from_secs(60)).await;
        store.prune_expired(Instant::now());
        assert!(store.call(&abandoned).is_none());
        assert_eq!(store.stats().active_calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracked_calls_are_capped() {
        let mut store = CallLogStore::new(100, Duration::from_secs(60));
        let first = CallId::new();
        store.apply(CallLogMessage::Started {
            call_id: first,
            context: "flood".to_string(),
            at: Instant::now(),
        });
        for _ in 1..5000 {
            tokio::time::advance(Duration::from_millis(1)).await;
            store.apply(CallLogMessage::Started {
                call_id: CallId::new(),
                context: "flood".to_string(),
                at: Instant::now(),
            });
        }

        assert_eq!(store.len(), 100);
        assert_eq!(store.tracked_calls(), 100);
        assert_eq!(store.active_calls().len(), 100);
        assert!(store.call(&first).is_none());

        tokio::time::advance(Duration::from_secs(3600)).await;
        store.prune_expired(Instant::now());
        assert_eq!(store.tracked_calls(), 0);
        assert_eq!(store.stats().active_calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_calls_are_evicted_before_pending() {
        let mut store = CallLogStore::new(2, Duration::from_secs(60));
        let pending = CallId::new();
        let finished = CallId::new();

        store.start_call(pending, "a".to_string(), Instant::now());
        tokio::time::advance(Duration::from_millis(10)).await;
        store.start_call(finished, "b".to_string(), Instant::now());
        store.record_success(finished, None, Instant::now());

        let newest = CallId::new();
        store.start_call(newest, "c".to_string(), Instant::now());

        assert_eq!(store.tracked_calls(), 2);
        assert!(store.call(&pending).is_some());
        assert!(store.call(&finished).is_none());
        assert!(store.call(&newest).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_and_export() {
        let mut store = CallLogStore::default();
        let call_id = CallId::new();
        store.start_call(call_id, "progress".to_string(), Instant::now());

        let exported = store.export_json().unwrap();
        let value: JsonValue = serde_json::from_str(&exported).unwrap();
        assert_eq!(value["logs"].as_array().unwrap().len(), 1);
        assert_eq!(value["calls"].as_array().unwrap().len(), 1);
        assert_eq!(value["stats"]["active_calls"], 1);

        store.clear();
        assert!(store.is_empty());
        assert!(store.active_calls().is_empty());
    }
}
