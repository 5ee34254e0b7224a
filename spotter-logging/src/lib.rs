//! Logging infrastructure for Spotter
//!
//! This crate provides:
//! - tracing subscriber initialisation driven by [`LoggingConfig`]
//! - the [`CallLogger`] collaborator the retry executor reports to
//! - a bounded in-memory call log with stats and JSON export

pub mod call_logger;
pub mod channel;
pub mod event;
pub mod init;
pub mod store;

// Re-export main types for convenience
pub use call_logger::{CallLogger, NoopCallLogger, TracingCallLogger};
pub use channel::ChannelCallLogger;
pub use event::{CallLogMessage, CallRecord, CallStatus, EntryStatus, LogEntry};
pub use init::{init_logging_from_config, init_simple_tracing};
pub use spotter_config::{LogLevel, LoggingConfig};
pub use store::{CallLogStats, CallLogStore};

use once_cell::sync::OnceCell;
use std::sync::Arc;

static GLOBAL_CALL_LOGGER: OnceCell<Arc<dyn CallLogger>> = OnceCell::new();

/// Install the process-wide call logger
pub fn init_call_logger(logger: Arc<dyn CallLogger>) -> Result<(), &'static str> {
    GLOBAL_CALL_LOGGER
        .set(logger)
        .map_err(|_| "Call logger already initialized")
}

/// Get the process-wide call logger, if one was installed
pub fn call_logger() -> Option<Arc<dyn CallLogger>> {
    GLOBAL_CALL_LOGGER.get().cloned()
}

/// The installed call logger, or one that only writes tracing events
pub fn call_logger_or_tracing() -> Arc<dyn CallLogger> {
    call_logger().unwrap_or_else(|| Arc::new(TracingCallLogger))
}
