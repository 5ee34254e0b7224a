//! Logging configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default)]
    pub level: LogLevel,

    /// Log format
    #[serde(default)]
    pub format: LogFormat,

    /// Whether to include source location in logs
    #[serde(default = "crate::domains::utils::default_false")]
    pub include_location: bool,

    /// In-memory call log fed by the retry executor
    #[serde(default)]
    pub call_log: CallLogConfig,
}

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Log format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Text,
    Compact,
    Pretty,
}

/// Bounds for the in-memory call log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallLogConfig {
    /// Maximum number of retained log entries and tracked calls
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Capacity of the channel between callers and the log worker
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// How long a finished call stays queryable
    #[serde(
        rename = "retention_secs",
        with = "crate::domains::utils::serde_duration",
        default = "default_retention"
    )]
    pub retention: Duration,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
            include_location: false,
            call_log: CallLogConfig::default(),
        }
    }
}

impl Default for CallLogConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            channel_capacity: default_channel_capacity(),
            retention: default_retention(),
        }
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" => Ok(LogFormat::Text),
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

impl Validatable for LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.call_log.validate()
    }

    fn domain_name(&self) -> &'static str {
        "logging"
    }
}

impl Validatable for CallLogConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.max_entries, "max_entries", self.domain_name())?;
        validate_positive(self.channel_capacity, "channel_capacity", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "logging.call_log"
    }
}

// Default value functions
fn default_max_entries() -> usize {
    1000
}

fn default_channel_capacity() -> usize {
    256
}

fn default_retention() -> Duration {
    Duration::from_secs(60)
}
