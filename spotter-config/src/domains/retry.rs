//! Retry policy configuration

use crate::error::ConfigResult;
use crate::validation::{validate_at_least, validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Retry policy for backend calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt
    #[serde(
        rename = "base_delay_ms",
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_base_delay"
    )]
    pub base_delay: Duration,

    /// Factor applied to the delay after each failed attempt
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Per-attempt timeout
    #[serde(
        rename = "timeout_ms",
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_timeout"
    )]
    pub timeout: Duration,

    /// Upper bound on a single backoff delay
    #[serde(
        rename = "max_delay_ms",
        with = "crate::domains::utils::serde_duration_ms_option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max_delay: Option<Duration>,

    /// Which failures are worth another attempt
    #[serde(default)]
    pub mode: RetryMode,
}

/// Which failures trigger another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetryMode {
    /// Retry every failure until attempts run out
    #[default]
    Always,
    /// Retry only network, timeout and server-side failures
    TransientOnly,
}

impl FromStr for RetryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always" => Ok(RetryMode::Always),
            "transient_only" | "transient" => Ok(RetryMode::TransientOnly),
            _ => Err(format!("Invalid retry mode: {}", s)),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            timeout: default_timeout(),
            max_delay: None,
            mode: RetryMode::Always,
        }
    }
}

impl Validatable for RetryConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.max_attempts, "max_attempts", self.domain_name())?;
        validate_at_least(
            self.backoff_multiplier,
            1.0,
            "backoff_multiplier",
            self.domain_name(),
        )?;
        validate_positive(self.timeout.as_millis(), "timeout_ms", self.domain_name())?;

        if let Some(max_delay) = self.max_delay {
            if max_delay < self.base_delay {
                return Err(self.validation_error(format!(
                    "max_delay_ms ({}) must not be below base_delay_ms ({})",
                    max_delay.as_millis(),
                    self.base_delay.as_millis()
                )));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "retry"
    }
}

// Default value functions
fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}
