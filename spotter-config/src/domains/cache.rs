//! Cached remote read configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the read-through cache in front of backend reads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When disabled every read goes to the backend and nothing is stored
    #[serde(default = "crate::domains::utils::default_true")]
    pub enabled: bool,

    /// Lifetime of an entry when the caller doesn't pick one
    #[serde(
        rename = "default_ttl_ms",
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_ttl"
    )]
    pub default_ttl: Duration,

    /// Limit on a single fetch; unbounded when absent
    #[serde(
        rename = "timeout_ms",
        with = "crate::domains::utils::serde_duration_ms_option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,

    /// Maximum number of cached keys
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: default_ttl(),
            timeout: None,
            max_entries: default_max_entries(),
        }
    }
}

impl Validatable for CacheConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(
            self.default_ttl.as_millis(),
            "default_ttl_ms",
            self.domain_name(),
        )?;
        validate_positive(self.max_entries, "max_entries", self.domain_name())?;

        if let Some(timeout) = self.timeout {
            validate_positive(timeout.as_millis(), "timeout_ms", self.domain_name())?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "cache"
    }
}

// Default value functions
fn default_ttl() -> Duration {
    Duration::from_secs(30)
}

fn default_max_entries() -> usize {
    1000
}
