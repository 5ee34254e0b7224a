//! Domain-specific configuration modules

pub mod backend;
pub mod cache;
pub mod logging;
pub mod retry;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main Spotter configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SpotterConfig {
    /// Retry policy applied to backend calls
    #[serde(default)]
    pub retry: retry::RetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,

    /// Hosted backend connection
    #[serde(default)]
    pub backend: backend::BackendConfig,

    /// Read-through cache for backend reads
    #[serde(default)]
    pub cache: cache::CacheConfig,
}

impl SpotterConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.retry.validate()?;
        self.logging.validate()?;
        self.backend.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}
