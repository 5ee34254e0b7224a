//! Configuration loading and environment variable handling

use crate::domains::SpotterConfig;
use crate::error::{ConfigError, ConfigResult};
use log::debug;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "SPOTTER".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML or JSON file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<SpotterConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let mut config: SpotterConfig = if is_json {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        debug!("Loaded configuration from {}", path.display());

        // Apply environment variable overrides
        self.apply_env_overrides(&mut config)?;

        // Validate all domains
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<SpotterConfig> {
        let mut config = SpotterConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<SpotterConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut SpotterConfig) -> ConfigResult<()> {
        self.apply_retry_overrides(&mut config.retry)?;
        self.apply_logging_overrides(&mut config.logging)?;
        self.apply_backend_overrides(&mut config.backend)?;
        self.apply_cache_overrides(&mut config.cache)?;
        Ok(())
    }

    /// Apply retry config overrides
    fn apply_retry_overrides(
        &self,
        config: &mut crate::domains::retry::RetryConfig,
    ) -> ConfigResult<()> {
        if let Some(attempts) = self.parse_env_var::<u32>("RETRY_MAX_ATTEMPTS")? {
            config.max_attempts = attempts;
        }

        if let Some(millis) = self.parse_env_var::<u64>("RETRY_BASE_DELAY_MS")? {
            config.base_delay = Duration::from_millis(millis);
        }

        if let Some(multiplier) = self.parse_env_var::<f64>("RETRY_BACKOFF_MULTIPLIER")? {
            config.backoff_multiplier = multiplier;
        }

        if let Some(millis) = self.parse_env_var::<u64>("RETRY_TIMEOUT_MS")? {
            config.timeout = Duration::from_millis(millis);
        }

        if let Ok(mode) = self.get_env_var("RETRY_MODE") {
            config.mode = crate::domains::retry::RetryMode::from_str(&mode)
                .map_err(|_| ConfigError::EnvError(format!("Invalid RETRY_MODE: {}", mode)))?;
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Apply backend config overrides
    fn apply_backend_overrides(
        &self,
        config: &mut crate::domains::backend::BackendConfig,
    ) -> ConfigResult<()> {
        if let Ok(url) = self.get_env_var("BACKEND_URL") {
            config.url = url;
        }

        if let Ok(key) = self.get_env_var("BACKEND_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(schema) = self.get_env_var("BACKEND_SCHEMA") {
            config.schema = schema;
        }

        Ok(())
    }

    /// Apply cache config overrides
    fn apply_cache_overrides(
        &self,
        config: &mut crate::domains::cache::CacheConfig,
    ) -> ConfigResult<()> {
        if let Some(enabled) = self.parse_env_var::<bool>("CACHE_ENABLED")? {
            config.enabled = enabled;
        }

        if let Some(millis) = self.parse_env_var::<u64>("CACHE_DEFAULT_TTL_MS")? {
            config.default_ttl = Duration::from_millis(millis);
        }

        if let Some(millis) = self.parse_env_var::<u64>("CACHE_TIMEOUT_MS")? {
            config.timeout = Some(Duration::from_millis(millis));
        }

        Ok(())
    }

    /// Parse an optional environment variable, failing on malformed values
    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e))),
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
