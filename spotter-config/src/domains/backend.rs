//! Hosted backend connection configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the PostgREST-style backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend project
    #[serde(default = "default_url")]
    pub url: String,

    /// Anonymous or service API key, sent as `apikey` and bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Database schema exposed by the REST layer
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Transport-level request timeout
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_request_timeout"
    )]
    pub request_timeout: Duration,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            api_key: None,
            schema: default_schema(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Validatable for BackendConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.url, "url", self.domain_name())?;
        validate_required_string(&self.schema, "schema", self.domain_name())?;
        validate_positive(
            self.request_timeout.as_secs(),
            "request_timeout",
            self.domain_name(),
        )?;
        validate_required_string(&self.user_agent, "user_agent", self.domain_name())?;

        if let Some(ref key) = self.api_key {
            validate_required_string(key, "api_key", self.domain_name())?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "backend"
    }
}

// Default value functions
fn default_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    "Spotter/0.3".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_config_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.url, "http://localhost:54321");
        assert_eq!(config.schema, "public");
        assert!(config.api_key.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_backend_config_validation() {
        let mut config = BackendConfig::default();
        assert!(config.validate().is_ok());

        config.url = "not-a-url".to_string();
        assert!(config.validate().is_err());

        config = BackendConfig::default();
        config.api_key = Some(String::new());
        assert!(config.validate().is_err());

        config = BackendConfig::default();
        config.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
