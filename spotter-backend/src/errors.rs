//! Backend client error types

use spotter_config::ConfigError;

/// Errors raised while setting up or addressing the backend.
///
/// Failures of an actual call are reported through
/// [`RemoteResponse::error`](crate::RemoteResponse) instead.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
