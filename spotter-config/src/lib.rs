//! Domain-driven configuration management for Spotter
//!
//! This crate provides configuration split by functional domains
//! (retry policy, logging, backend connection, read cache), with validation,
//! defaults, and environment variable support.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    backend::BackendConfig,
    cache::CacheConfig,
    logging::{CallLogConfig, LogFormat, LogLevel, LoggingConfig},
    retry::{RetryConfig, RetryMode},
    SpotterConfig,
};

// Re-export utilities
pub use domains::utils::{serde_duration, serde_duration_ms};
