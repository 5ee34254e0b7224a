//! Core types for Spotter
//!
//! This crate holds the vocabulary shared by every other Spotter crate:
//! the failure types an operation can produce, the normalized error that
//! the retry executor hands back to callers, and the call identifier that
//! threads through the call log.

pub mod error;
pub mod types;

// Re-export commonly used types at the crate root
pub use error::{ErrorKind, NetworkError, NormalizedError, RemoteError, TimeoutError};
pub use types::CallId;
