//! Backend access for Spotter
//!
//! This crate provides the `{data, error}` response convention used by the
//! hosted backend, the adapter that runs such calls through the retry
//! executor, a PostgREST client implementing [`BackendClient`], and
//! [`CachedBackend`] for reads served from a TTL cache.

pub mod adapter;
pub mod cached;
pub mod client;
pub mod errors;
pub mod query;
pub mod response;

// Re-export main types for convenience
pub use adapter::{execute_remote_call, DEFAULT_REMOTE_CONTEXT};
pub use cached::{select_key, CachedBackend};
pub use client::{BackendClient, RestBackendClient};
pub use errors::BackendError;
pub use query::{Filter, Order, Query};
pub use response::RemoteResponse;
pub use spotter_caching::FetchOptions;
pub use spotter_core::RemoteError;
