//! Caching for Spotter backend reads
//!
//! [`TtlCache`] is a string-keyed store whose entries expire on the tokio
//! clock. [`FetchCache`] puts it in front of an async fetch: a live entry
//! is returned as is, otherwise the fetch runs (optionally under a timeout)
//! and its value is stored. Failed fetches are never cached.

pub mod fetch;
pub mod ttl;

pub use fetch::{FetchCache, FetchOptions};
pub use ttl::TtlCache;
