//! Failure classification
//!
//! Turns whatever an attempt failed with into a [`NormalizedError`]. The
//! rules are heuristic: typed errors in the chain are checked first, then
//! well-known message markers. Classification never fails.

use spotter_core::{ErrorKind, NetworkError, NormalizedError, RemoteError, TimeoutError};
use std::io;
use std::time::Duration;

const TIMEOUT_MARKERS: &[&str] = &["timeout", "timed out"];

const NETWORK_MARKERS: &[&str] = &[
    "failed to fetch",
    "network",
    "econnrefused",
    "econnreset",
    "enotfound",
    "connection refused",
    "connection reset",
    "dns error",
];

/// Backend error codes that indicate a transient condition on the server side
const TRANSIENT_CODES: &[&str] = &["PGRST000", "PGRST001", "PGRST002", "PGRST003", "40001", "40P01"];

/// Information about the call a failure belongs to
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    pub context: &'a str,
}

impl<'a> ClassifyContext<'a> {
    pub fn new(context: &'a str) -> Self {
        Self { context }
    }
}

/// Classify a failure as timeout, network or generic
pub fn classify(error: anyhow::Error, ctx: &ClassifyContext<'_>) -> NormalizedError {
    let remote = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<RemoteError>())
        .cloned();

    let message = match remote {
        Some(ref remote) if !remote.message.trim().is_empty() => remote.message.clone(),
        _ => error.to_string(),
    };
    let message = if message.trim().is_empty() {
        "Unknown error".to_string()
    } else {
        message
    };
    let lowered = message.to_lowercase();

    let normalized = if let Some(timeout) = timeout_of(&error, &lowered) {
        match timeout {
            Some(after) => NormalizedError::new(
                ErrorKind::Timeout,
                TimeoutError { after }.to_string(),
                ctx.context,
            )
            .with_code("TIMEOUT")
            .with_status(408),
            None => {
                let mut normalized = with_remote_fields(
                    NormalizedError::new(ErrorKind::Timeout, message, ctx.context),
                    remote.as_ref(),
                );
                if normalized.code.is_none() {
                    normalized = normalized.with_code("TIMEOUT");
                }
                if normalized.status.is_none() {
                    normalized = normalized.with_status(408);
                }
                normalized
            }
        }
    } else if let Some(detail) = network_detail(&error, &message, &lowered) {
        let mut normalized = NormalizedError::new(
            ErrorKind::Network,
            format!("Network error: {}", detail),
            ctx.context,
        )
        .with_code("NETWORK_ERROR");
        if let Some(status) = remote.as_ref().and_then(|r| r.status) {
            normalized = normalized.with_status(status);
        }
        normalized
    } else {
        let normalized = NormalizedError::new(ErrorKind::Generic, message, ctx.context);
        with_remote_fields(normalized, remote.as_ref())
    };

    normalized.with_cause(error)
}

/// Copy the backend's code, status and details onto `normalized`
fn with_remote_fields(
    mut normalized: NormalizedError,
    remote: Option<&RemoteError>,
) -> NormalizedError {
    if let Some(remote) = remote {
        let code = remote
            .code
            .clone()
            .or_else(|| remote.status.map(|status| format!("HTTP_{}", status)));
        if let Some(code) = code {
            normalized = normalized.with_code(code);
        }
        if let Some(status) = remote.status {
            normalized = normalized.with_status(status);
        }
        if let Some(details) = remote.details.clone() {
            normalized = normalized.with_details(details);
        }
    }
    normalized
}

/// `Some` when the failure is a timeout; the inner value is the elapsed
/// limit when a [`TimeoutError`] carried it
fn timeout_of(error: &anyhow::Error, lowered: &str) -> Option<Option<Duration>> {
    for cause in error.chain() {
        if let Some(timeout) = cause.downcast_ref::<TimeoutError>() {
            return Some(Some(timeout.after));
        }
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            if io_error.kind() == io::ErrorKind::TimedOut {
                return Some(None);
            }
        }
    }

    if TIMEOUT_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return Some(None);
    }
    None
}

/// Human-readable detail when the failure is a transport problem
fn network_detail(error: &anyhow::Error, message: &str, lowered: &str) -> Option<String> {
    for cause in error.chain() {
        if let Some(network) = cause.downcast_ref::<NetworkError>() {
            return Some(network.0.clone());
        }
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            if is_network_io_kind(io_error.kind()) {
                return Some(io_error.to_string());
            }
        }
    }

    if NETWORK_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return Some(message.to_string());
    }
    None
}

fn is_network_io_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

/// Whether a classified failure is worth another attempt.
///
/// Timeouts, transport failures, 5xx responses and transient backend codes
/// are; client errors and anything unrecognised are not.
pub fn should_retry_error(error: &NormalizedError) -> bool {
    if matches!(error.kind, ErrorKind::Timeout | ErrorKind::Network) {
        return true;
    }

    if let Some(status) = error.status {
        return (500..600).contains(&status);
    }

    match error.code.as_deref() {
        Some(code) => {
            let code = code.to_uppercase().replace('_', "");
            TRANSIENT_CODES.contains(&code.as_str()) || code.starts_with("08")
        }
        None => false,
    }
}
