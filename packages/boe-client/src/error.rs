//! Error types for the BOE client.
//!
//! Every failure leaves the crate as an [`ApiError`]: one shape carrying the
//! [`ErrorKind`], a stable numeric code (the HTTP status when one is known,
//! `500` for network and parse failures, `400` for rejected input), a short
//! message, optional detail, and the moment it was raised.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Result type for BOE client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Synthetic code used when no HTTP status is available.
pub const SYNTHETIC_SERVER_CODE: u16 = 500;

/// Code used for caller input rejected before any network call.
pub const VALIDATION_CODE: u16 = 400;

/// Longest response body kept as error detail.
const BODY_SNIPPET_CHARS: usize = 512;

/// Which part of the pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller-supplied identifier, date or setting failed a format check.
    Validation,
    /// Transient faults outlasted the retry budget, or the call was cancelled.
    Network(NetworkFailure),
    /// The service answered with a non-2xx status.
    Remote,
    /// The payload did not parse as its declared format.
    Format,
}

/// Why a network error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkFailure {
    RetriesExhausted,
    Cancelled,
}

/// The single error shape surfaced by this crate.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message} (code {code})")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ApiError {
    fn new(kind: ErrorKind, code: u16, message: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            detail,
            timestamp: Utc::now(),
        }
    }

    /// Invalid caller input, raised before anything touches the network.
    pub fn validation(field: &str, value: &str, expected: &str) -> Self {
        Self::new(
            ErrorKind::Validation,
            VALIDATION_CODE,
            format!("Invalid parameter: {}", field),
            Some(format!("got `{}`, expected {}", value, expected)),
        )
    }

    /// Every attempt failed transiently. `cause` is the last fault seen.
    pub fn retries_exhausted(attempts: u32, cause: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Network(NetworkFailure::RetriesExhausted),
            SYNTHETIC_SERVER_CODE,
            format!("Connection failed after {} attempts", attempts),
            Some(cause.into()),
        )
    }

    /// The caller's token fired while a request or backoff was pending.
    pub fn cancelled(target: &str) -> Self {
        Self::new(
            ErrorKind::Network(NetworkFailure::Cancelled),
            SYNTHETIC_SERVER_CODE,
            "Request cancelled",
            Some(target.to_string()),
        )
    }

    /// Non-2xx answer. The body is kept as a bounded snippet.
    pub fn remote(status: u16, body: &str) -> Self {
        let snippet = snippet(body);
        Self::new(
            ErrorKind::Remote,
            status,
            format!("HTTP error {}", status),
            (!snippet.is_empty()).then_some(snippet),
        )
    }

    /// Payload could not be parsed as `format`.
    pub fn format(format: &str, cause: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorKind::Format,
            SYNTHETIC_SERVER_CODE,
            format!("Failed to parse {} response", format),
            Some(cause.to_string()),
        )
    }

    /// True when the failure was a cancellation rather than a real fault.
    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Network(NetworkFailure::Cancelled)
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
