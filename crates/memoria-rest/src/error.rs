//! Mapping of HTTP failures onto store errors.

use reqwest::StatusCode;
use serde::Deserialize;

use memoria_core::error::{Error, RemoteErrorKind};

/// Error body of the database REST API: `{"error": "Permission denied"}`.
#[derive(Debug, Deserialize)]
struct RestErrorBody {
    error: String,
}

/// Classify an HTTP status.
pub(crate) fn status_kind(status: StatusCode) -> RemoteErrorKind {
    match status.as_u16() {
        401 | 403 => RemoteErrorKind::PermissionDenied,
        404 => RemoteErrorKind::NotFound,
        429 => RemoteErrorKind::QuotaExceeded,
        500..=599 => RemoteErrorKind::Unavailable,
        _ => RemoteErrorKind::Protocol,
    }
}

/// Build an error from a failed response's status and body.
pub(crate) fn status_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<RestErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
    Error::remote(status_kind(status), message)
}

/// Connection failures, timeouts and broken bodies.
pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    if err.is_decode() {
        Error::remote(RemoteErrorKind::Protocol, err.to_string())
    } else {
        Error::remote(RemoteErrorKind::Unavailable, err.to_string())
    }
}
