//! Error types for Memoria.
//!
//! One error type covers every failure the binding and the backends can
//! report. It is `Clone` and `PartialEq` so it can be carried inside the
//! observable [`ListState`](crate::ListState).

use std::fmt;
use thiserror::Error;

/// The unified error type for Memoria operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The binding was configured with a resource name that cannot work in
    /// its path mode. Fatal to that binding until it is rebuilt.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// An operation needed a concrete path or identity that is not available yet.
    #[error("not ready: {0}")]
    NotReady(#[from] NotReadyError),

    /// An operation was called with a missing or malformed argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] InvalidArgumentError),

    /// The store rejected a subscription or a write.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Sign-up or sign-in failed.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),
}

impl Error {
    /// Shorthand for a remote error of the given kind.
    pub fn remote(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Error::Remote(RemoteError::new(kind, message))
    }

    /// Returns the remote error kind, if this is a remote error.
    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            Error::Remote(err) => Some(err.kind),
            _ => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// User-scoped bindings need a resource name.
    #[error("resource name cannot be empty for user-scoped lists")]
    EmptyResource,

    /// The resource name is not a valid storage path.
    #[error("invalid resource name '{value}': {reason}")]
    InvalidResource { value: String, reason: String },
}

/// Why an operation could not run yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotReadyError {
    /// The identity is still loading.
    #[error("identity is still loading")]
    Pending,

    /// Nobody is signed in, so there is no path to use.
    #[error("no signed-in identity")]
    Unauthenticated,

    /// The binding has been closed.
    #[error("list binding is closed")]
    Closed,
}

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidArgumentError {
    /// Record id missing or malformed.
    #[error("invalid record id '{value}': {reason}")]
    RecordId { value: String, reason: String },

    /// Storage path malformed.
    #[error("invalid path '{value}': {reason}")]
    Path { value: String, reason: String },

    /// Store URL malformed.
    #[error("invalid store URL '{value}': {reason}")]
    StoreUrl { value: String, reason: String },

    /// Record fields are not a JSON object or could not be (de)serialized.
    #[error("invalid record fields: {reason}")]
    Fields { reason: String },

    /// An update tried to touch a field that may not change.
    #[error("field '{field}' cannot be updated")]
    ProtectedField { field: String },

    /// Generic invalid input.
    #[error("{message}")]
    Other { message: String },
}

/// Classification of failures reported by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// The rules of the store do not allow this access.
    PermissionDenied,
    /// The store could not be reached, or the stream was interrupted.
    Unavailable,
    /// The store refused because of rate or size limits.
    QuotaExceeded,
    /// The addressed resource does not exist.
    NotFound,
    /// The store answered with something we did not understand.
    Protocol,
    /// Local I/O failure in a filesystem-backed store.
    Io,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemoteErrorKind::PermissionDenied => "permission denied",
            RemoteErrorKind::Unavailable => "unavailable",
            RemoteErrorKind::QuotaExceeded => "quota exceeded",
            RemoteErrorKind::NotFound => "not found",
            RemoteErrorKind::Protocol => "protocol error",
            RemoteErrorKind::Io => "I/O error",
        };
        f.write_str(s)
    }
}

/// A failure reported by the store, with its own message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// What went wrong.
    pub kind: RemoteErrorKind,
    /// Message from the store.
    pub message: String,
}

impl RemoteError {
    /// Create a new remote error.
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteError {}

/// Authentication-related errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Wrong email or password, or a token that no longer matches.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Sign-up for an email that already has an account.
    #[error("an account already exists for '{0}'")]
    AccountExists(String),

    /// The auth service answered with an error we do not classify.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_display_includes_kind_and_message() {
        let err = Error::remote(RemoteErrorKind::PermissionDenied, "rules deny read");
        assert_eq!(
            err.to_string(),
            "remote error: permission denied: rules deny read"
        );
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::PermissionDenied));
    }

    #[test]
    fn non_remote_errors_have_no_kind() {
        let err: Error = NotReadyError::Pending.into();
        assert_eq!(err.remote_kind(), None);
        assert_eq!(err.to_string(), "not ready: identity is still loading");
    }
}
