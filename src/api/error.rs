//! Unified error handling for remote API calls.
//!
//! Every collaborator operation fails with an [`ApiError`]: a structured kind
//! from the taxonomy below plus a single human-readable message. Callers
//! never see transport-library error types.

use thiserror::Error;

/// Error kinds for remote API failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad credentials or an expired/invalid token
    Auth,
    /// Network or server failure on a read
    Fetch,
    /// Server-rejected payload on a write
    Validation,
    /// Stale identifier
    NotFound,
}

impl ErrorKind {
    /// Get the string representation of the error kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "auth_error",
            ErrorKind::Fetch => "fetch_error",
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed remote API operation
#[derive(Debug, Clone, Error)]
#[error("[{kind}] {message}")]
pub struct ApiError {
    /// The error kind
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error with a specific kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    // -------------------------------------------------------------------------
    // Convenience constructors for common error kinds
    // -------------------------------------------------------------------------

    /// Authentication error (bad credentials, expired/invalid token)
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, message)
    }

    /// Fetch error (network/server failure on a read)
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fetch, message)
    }

    /// Validation error (server rejected the payload)
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Not-found error (stale identifier)
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Map an HTTP status code to the error taxonomy
    pub fn from_status(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        use reqwest::StatusCode;

        let kind = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Auth,
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::Validation,
            _ => ErrorKind::Fetch,
        };
        Self::new(kind, message)
    }

    /// Coerce the error kind to `Auth`, keeping the message.
    ///
    /// Login and profile fetches report every failure (including network
    /// errors) as an authentication failure.
    pub fn into_auth(self) -> Self {
        Self::new(ErrorKind::Auth, self.message)
    }

    /// True if this is an authentication failure
    pub fn is_auth(&self) -> bool {
        self.kind == ErrorKind::Auth
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        // Transport-level failures (DNS, refused connection, timeout, bad
        // JSON) have no HTTP status to map from.
        ApiError::fetch(format!("Network error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, "nope").kind,
            ErrorKind::Auth
        );
        assert_eq!(
            ApiError::from_status(StatusCode::FORBIDDEN, "nope").kind,
            ErrorKind::Auth
        );
        assert_eq!(
            ApiError::from_status(StatusCode::NOT_FOUND, "gone").kind,
            ErrorKind::NotFound
        );
        assert_eq!(
            ApiError::from_status(StatusCode::BAD_REQUEST, "bad").kind,
            ErrorKind::Validation
        );
        assert_eq!(
            ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "bad").kind,
            ErrorKind::Validation
        );
        assert_eq!(
            ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom").kind,
            ErrorKind::Fetch
        );
    }

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = ApiError::not_found("User not found");
        assert_eq!(err.to_string(), "[not_found] User not found");
    }

    #[test]
    fn test_into_auth_keeps_message() {
        let err = ApiError::fetch("Connection refused").into_auth();
        assert_eq!(err.kind, ErrorKind::Auth);
        assert_eq!(err.message, "Connection refused");
    }
}
