//! Common error types for NexusHub client operations.

use thiserror::Error;

/// Top-level error type for NexusHub client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The request never produced a response (connect failure, timeout).
    #[error("Network connection failed, please check your network settings: {0}")]
    Network(String),

    /// The backend answered with an envelope whose `code` is non-zero.
    #[error("{message}")]
    Business { code: i64, message: String },

    /// The backend answered with a non-success HTTP status.
    #[error("{message} (HTTP {status})")]
    HttpStatus {
        status: u16,
        message: String,
        /// Message carried in the response body, if any.
        detail: Option<String>,
    },

    /// The provider or the server does not implement the capability.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Required configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No storage provider is registered under the requested name.
    #[error("Unsupported storage type: {0}")]
    UnsupportedProvider(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Build an `HttpStatus` error with the user-facing message for `status`.
    pub fn from_status(status: u16, detail: Option<String>) -> Self {
        Self::HttpStatus {
            status,
            message: status_message(status),
            detail,
        }
    }

    /// HTTP status carried by this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Map an HTTP status code to the message shown to users.
pub fn status_message(status: u16) -> String {
    match status {
        400 => "Invalid request parameters".to_string(),
        401 => "Authentication required, please sign in again".to_string(),
        403 => "You do not have permission to perform this operation".to_string(),
        404 => "The requested resource does not exist".to_string(),
        409 => "The resource conflicts with an existing one".to_string(),
        413 => "The uploaded file is too large".to_string(),
        500 => "Internal server error, please try again later".to_string(),
        503 => "Service temporarily unavailable, please try again later".to_string(),
        other => format!("Request failed with status {}", other),
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages_are_distinct() {
        let mapped = [400u16, 401, 403, 404, 409, 413, 500, 503];
        let messages: std::collections::HashSet<String> =
            mapped.iter().map(|s| status_message(*s)).collect();
        assert_eq!(messages.len(), mapped.len());
        assert_eq!(status_message(418), "Request failed with status 418");
    }

    #[test]
    fn test_from_status_keeps_detail() {
        let err = Error::from_status(413, Some("body limit".to_string()));
        assert_eq!(err.status(), Some(413));
        match err {
            Error::HttpStatus { message, detail, .. } => {
                assert_eq!(message, "The uploaded file is too large");
                assert_eq!(detail.as_deref(), Some("body limit"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_business_error_displays_message_verbatim() {
        let err = Error::Business {
            code: 1001,
            message: "quota exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(err.status(), None);
    }
}
