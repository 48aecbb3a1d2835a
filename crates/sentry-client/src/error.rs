//! Error types for Sentry client operations

use thiserror::Error;

/// Result type alias for Sentry client operations
pub type Result<T> = std::result::Result<T, SentryClientError>;

/// Errors that can occur while talking to the Sentry analysis service
#[derive(Error, Debug)]
pub enum SentryClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Service answered with a structured error body
    #[error("Service error {status}: {message}")]
    Service { status: u16, message: String },

    /// Response body did not match the documented shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Media type string was rejected when building the upload
    #[error("Invalid media type: {0}")]
    InvalidMediaType(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,
}

impl SentryClientError {
    /// Create a service error from status code and message
    pub fn service_error(status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
        }
    }

    /// True when no well-formed service answer was received: connection
    /// problems, timeouts, malformed bodies. Structured service errors
    /// return false; their message can be surfaced verbatim.
    pub fn is_transport(&self) -> bool {
        !matches!(self, Self::Service { .. })
    }

    /// The verbatim service message, when one exists
    pub fn service_message(&self) -> Option<&str> {
        match self {
            Self::Service { message, .. } => Some(message),
            _ => None,
        }
    }
}
