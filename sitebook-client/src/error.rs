//! Error types for the client.
//!
//! Every failing backend call is normalized into one [`ServiceError`] carrying
//! the most specific message available. [`ClientError`] wraps setup failures
//! for the binary.

use sitebook_cache::QueryError;
use sitebook_core::{SelectionError, ValidationError};

use crate::config::ConfigError;

/// Message shown when neither the backend nor the transport said anything useful.
pub const FALLBACK_MESSAGE: &str = "Something went wrong";

/// What went wrong, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure or timeout. Retryable.
    Transport,
    /// Backend answered with a 4xx/5xx. Retryable for reads.
    HttpStatus { status: u16 },
    /// A required parameter was missing; no request was made.
    Validation,
    /// The response did not have the expected shape. Not retried.
    UnexpectedShape,
}

/// The single normalized error raised by services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            message
        };
        Self { kind, message }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HttpStatus { status }, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn unexpected_shape(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnexpectedShape, message)
    }

    /// HTTP status, when the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            ErrorKind::HttpStatus { status } => Some(status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind == ErrorKind::Transport
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::transport("Request timed out");
        }
        if err.is_decode() {
            return Self::unexpected_shape(err.to_string());
        }
        Self::transport(err.to_string())
    }
}

impl QueryError for ServiceError {
    fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Transport | ErrorKind::HttpStatus { .. }
        )
    }

    fn cache_failure(reason: String) -> Self {
        tracing::error!(reason = %reason, "Query cache failure");
        Self::unexpected_shape(FALLBACK_MESSAGE)
    }
}

/// Result type alias for service calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from setting up or driving the client outside a single call.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("Failed to initialize logging: {0}")]
    Telemetry(String),
    #[error("Usage: {0}")]
    Usage(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_message_falls_back() {
        let err = ServiceError::transport("   ");
        assert_eq!(err.message, FALLBACK_MESSAGE);
        assert_eq!(err.to_string(), FALLBACK_MESSAGE);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ServiceError::transport("down").is_retryable());
        assert!(ServiceError::http_status(503, "busy").is_retryable());
        assert!(!ServiceError::validation("missing").is_retryable());
        assert!(!ServiceError::unexpected_shape("bad").is_retryable());
    }

    #[test]
    fn test_status_accessor() {
        let err = ServiceError::http_status(401, "Unauthorized");
        assert_eq!(err.status(), Some(401));
        assert!(err.is_unauthorized());
        assert_eq!(ServiceError::transport("x").status(), None);
    }

    #[test]
    fn test_validation_conversion() {
        let err: ServiceError = ValidationError::missing(&["business_id"]).into();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("business_id"));
    }
}
