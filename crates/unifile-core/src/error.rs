//! Unified error types for Unifile.
//!
//! Providers, caches, stores and processors map their internal and vendor
//! errors into [`AppError`] at their own boundary, so the orchestration
//! layer only ever branches on [`ErrorKind`].
//!
//! The engine never retries a failed operation on its own. Callers decide
//! whether to retry, and [`AppError::is_retryable`] tells them when doing so
//! makes sense.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Size or MIME type rejected before any I/O took place.
    Validation,
    /// A provider could not be initialized (bad config, missing bucket).
    ProviderInit,
    /// A provider rejected the configured credentials.
    ProviderAuth,
    /// A network or disk level transfer failure.
    Transfer,
    /// The file record or stored object does not exist.
    NotFound,
    /// The caller is not permitted to perform the action.
    AccessDenied,
    /// The processing queue is at capacity.
    QueueFull,
    /// A post-upload processor failed.
    Processing,
    /// The operation conflicts with the current state (already deleted, duplicate id).
    Conflict,
    /// A configuration error occurred.
    Configuration,
    /// A cache error occurred.
    Cache,
    /// The metadata store failed.
    Metadata,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::ProviderInit => write!(f, "PROVIDER_INIT"),
            Self::ProviderAuth => write!(f, "PROVIDER_AUTH"),
            Self::Transfer => write!(f, "TRANSFER"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::AccessDenied => write!(f, "ACCESS_DENIED"),
            Self::QueueFull => write!(f, "QUEUE_FULL"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Cache => write!(f, "CACHE"),
            Self::Metadata => write!(f, "METADATA"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified error used throughout Unifile.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a provider initialization error.
    pub fn provider_init(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProviderInit, message)
    }

    /// Create a provider authentication error.
    pub fn provider_auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProviderAuth, message)
    }

    /// Create a transfer error.
    pub fn transfer(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transfer, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an access-denied error.
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessDenied, message)
    }

    /// Create a queue-full error.
    pub fn queue_full(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::QueueFull, message)
    }

    /// Create a processing error.
    pub fn processing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Processing, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cache, message)
    }

    /// Create a metadata store error.
    pub fn metadata(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Metadata, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether a caller may reasonably retry the failed operation.
    ///
    /// Only transfer failures qualify. Retrying an upload means calling
    /// `upload_file` again, which allocates a new file id.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Transfer
    }

    /// Shorthand for `self.kind == kind`.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let kind = if err.kind() == std::io::ErrorKind::NotFound {
            ErrorKind::NotFound
        } else {
            ErrorKind::Transfer
        };
        Self::with_source(kind, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Invalid configuration: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = AppError::queue_full("processing queue is full (capacity 2)");
        assert_eq!(
            err.to_string(),
            "QUEUE_FULL: processing queue is full (capacity 2)"
        );
    }

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AppError = io.into();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: AppError = io.into();
        assert_eq!(err.kind, ErrorKind::Transfer);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_only_transfer_is_retryable() {
        assert!(!AppError::not_found("x").is_retryable());
        assert!(!AppError::provider_auth("x").is_retryable());
        assert!(AppError::transfer("x").is_retryable());
    }
}
