//! Domain-level error types for quote-manager.
//!
//! All errors are typed with `thiserror`. The three kinds that matter to
//! callers are validation (bad input, store untouched), network (sync cycle
//! abandoned) and persistence (in-memory state kept, durable write failed).

use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Input failed validation; the operation was aborted without side effects.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Remote fetch failed (transport, status, timeout or malformed body).
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Durable storage could not be read or written.
    #[error("Persistence error: {message}")]
    Persistence {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON serialization or parsing failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a persistence error from rusqlite error.
    pub fn database(err: rusqlite::Error) -> Self {
        Self::Persistence {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a network error from a reqwest error.
    pub fn network(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else {
            err.to_string()
        };

        Self::Network {
            message,
            source: Some(Box::new(err)),
        }
    }

    /// Create a network error without an underlying source.
    pub fn network_message(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Whether this error leaves the store unchanged by contract.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Whether this error came from the remote source.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
