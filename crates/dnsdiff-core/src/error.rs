//! Error types for the dnsdiff pipeline
//!
//! The first four variants form the pipeline's failure taxonomy; the rest
//! are low-level causes that components wrap before surfacing them.

use thiserror::Error;

/// Result type alias for dnsdiff operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dnsdiff pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// DNS provider enumeration failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Snapshot could not be persisted
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Notification transport failed
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Required configuration missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create an upstream (DNS provider enumeration) error
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a delivery error
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error is fatal configuration rather than a runtime failure
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
