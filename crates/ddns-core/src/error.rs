//! Error types for the DDNS agent
//!
//! This module defines all error types used throughout the crate.
//!
//! Only [`Error::Config`] is fatal: the reconciliation loop catches every
//! other variant at the cycle boundary, logs it and retries on the next tick.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS agent
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (startup only)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential acquisition failed
    ///
    /// Not transient in the way a network blip is: retrying without operator
    /// intervention rarely helps, so it is logged at error level.
    #[error("Credential error: {0}")]
    Credential(String),

    /// The public IP could not be determined
    #[error("IP resolution error: {0}")]
    Resolution(String),

    /// A record set update was rejected or could not be delivered
    #[error("Update of record set {record} failed: {message}")]
    Update {
        /// Record set name
        record: String,
        /// Error message
        message: String,
    },

    /// A network call exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a credential error
    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    /// Create an IP resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a record set update error
    pub fn update(record: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Update {
            record: record.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Whether this error came from credential acquisition
    pub fn is_credential(&self) -> bool {
        matches!(self, Self::Credential(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
