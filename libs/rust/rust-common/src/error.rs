//! Platform error type shared by services and their infrastructure adapters.
//!
//! Every variant is classified as retryable or not, so a caller talking to a
//! backing store can tell a transient outage apart from a permanent failure.

use thiserror::Error;

/// Common error type for infrastructure operations.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backing service is temporarily unavailable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Operation did not finish within its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    /// Check if this error is retryable.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_common::PlatformError;
    ///
    /// assert!(PlatformError::unavailable("redis").is_retryable());
    /// assert!(!PlatformError::NotFound("lineage".to_string()).is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }

    /// Create an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a timeout error with the given message.
    #[must_use]
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an invalid input error with the given message.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
