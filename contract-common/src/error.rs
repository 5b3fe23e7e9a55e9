//! Centralized error type shared by the contract toolkit crates.
//!
//! Engine-level match failures are never represented here; they are recovered
//! into verdicts by `contract-matcher`. This type covers the surrounding
//! plumbing: configuration loading and serialization.

use thiserror::Error;

/// Common error type for toolkit operations.
#[derive(Error, Debug)]
pub enum ToolkitError {
    /// A configuration value was present but could not be used
    #[error("Invalid configuration {key}: {reason}")]
    InvalidConfig {
        /// The configuration key (environment variable name)
        key: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolkitError {
    /// Check if this error was caused by configuration input.
    ///
    /// # Examples
    ///
    /// ```
    /// use contract_common::ToolkitError;
    ///
    /// let err = ToolkitError::invalid_config("CONTRACT_MATCHER_TRIM_XML_TEXT", "not a bool");
    /// assert!(err.is_config_error());
    ///
    /// let err = ToolkitError::internal("boom");
    /// assert!(!err.is_config_error());
    /// ```
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error with the given message.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
