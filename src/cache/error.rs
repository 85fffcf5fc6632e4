//! Cache error types.

use thiserror::Error;

/// Errors that can occur during cache operations.
///
/// A disabled cache is not an error: lookups on it yield a miss and writes
/// report `false`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backend could not be initialized from configuration.
    #[error("Cache connection failed: {0}")]
    Connection(String),

    /// An operation was attempted before `connect` succeeded.
    #[error("Cache not connected")]
    NotConnected,

    /// A single backend call failed or returned an unexpected status.
    #[error("Cache {operation} failed for key '{key}': {message}")]
    Backend {
        operation: &'static str,
        key: String,
        message: String,
    },

    /// The key cannot be used by this backend.
    #[error("Invalid cache key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CacheError {
    /// Create a backend error with operation and key context.
    pub fn backend<M: ToString>(operation: &'static str, key: &str, message: M) -> Self {
        CacheError::Backend {
            operation,
            key: key.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an invalid key error.
    pub fn invalid_key<R: Into<String>>(key: &str, reason: R) -> Self {
        CacheError::InvalidKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error came from a backend call rather than setup or input.
    pub fn is_backend(&self) -> bool {
        matches!(self, CacheError::Backend { .. })
    }
}
