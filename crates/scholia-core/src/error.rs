//! Error types for the Scholia workspace.

use thiserror::Error;

use crate::storage::StorageError;

/// A shared error type for the Scholia workspace.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait. Storage-facing layers do
/// not surface expected failures through this type; see
/// [`crate::storage::StorageError`] and the error-sink convention.
#[derive(Error, Debug)]
pub enum ScholiaError {
    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding service error
    #[error("Embedding service error: {0}")]
    Embedding(String),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScholiaError {
    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is an embedding service error
    pub fn is_embedding(&self) -> bool {
        matches!(self, Self::Embedding(_))
    }
}

impl From<std::io::Error> for ScholiaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ScholiaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ScholiaError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for ScholiaError {
    fn from(err: reqwest::Error) -> Self {
        Self::Embedding(err.to_string())
    }
}

/// A type alias for `Result<T, ScholiaError>`.
pub type Result<T> = std::result::Result<T, ScholiaError>;
