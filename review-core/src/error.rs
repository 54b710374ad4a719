//! Error types for review editor operations.

use thiserror::Error;

/// Result type for review editor operations.
pub type ReviewResult<T> = Result<T, ReviewError>;

/// Errors that can occur in review editor operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Annotation serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The storage collaborator rejected a read or write.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Filesystem error from a local blob store.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration values are out of range or inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The video identifier cannot be used to derive a storage key.
    #[error("Invalid video id: {0:?}")]
    InvalidVideoId(String),
}

impl ReviewError {
    /// Whether the user can reasonably retry the failed operation.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_))
    }
}
