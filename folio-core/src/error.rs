//! Error types for document and scene operations.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Requested document or page does not exist (or is not visible to the caller).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid operation on a document or page.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Scene document could not be decoded.
    #[error("Malformed scene document: {0}")]
    MalformedScene(String),

    /// Scene has no clip boundary object.
    #[error("Scene has no clip boundary")]
    MissingClipBoundary,

    /// Scene has more than one clip boundary object.
    #[error("Scene has {0} clip boundaries, expected exactly one")]
    DuplicateClipBoundary(usize),

    /// Backing store failed; the operation may succeed if retried.
    #[error("Store unavailable: {0}")]
    Store(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether a later attempt of the same operation could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Io(_))
    }
}
