//! Core error taxonomy

use thiserror::Error;

/// Errors surfaced by the vector store, cache and matcher.
///
/// `Clone` so a single in-flight cache refresh can hand the same failure
/// to every waiter.
#[derive(Debug, Clone, Error)]
pub enum FaceError {
    /// The supplied vector does not have the configured dimension.
    /// Always rejected before any store or cache access.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The backing store could not be reached. Transient: the cache keeps
    /// serving its last good snapshot while this persists.
    #[error("vector store unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<sqlx::Error> for FaceError {
    fn from(e: sqlx::Error) -> Self {
        FaceError::StorageUnavailable(e.to_string())
    }
}
