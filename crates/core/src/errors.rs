//! Error types shared by every SeniorLink crate.

use thiserror::Error;

use crate::sync::RemoteFailure;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Database-level failures reported by a Local Store backend.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors produced by the sync core.
#[derive(Debug, Error)]
pub enum Error {
    /// The storage engine cannot be used at all (quota, unsupported, pool down).
    /// Callers degrade to remote-only instead of failing hard.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Remote API failure: {0}")]
    Remote(#[from] RemoteFailure),
}

impl Error {
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable(message.into())
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    /// True when the failure means the local engine itself is gone.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}
