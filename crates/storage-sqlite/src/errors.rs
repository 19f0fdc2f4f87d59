//! Storage-layer errors and their conversion into core errors.

use diesel::r2d2;
use thiserror::Error;

use seniorlink_core::errors::{DatabaseError, Error};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Connection failed: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::PoolError),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Core(#[from] Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Corrupt(err.to_string())
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Query(e) => Error::Database(DatabaseError::QueryFailed(e.to_string())),
            StorageError::Connection(e) => Error::storage_unavailable(e.to_string()),
            StorageError::Pool(e) => Error::storage_unavailable(e.to_string()),
            StorageError::Migration(msg) => Error::storage_unavailable(msg),
            StorageError::Corrupt(msg) => Error::Database(DatabaseError::Internal(msg)),
            StorageError::Core(e) => e,
        }
    }
}
