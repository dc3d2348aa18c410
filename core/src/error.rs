//! Local store error types.

use rusqlite::ffi;
use thiserror::Error;

/// Errors surfaced by the local store and the service layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("local store is not initialized")]
    Uninitialized,

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    #[error("workout is already completed: {0}")]
    WorkoutCompleted(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("failed to encode column: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StorageError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StorageError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &err {
            let detail = message
                .clone()
                .unwrap_or_else(|| failure.to_string());
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                    return StorageError::DuplicateKey(detail);
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return StorageError::ForeignKey(detail),
                _ => {}
            }
        }
        StorageError::Sqlite(err)
    }
}

/// Result type for local store operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
