//! Storage-specific error type wrapping sqlx errors.

use smartcode_domain::error::{ConflictError, SmartHomeError};

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize or deserialize a stored JSON value.
    #[error("JSON column error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for SmartHomeError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}

/// Turn a unique-constraint violation into a domain conflict, anything else
/// into a storage error.
pub(crate) fn conflict_or_storage(err: sqlx::Error, entity: &'static str, key: String) -> SmartHomeError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ConflictError { entity, key }.into()
        }
        _ => StorageError::from(err).into(),
    }
}
