//! Storage-specific error type wrapping sqlx errors.

use orderflow_domain::error::OrderFlowError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize a JSON column.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A value does not fit its `INTEGER` column.
    #[error("value out of range for column `{0}`")]
    OutOfRange(&'static str),
}

impl From<StorageError> for OrderFlowError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
