//! Database-specific error types and conversions.

use markaz_core::error::MarkazError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Malformed row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for MarkazError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => MarkazError::NotFound { entity, id },
            other => MarkazError::Database(other.to_string()),
        }
    }
}
