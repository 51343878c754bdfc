//! Error types for the Markaz engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkazError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Authorization denied: cannot {action} on {table}")]
    AuthorizationDenied { action: String, table: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type MarkazResult<T> = Result<T, MarkazError>;
