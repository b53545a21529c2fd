//! Database error types.

use neighbors_core::{ModelError, TaskStatus};
use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// SQLx error (connection, query, etc.)
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Record not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Record already exists
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// Stored row could not be turned into a domain value
    #[error("invalid {entity} row {id}: {source}")]
    InvalidRow {
        entity: &'static str,
        id: String,
        #[source]
        source: ModelError,
    },

    /// Task is no longer open for responses
    #[error("task {0} is not accepting responses")]
    TaskClosed(String),

    /// Status change that would move a task backward
    #[error("task {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
