use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Errors surfaced by repositories and relation accessors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Entity not found: {entity} with id \"{id}\"")]
    NotFound { entity: &'static str, id: String },

    /// A write that would break referential or uniqueness constraints.
    #[error("{0}")]
    Conflict(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Database error: {0}")]
    Database(DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RepoError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        Self::InvalidFilter(msg.into())
    }
}

impl From<DbErr> for RepoError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => {
                Self::Conflict(format!("Unique constraint violated: {msg}"))
            }
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => {
                Self::Conflict(format!("Foreign key constraint violated: {msg}"))
            }
            _ => Self::Database(err),
        }
    }
}

impl From<tokio::task::JoinError> for RepoError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Background task failed: {err}"))
    }
}
