//! Storage error types.

use std::time::Duration;
use thiserror::Error;

use crate::errors::{Classify, ErrorKind};

/// Errors raised by a [`Repository`](super::Repository) implementation
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Operation did not finish in time
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Row referenced by an atomic write does not exist
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Conditional write lost against the current state
    #[error("Conflicting update: {0}")]
    Conflict(String),

    /// Stored value could not be decoded
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// Build a conflict error
    pub fn conflict(reason: impl Into<String>) -> Self {
        StoreError::Conflict(reason.into())
    }

    /// Map unique-constraint violations to [`StoreError::Conflict`].
    pub fn from_insert(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(format!("{what} already exists"))
            }
            _ => StoreError::Database(err),
        }
    }
}

impl Classify for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::Database(_) | StoreError::Timeout(_) | StoreError::InvalidData(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
