//! Profile error types.

use thiserror::Error;

use crate::db::StoreError;
use crate::errors::{Classify, ErrorKind};

/// Profile errors
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Profile not found
    #[error("Profile not found")]
    NotFound,

    /// Username taken by another player
    #[error("Username already taken")]
    UsernameTaken,

    /// Username rejected
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Other field rejected
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation restricted to administrators
    #[error("Administrator rights required")]
    AdminRequired,

    /// Storage error
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Classify for ProfileError {
    fn kind(&self) -> ErrorKind {
        match self {
            ProfileError::InvalidUsername(_) | ProfileError::InvalidInput(_) => {
                ErrorKind::Validation
            }
            ProfileError::NotFound => ErrorKind::NotFound,
            ProfileError::UsernameTaken => ErrorKind::Conflict,
            ProfileError::AdminRequired => ErrorKind::Authorization,
            ProfileError::Store(err) => err.kind(),
        }
    }

    fn client_message(&self) -> String {
        match self {
            ProfileError::Store(err) => err.client_message(),
            _ => self.to_string(),
        }
    }
}

/// Result type for profile operations
pub type ProfileResult<T> = Result<T, ProfileError>;
