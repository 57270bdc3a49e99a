//! Dispute error types.

use thiserror::Error;

use crate::db::StoreError;
use crate::errors::{Classify, ErrorKind};

use super::models::DisputeStatus;

/// Dispute errors
#[derive(Debug, Error)]
pub enum DisputeError {
    /// Dispute not found
    #[error("Dispute not found")]
    NotFound,

    /// Disputed match not found
    #[error("Match not found")]
    MatchNotFound,

    /// Title, description or message rejected
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Reporter does not play in the match
    #[error("Only match participants can file disputes")]
    NotParticipant,

    /// Reporter already has an open dispute on this match
    #[error("An open dispute for this match already exists")]
    AlreadyOpen,

    /// Dispute is not in a state that allows the operation
    #[error("Dispute is {}", .0.as_str())]
    InvalidState(DisputeStatus),

    /// Caller may not view or act on the dispute
    #[error("Not allowed to access this dispute")]
    Unauthorized,

    /// Operation restricted to administrators
    #[error("Administrator rights required")]
    AdminRequired,

    /// Storage error
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Classify for DisputeError {
    fn kind(&self) -> ErrorKind {
        match self {
            DisputeError::InvalidInput(_) => ErrorKind::Validation,
            DisputeError::NotFound | DisputeError::MatchNotFound => ErrorKind::NotFound,
            DisputeError::AlreadyOpen | DisputeError::InvalidState(_) => ErrorKind::Conflict,
            DisputeError::NotParticipant
            | DisputeError::Unauthorized
            | DisputeError::AdminRequired => ErrorKind::Authorization,
            DisputeError::Store(err) => err.kind(),
        }
    }

    fn client_message(&self) -> String {
        match self {
            DisputeError::Store(err) => err.client_message(),
            _ => self.to_string(),
        }
    }
}

/// Result type for dispute operations
pub type DisputeResult<T> = Result<T, DisputeError>;
