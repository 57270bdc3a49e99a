//! Match error types.

use thiserror::Error;

use crate::db::StoreError;
use crate::errors::{Classify, ErrorKind};

use super::models::{MAX_MESSAGE_LEN, MAX_SCORE, MatchStatus};

/// Match errors
#[derive(Debug, Error)]
pub enum MatchError {
    /// Score is not an integer between 0 and [`MAX_SCORE`]
    #[error("Invalid score '{0}': scores must be integers between 0 and {MAX_SCORE}")]
    InvalidScore(String),

    /// Both players reported the same score
    #[error("Tied scores are not allowed; a match must have a winner")]
    TieNotAllowed,

    /// Match not found
    #[error("Match not found")]
    NotFound,

    /// Match is not in a state that allows the operation
    #[error("Match is {0}")]
    InvalidState(MatchStatus),

    /// Caller does not play in the match
    #[error("Only match participants can do this")]
    NotParticipant,

    /// Caller is neither the tournament creator nor an administrator
    #[error("Only the tournament organizer can do this")]
    Unauthorized,

    /// Chat message empty or too long
    #[error("Message must be between 1 and {MAX_MESSAGE_LEN} characters")]
    InvalidMessage,

    /// Storage error
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Classify for MatchError {
    fn kind(&self) -> ErrorKind {
        match self {
            MatchError::InvalidScore(_)
            | MatchError::TieNotAllowed
            | MatchError::InvalidMessage => ErrorKind::Validation,
            MatchError::NotFound => ErrorKind::NotFound,
            MatchError::InvalidState(_) => ErrorKind::Conflict,
            MatchError::NotParticipant | MatchError::Unauthorized => ErrorKind::Authorization,
            MatchError::Store(err) => err.kind(),
        }
    }

    fn client_message(&self) -> String {
        match self {
            MatchError::Store(err) => err.client_message(),
            _ => self.to_string(),
        }
    }
}

/// Result type for match operations
pub type MatchResult<T> = Result<T, MatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_stays_a_conflict() {
        let err = MatchError::from(StoreError::conflict("match is completed"));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_classification() {
        assert_eq!(MatchError::TieNotAllowed.kind(), ErrorKind::Validation);
        assert_eq!(MatchError::NotParticipant.kind(), ErrorKind::Authorization);
        assert_eq!(
            MatchError::InvalidState(MatchStatus::Completed).to_string(),
            "Match is completed"
        );
    }
}
