//! Tournament error types.

use thiserror::Error;

use crate::db::StoreError;
use crate::errors::{Classify, ErrorKind};

use super::models::TournamentStatus;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Tournament not found
    #[error("Tournament not found")]
    NotFound,

    /// Request failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tournament is in the wrong lifecycle state
    #[error("Tournament is {actual}, expected {expected}")]
    InvalidState {
        expected: TournamentStatus,
        actual: TournamentStatus,
    },

    /// Registration only happens before the first round
    #[error("Registration is closed")]
    RegistrationClosed,

    /// Tournament is at capacity
    #[error("Tournament is full ({0} participants)")]
    TournamentFull(u32),

    /// Player already registered
    #[error("Already registered for this tournament")]
    AlreadyRegistered,

    /// Player is not (or no longer) a registered participant
    #[error("Not registered for this tournament")]
    NotRegistered,

    /// Fewer than two participants to start with
    #[error("Not enough participants to pair: {0} registered, at least 2 required")]
    InsufficientPlayers(usize),

    /// In-progress tournament with fewer than two players waiting
    #[error("No pairable participants: {0} waiting, at least 2 required")]
    NothingToPair(usize),

    /// Prize tier set rejected
    #[error("Invalid prize tiers: {0}")]
    InvalidPrizeTiers(String),

    /// Distribution requested without tiers
    #[error("No prize tiers configured")]
    NoPrizeTiers,

    /// Prizes were paid out already
    #[error("Prizes have already been distributed")]
    PrizesAlreadyDistributed,

    /// Tournament still has open matches
    #[error("{0} matches are still open")]
    MatchesOutstanding(usize),

    /// Caller is neither the creator nor an administrator
    #[error("Only the tournament organizer can do this")]
    Unauthorized,

    /// Caller has no profile yet
    #[error("A player profile is required")]
    ProfileRequired,

    /// Storage error
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Classify for TournamentError {
    fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::InvalidInput(_)
            | TournamentError::InvalidPrizeTiers(_)
            | TournamentError::InsufficientPlayers(_)
            | TournamentError::ProfileRequired => ErrorKind::Validation,
            TournamentError::NotFound | TournamentError::NotRegistered => ErrorKind::NotFound,
            TournamentError::InvalidState { .. }
            | TournamentError::RegistrationClosed
            | TournamentError::TournamentFull(_)
            | TournamentError::AlreadyRegistered
            | TournamentError::NothingToPair(_)
            | TournamentError::NoPrizeTiers
            | TournamentError::PrizesAlreadyDistributed
            | TournamentError::MatchesOutstanding(_) => ErrorKind::Conflict,
            TournamentError::Unauthorized => ErrorKind::Authorization,
            TournamentError::Store(err) => err.kind(),
        }
    }

    fn client_message(&self) -> String {
        match self {
            TournamentError::Store(err) => err.client_message(),
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
