//! Direct message error types.

use thiserror::Error;

use crate::db::StoreError;
use crate::errors::{Classify, ErrorKind};
use crate::matches::models::MAX_MESSAGE_LEN;

/// Direct message errors
#[derive(Debug, Error)]
pub enum DirectMessageError {
    /// Message empty or too long
    #[error("Message must be between 1 and {MAX_MESSAGE_LEN} characters")]
    InvalidMessage,

    /// Sender and receiver are the same player
    #[error("Cannot send a message to yourself")]
    SelfMessage,

    /// Sender has not registered a profile
    #[error("A player profile is required to send messages")]
    ProfileRequired,

    /// Receiver or conversation peer has no profile
    #[error("Player not found")]
    PlayerNotFound,

    /// Storage error
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Classify for DirectMessageError {
    fn kind(&self) -> ErrorKind {
        match self {
            DirectMessageError::InvalidMessage
            | DirectMessageError::SelfMessage
            | DirectMessageError::ProfileRequired => ErrorKind::Validation,
            DirectMessageError::PlayerNotFound => ErrorKind::NotFound,
            DirectMessageError::Store(err) => err.kind(),
        }
    }

    fn client_message(&self) -> String {
        match self {
            DirectMessageError::Store(err) => err.client_message(),
            _ => self.to_string(),
        }
    }
}

/// Result type for direct message operations
pub type DirectMessageResult<T> = Result<T, DirectMessageError>;
