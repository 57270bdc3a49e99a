//! Direct message data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::models::PlayerId;

/// Direct message ID type
pub type DirectMessageId = Uuid;

/// Private message between two players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub id: DirectMessageId,
    pub sender_id: PlayerId,
    pub receiver_id: PlayerId,
    pub message: String,
    /// Set once the receiver has opened the conversation
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl DirectMessage {
    pub fn new(sender_id: PlayerId, receiver_id: PlayerId, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            message: message.into(),
            read: false,
            created_at: Utc::now(),
        }
    }

    /// Whether the message belongs to the conversation between `a` and `b`
    pub fn between(&self, a: PlayerId, b: PlayerId) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

/// Request to send a direct message
#[derive(Debug, Clone, Deserialize)]
pub struct NewDirectMessage {
    pub receiver_id: PlayerId,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_is_symmetric() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let dm = DirectMessage::new(a, b, "gg");
        assert!(dm.between(a, b));
        assert!(dm.between(b, a));
        assert!(!dm.between(a, c));
        assert!(!dm.read);
    }
}
