//! Direct message manager.
//!
//! Conversations are private to their two players; there is no admin
//! override. Each sent message is published on
//! [`Topic::DirectMessages`] scoped to the receiver, so a subscription
//! keyed on a player id sees exactly the messages addressed to them.

use std::sync::Arc;

use super::errors::{DirectMessageError, DirectMessageResult};
use super::models::DirectMessage;
use crate::db::Repository;
use crate::events::{ChangeAction, EventHub, Topic};
use crate::matches::models::MAX_MESSAGE_LEN;
use crate::profile::models::PlayerId;

/// Direct message manager
#[derive(Clone)]
pub struct DirectMessageManager {
    repo: Arc<dyn Repository>,
    events: EventHub,
}

impl DirectMessageManager {
    pub fn new(repo: Arc<dyn Repository>, events: EventHub) -> Self {
        Self { repo, events }
    }

    /// Send `text` from `sender` to `receiver`
    pub async fn send(
        &self,
        sender: PlayerId,
        receiver: PlayerId,
        text: &str,
    ) -> DirectMessageResult<DirectMessage> {
        if sender == receiver {
            return Err(DirectMessageError::SelfMessage);
        }
        let text = text.trim();
        if text.is_empty() || text.chars().count() > MAX_MESSAGE_LEN {
            return Err(DirectMessageError::InvalidMessage);
        }
        if self.repo.get_profile(sender).await?.is_none() {
            return Err(DirectMessageError::ProfileRequired);
        }
        self.ensure_player(receiver).await?;

        let message = DirectMessage::new(sender, receiver, text);
        self.repo.insert_direct_message(&message).await?;

        log::debug!("Direct message {} sent {sender} -> {receiver}", message.id);
        self.events.publish_change(
            Topic::DirectMessages,
            ChangeAction::Insert,
            message.id,
            Some(receiver),
            &message,
        );
        Ok(message)
    }

    /// Messages exchanged between `caller` and `peer`, oldest first
    pub async fn conversation(
        &self,
        caller: PlayerId,
        peer: PlayerId,
    ) -> DirectMessageResult<Vec<DirectMessage>> {
        self.ensure_player(peer).await?;
        Ok(self.repo.list_conversation(caller, peer).await?)
    }

    /// Mark every message `peer` sent to `caller` as read.
    ///
    /// Returns how many messages changed.
    pub async fn mark_read(&self, caller: PlayerId, peer: PlayerId) -> DirectMessageResult<u64> {
        self.ensure_player(peer).await?;
        let updated = self.repo.mark_conversation_read(caller, peer).await?;
        if updated > 0 {
            log::debug!("{caller} read {updated} messages from {peer}");
        }
        Ok(updated)
    }

    async fn ensure_player(&self, player_id: PlayerId) -> DirectMessageResult<()> {
        match self.repo.get_profile(player_id).await? {
            Some(_) => Ok(()),
            None => Err(DirectMessageError::PlayerNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRepository;
    use crate::errors::{Classify, ErrorKind};
    use crate::profile::models::Profile;
    use uuid::Uuid;

    async fn manager_with(names: &[&str]) -> (DirectMessageManager, Vec<PlayerId>) {
        let repo = Arc::new(MemoryRepository::new());
        let mut ids = Vec::new();
        for name in names {
            let id = Uuid::new_v4();
            repo.upsert_profile(&Profile::new(id, *name)).await.unwrap();
            ids.push(id);
        }
        (DirectMessageManager::new(repo, EventHub::default()), ids)
    }

    #[tokio::test]
    async fn test_send_validation() {
        let (manager, ids) = manager_with(&["alpha", "bravo"]).await;
        let (a, b) = (ids[0], ids[1]);

        let err = manager.send(a, a, "hi").await.unwrap_err();
        assert!(matches!(err, DirectMessageError::SelfMessage));

        let err = manager.send(a, b, "   ").await.unwrap_err();
        assert!(matches!(err, DirectMessageError::InvalidMessage));

        let long = "x".repeat(MAX_MESSAGE_LEN + 1);
        let err = manager.send(a, b, &long).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = manager.send(a, Uuid::new_v4(), "hi").await.unwrap_err();
        assert!(matches!(err, DirectMessageError::PlayerNotFound));

        let err = manager.send(Uuid::new_v4(), b, "hi").await.unwrap_err();
        assert!(matches!(err, DirectMessageError::ProfileRequired));
    }

    #[tokio::test]
    async fn test_message_is_trimmed() {
        let (manager, ids) = manager_with(&["alpha", "bravo"]).await;
        let dm = manager.send(ids[0], ids[1], "  ready?  ").await.unwrap();
        assert_eq!(dm.message, "ready?");
        assert_eq!(dm.receiver_id, ids[1]);
    }
}
