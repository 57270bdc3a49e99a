//! Change-event fan-out and presence tracking.
//!
//! Managers publish a [`ChangeEvent`] after every successful write.
//! Connections subscribe with an [`EventFilter`]; a subscriber that falls
//! behind skips the events it missed instead of slowing publishers down.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::profile::models::PlayerId;

/// Default broadcast buffer size
pub const DEFAULT_EVENT_BUFFER: usize = 1024;

/// Kind of record an event is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Tournaments,
    Participants,
    Matches,
    ChatMessages,
    Disputes,
    DirectMessages,
    Presence,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Tournaments => "tournaments",
            Topic::Participants => "participants",
            Topic::Matches => "matches",
            Topic::ChatMessages => "chat_messages",
            Topic::Disputes => "disputes",
            Topic::DirectMessages => "direct_messages",
            Topic::Presence => "presence",
        }
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tournaments" => Ok(Topic::Tournaments),
            "participants" => Ok(Topic::Participants),
            "matches" => Ok(Topic::Matches),
            "chat_messages" => Ok(Topic::ChatMessages),
            "disputes" => Ok(Topic::Disputes),
            "direct_messages" => Ok(Topic::DirectMessages),
            "presence" => Ok(Topic::Presence),
            other => Err(format!("unknown topic '{other}'")),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

/// A committed change
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub topic: Topic,
    pub action: ChangeAction,
    /// Primary key of the changed record
    pub key: Uuid,
    /// Parent record (tournament of a match, match of a chat message, ...)
    pub scope: Option<Uuid>,
    /// Record snapshot after the change
    pub payload: serde_json::Value,
    pub at: DateTime<Utc>,
}

/// Subscription filter; `None` fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub topic: Option<Topic>,
    /// Matches either the record key or its scope
    pub key: Option<Uuid>,
    pub actions: Option<Vec<ChangeAction>>,
}

impl EventFilter {
    /// Everything on one topic
    pub fn topic(topic: Topic) -> Self {
        Self {
            topic: Some(topic),
            ..Self::default()
        }
    }

    /// Restrict to one record or its children
    pub fn with_key(mut self, key: Uuid) -> Self {
        self.key = Some(key);
        self
    }

    /// Restrict to the given actions
    pub fn with_actions(mut self, actions: impl Into<Vec<ChangeAction>>) -> Self {
        self.actions = Some(actions.into());
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.topic.is_none_or(|t| t == event.topic)
            && self
                .key
                .is_none_or(|k| k == event.key || event.scope == Some(k))
            && self
                .actions
                .as_ref()
                .is_none_or(|actions| actions.contains(&event.action))
    }
}

/// Filtered view of the event stream
pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    filter: EventFilter,
}

impl Subscription {
    /// Next matching event, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Subscriber lagged behind, skipped {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

type PresenceMap = Arc<Mutex<HashMap<PlayerId, usize>>>;

/// Process-wide change feed and presence registry
#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<ChangeEvent>,
    presence: PresenceMap,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

impl EventHub {
    /// Create a hub buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            presence: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Publish an event; having no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.sender.send(event);
    }

    /// Snapshot `record` and publish it
    pub fn publish_change<T: Serialize>(
        &self,
        topic: Topic,
        action: ChangeAction,
        key: Uuid,
        scope: Option<Uuid>,
        record: &T,
    ) {
        match serde_json::to_value(record) {
            Ok(payload) => self.publish(ChangeEvent {
                topic,
                action,
                key,
                scope,
                payload,
                at: Utc::now(),
            }),
            Err(e) => log::error!("Failed to serialize {topic} event for {key}: {e}"),
        }
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn presence(&self) -> MutexGuard<'_, HashMap<PlayerId, usize>> {
        self.presence
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark `player_id` online until the returned guard is dropped.
    ///
    /// A player with several connections stays online until the last one
    /// closes.
    pub fn track_presence(&self, player_id: PlayerId) -> PresenceGuard {
        let first = {
            let mut presence = self.presence();
            let count = presence.entry(player_id).or_insert(0);
            *count += 1;
            *count == 1
        };
        if first {
            self.publish_presence(player_id, ChangeAction::Insert);
        }
        PresenceGuard {
            hub: self.clone(),
            player_id,
        }
    }

    pub fn is_online(&self, player_id: PlayerId) -> bool {
        self.presence().contains_key(&player_id)
    }

    pub fn online_players(&self) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self.presence().keys().copied().collect();
        players.sort();
        players
    }

    fn release(&self, player_id: PlayerId) {
        let last = {
            let mut presence = self.presence();
            match presence.get_mut(&player_id) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                Some(_) => {
                    presence.remove(&player_id);
                    true
                }
                None => false,
            }
        };
        if last {
            self.publish_presence(player_id, ChangeAction::Delete);
        }
    }

    fn publish_presence(&self, player_id: PlayerId, action: ChangeAction) {
        self.publish(ChangeEvent {
            topic: Topic::Presence,
            action,
            key: player_id,
            scope: None,
            payload: serde_json::json!({ "player_id": player_id }),
            at: Utc::now(),
        });
    }
}

/// Keeps a player marked online while alive
pub struct PresenceGuard {
    hub: EventHub,
    player_id: PlayerId,
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        self.hub.release(self.player_id);
    }
}
