//! WebSocket change feed and presence.
//!
//! A client subscribes to one topic, optionally narrowed to one record (or
//! the children of one record), and receives every committed change as it
//! happens. While the socket is open the player counts as online.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws?token=<jwt>&topic=<topic>[&key=<uuid>]`
//! 2. Server validates the JWT and that the caller may read the topic
//! 3. Server spawns a send task forwarding matching events and replies
//! 4. The receive loop handles client messages until the socket closes
//!
//! `chat_messages` needs `key` set to a match the caller plays in, and
//! `disputes` needs `key` set to a dispute the caller is part of.
//! Administrators may omit the key on both. `direct_messages` always
//! delivers the caller's own inbox; a `key` other than the caller's id is
//! refused.
//!
//! # Client Messages
//!
//! - `{"type": "ping"}` answered with `{"type": "pong"}`
//! - `{"type": "chat", "match_id": "...", "message": "gg"}` posts to match chat
//! - `{"type": "direct_message", "receiver_id": "...", "message": "hi"}` sends a DM
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8080/ws?token=eyJhbGc...&topic=matches&key=' + tournamentId);
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.type === 'event') {
//!     refresh(data.topic, data.key, data.payload);
//!   }
//! };
//! ```

use axum::{
    Json,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tourney::errors::Classify;
use tourney::matches::MatchId;
use tourney::profile::PlayerId;
use tourney::{ChangeEvent, EventFilter, Topic};
use uuid::Uuid;

use super::{
    AppState,
    errors::ApiError,
    middleware::{Caller, authenticate_token},
    rate_limiter::ConnectionLimiter,
};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: String,
    topic: String,
    key: Option<Uuid>,
}

/// Client messages received via WebSocket
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Ping,
    /// Post to a match chat the caller has access to
    Chat { match_id: MatchId, message: String },
    /// Send a direct message to another player
    DirectMessage {
        receiver_id: PlayerId,
        message: String,
    },
}

/// Messages sent to the client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    Event(ChangeEvent),
    Pong,
    Success { message: String },
    Error { message: String },
}

#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    pub online: Vec<PlayerId>,
}

/// Players with at least one open WebSocket connection.
pub async fn presence(State(state): State<AppState>, _caller: Caller) -> Json<PresenceResponse> {
    Json(PresenceResponse {
        online: state.events.online_players(),
    })
}

/// Upgrade to a WebSocket subscribed to one topic.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing, expired or invalid token
/// - `400 Bad Request`: Unknown topic, or a private topic without `key`
/// - `403 Forbidden`: Caller may not read the requested match chat, dispute
///   or inbox
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let (player_id, filter) = match authorize(&state, &query).await {
        Ok(authorized) => authorized,
        Err(e) => return e.into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, player_id, filter, state))
}

/// Authenticate the caller and resolve the filter they may subscribe with.
async fn authorize(state: &AppState, query: &WsQuery) -> Result<(PlayerId, EventFilter), ApiError> {
    let Caller(player_id) = authenticate_token(state, &query.token)?;
    let topic: Topic = query.topic.parse().map_err(ApiError::bad_request)?;

    if topic == Topic::DirectMessages {
        if query.key.is_some_and(|key| key != player_id) {
            return Err(ApiError::forbidden("direct messages are private"));
        }
        return Ok((player_id, EventFilter::topic(topic).with_key(player_id)));
    }

    match (topic, query.key) {
        (Topic::ChatMessages, Some(match_id)) => {
            state.matches.messages(match_id, player_id).await?;
        }
        (Topic::Disputes, Some(dispute_id)) => {
            state.disputes.get(dispute_id, player_id).await?;
        }
        (Topic::ChatMessages | Topic::Disputes, None) => {
            if !state.profiles.is_admin(player_id).await? {
                return Err(ApiError::bad_request(format!(
                    "topic '{topic}' requires a key"
                )));
            }
        }
        _ => {}
    }

    let filter = EventFilter::topic(topic);
    let filter = match query.key {
        Some(key) => filter.with_key(key),
        None => filter,
    };
    Ok((player_id, filter))
}

/// Handle an established WebSocket connection.
///
/// The send task forwards matching events and replies to client messages;
/// the receive loop runs until the client disconnects. The presence guard
/// keeps the player online for the lifetime of the connection.
async fn handle_socket(socket: WebSocket, player_id: PlayerId, filter: EventFilter, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let topic = filter.topic.map(|t| t.as_str()).unwrap_or("all");

    tracing::info!(%player_id, topic, "WebSocket connected");
    metrics::websocket_connected();
    let _presence = state.events.track_presence(player_id);

    let mut limiter = ConnectionLimiter::default();

    let (response_tx, mut response_rx) = tokio::sync::mpsc::channel::<ServerMessage>(32);
    let mut subscription = state.events.subscribe(filter);

    let send_task = tokio::spawn(async move {
        loop {
            let outgoing = tokio::select! {
                event = subscription.recv() => match event {
                    Some(event) => {
                        metrics::websocket_events_sent(event.topic.as_str());
                        ServerMessage::Event(event)
                    }
                    None => break,
                },
                Some(response) = response_rx.recv() => response,
            };

            let json = match serde_json::to_string(&outgoing) {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize WebSocket message");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let response = match limiter.admit() {
                    Err(throttled) => {
                        tracing::warn!(%player_id, ?throttled, "WebSocket rate limit exceeded, dropping message");
                        ServerMessage::Error {
                            message: throttled.message().to_string(),
                        }
                    }
                    Ok(()) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(client_msg) => handle_client_message(client_msg, player_id, &state).await,
                        Err(e) => {
                            tracing::debug!(error = %e, "Unparseable client message");
                            ServerMessage::Error {
                                message: "Invalid message format".to_string(),
                            }
                        }
                    },
                };

                if response_tx.send(response).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    metrics::websocket_disconnected();
    tracing::info!(%player_id, topic, "WebSocket disconnected");
}

async fn handle_client_message(
    msg: ClientMessage,
    player_id: PlayerId,
    state: &AppState,
) -> ServerMessage {
    match msg {
        ClientMessage::Ping => ServerMessage::Pong,
        ClientMessage::Chat { match_id, message } => {
            match state.matches.post_message(match_id, player_id, &message).await {
                Ok(_) => ServerMessage::Success {
                    message: "Message posted".to_string(),
                },
                Err(e) => ServerMessage::Error {
                    message: e.client_message(),
                },
            }
        }
        ClientMessage::DirectMessage {
            receiver_id,
            message,
        } => match state
            .direct_messages
            .send(player_id, receiver_id, &message)
            .await
        {
            Ok(_) => {
                metrics::direct_message_sent();
                ServerMessage::Success {
                    message: "Message sent".to_string(),
                }
            }
            Err(e) => ServerMessage::Error {
                message: e.client_message(),
            },
        },
    }
}
