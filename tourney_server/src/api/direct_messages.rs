//! Direct message handlers.
//!
//! Conversations are addressed by the other player's id; the caller is
//! always the player in the token.
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/direct-messages \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"receiver_id": "8d2f...", "message": "rematch tonight?"}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tourney::direct_message::{DirectMessage, NewDirectMessage};
use tourney::profile::PlayerId;

use super::{AppState, errors::ApiError, middleware::Caller};
use crate::metrics;

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: u64,
}

/// Send a direct message.
///
/// # Errors
///
/// - `400 Bad Request`: Empty or oversized message, message to self, or
///   the caller has no profile
/// - `404 Not Found`: Receiver has no profile
pub async fn send(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Json(request): Json<NewDirectMessage>,
) -> Result<(StatusCode, Json<DirectMessage>), ApiError> {
    let message = state
        .direct_messages
        .send(player_id, request.receiver_id, &request.message)
        .await?;
    metrics::direct_message_sent();
    Ok((StatusCode::CREATED, Json(message)))
}

/// Conversation with one player, oldest first.
pub async fn conversation(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(peer_id): Path<PlayerId>,
) -> Result<Json<Vec<DirectMessage>>, ApiError> {
    Ok(Json(
        state.direct_messages.conversation(player_id, peer_id).await?,
    ))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(peer_id): Path<PlayerId>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let updated = state.direct_messages.mark_read(player_id, peer_id).await?;
    Ok(Json(MarkReadResponse { updated }))
}
