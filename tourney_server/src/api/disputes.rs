//! Dispute API handlers.
//!
//! Players file disputes against their opponent in a match and can follow
//! the case through its message thread. Review and resolution are
//! administrator actions; `admin_notes` is only returned to administrators.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tourney::db::DisputeFilter;
use tourney::dispute::{
    Dispute, DisputeId, DisputeMessage, DisputeStatus, NewDispute, Resolution,
};
use tourney::matches::MatchId;

use super::{AppState, errors::ApiError, middleware::Caller};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct ListDisputesQuery {
    pub status: Option<DisputeStatus>,
    pub match_id: Option<MatchId>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub message: String,
}

/// File a dispute about a match the caller played in.
///
/// # Errors
///
/// - `403 Forbidden`: Caller does not play in the match
/// - `409 Conflict`: Caller already has an open dispute for this match
pub async fn raise(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(match_id): Path<MatchId>,
    Json(request): Json<NewDispute>,
) -> Result<(StatusCode, Json<Dispute>), ApiError> {
    let kind = request.kind;
    let dispute = state.disputes.raise(match_id, player_id, request).await?;
    metrics::dispute_raised(kind.as_str());
    Ok((StatusCode::CREATED, Json(dispute)))
}

/// Disputes visible to the caller: all of them for administrators, the
/// caller's own cases otherwise.
pub async fn list(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Query(query): Query<ListDisputesQuery>,
) -> Result<Json<Vec<Dispute>>, ApiError> {
    let filter = DisputeFilter {
        match_id: query.match_id,
        status: query.status,
        ..DisputeFilter::default()
    };
    Ok(Json(state.disputes.list(player_id, filter).await?))
}

pub async fn get_dispute(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<DisputeId>,
) -> Result<Json<Dispute>, ApiError> {
    Ok(Json(state.disputes.get(id, player_id).await?))
}

pub async fn review(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<DisputeId>,
) -> Result<Json<Dispute>, ApiError> {
    Ok(Json(state.disputes.review(id, player_id).await?))
}

/// Close a dispute as upheld, rejected or compromised.
pub async fn resolve(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<DisputeId>,
    Json(request): Json<Resolution>,
) -> Result<Json<Dispute>, ApiError> {
    Ok(Json(state.disputes.resolve(id, player_id, request).await?))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<DisputeId>,
) -> Result<Json<Vec<DisputeMessage>>, ApiError> {
    Ok(Json(state.disputes.messages(id, player_id).await?))
}

pub async fn post_message(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<DisputeId>,
    Json(request): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<DisputeMessage>), ApiError> {
    let message = state
        .disputes
        .post_message(id, player_id, &request.message)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
