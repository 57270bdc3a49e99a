//! Match API handlers: lifecycle, score submission and match chat.
//!
//! Score bodies accept either JSON numbers or strings for each score, so
//! form-driven clients can forward raw input:
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/matches/$ID/score \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"score_player1": "3", "score_player2": 1}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tourney::errors::Classify;
use tourney::matches::{ChatMessage, Match, MatchId};

use super::{AppState, errors::ApiError, middleware::Caller};
use crate::metrics;

/// One score as sent by the client
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScoreField {
    Number(i64),
    Text(String),
}

impl ScoreField {
    fn into_text(self) -> String {
        match self {
            ScoreField::Number(n) => n.to_string(),
            ScoreField::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitScoreRequest {
    pub score_player1: ScoreField,
    pub score_player2: ScoreField,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub message: String,
}

pub async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<MatchId>,
) -> Result<Json<Match>, ApiError> {
    Ok(Json(state.matches.get(id).await?))
}

/// Mark a pending match as in progress. Participants only.
pub async fn start(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<MatchId>,
) -> Result<Json<Match>, ApiError> {
    Ok(Json(state.matches.start(id, player_id).await?))
}

/// Submit the final score of a match.
///
/// The higher score wins; the winner returns to the pairing pool and the
/// loser is eliminated. Only the first submission for a match is accepted.
///
/// # Errors
///
/// - `400 Bad Request`: Negative or non-numeric score, or a tie
/// - `403 Forbidden`: Caller does not play in the match
/// - `409 Conflict`: Match already completed or cancelled
pub async fn submit_score(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<MatchId>,
    Json(request): Json<SubmitScoreRequest>,
) -> Result<Json<Match>, ApiError> {
    let result = state
        .matches
        .submit_score_text(
            id,
            player_id,
            &request.score_player1.into_text(),
            &request.score_player2.into_text(),
        )
        .await;

    match result {
        Ok(m) => {
            metrics::score_submitted("accepted");
            Ok(Json(m))
        }
        Err(e) => {
            metrics::score_submitted(e.kind().as_str());
            Err(e.into())
        }
    }
}

/// Cancel an open match; both players return to the pairing pool.
pub async fn cancel(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<MatchId>,
) -> Result<Json<Match>, ApiError> {
    Ok(Json(state.matches.cancel(id, player_id).await?))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<MatchId>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(state.matches.messages(id, player_id).await?))
}

pub async fn post_message(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<MatchId>,
    Json(request): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    let message = state
        .matches
        .post_message(id, player_id, &request.message)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_fields_accept_numbers_and_strings() {
        let request: SubmitScoreRequest =
            serde_json::from_str(r#"{"score_player1": "3", "score_player2": 1}"#).unwrap();
        assert_eq!(request.score_player1.into_text(), "3");
        assert_eq!(request.score_player2.into_text(), "1");
    }

    #[test]
    fn test_negative_number_is_forwarded_for_rejection() {
        let field: ScoreField = serde_json::from_str("-2").unwrap();
        assert_eq!(field.into_text(), "-2");
    }
}
