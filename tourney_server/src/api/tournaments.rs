//! Tournament API handlers.
//!
//! Reads are public. Creating, joining and withdrawing need a registered
//! profile; pairing, completion and prize management are restricted to the
//! organizer or an administrator.
//!
//! # Examples
//!
//! Generate the next round:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments/$ID/rounds \
//!   -H "Authorization: Bearer TOKEN"
//! ```
//!
//! Set prize tiers:
//! ```bash
//! curl -X PUT http://localhost:8080/api/v1/tournaments/$ID/prize-tiers \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"tiers": [{"position": 1, "percentage": 50}, {"position": 2, "percentage": 30}, {"position": 3, "percentage": 20}]}'
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tourney::matches::Match;
use tourney::tournament::{
    DistributionReport, NewTournament, Participant, Payout, PrizeTier, RoundReport, Standing,
    Tournament, TournamentId, TournamentStatus,
};

use super::{AppState, errors::ApiError, middleware::Caller};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct ListTournamentsQuery {
    pub status: Option<TournamentStatus>,
}

#[derive(Debug, Deserialize)]
pub struct SetPrizeTiersRequest {
    pub tiers: Vec<PrizeTier>,
}

/// List tournaments, optionally filtered by `?status=`.
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(query): Query<ListTournamentsQuery>,
) -> Result<Json<Vec<Tournament>>, ApiError> {
    Ok(Json(state.tournaments.list(query.status).await?))
}

/// Create a tournament owned by the caller.
///
/// # Response
///
/// Returns `201 Created` with the new tournament in status `upcoming`.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid fields, or the caller has no profile yet
pub async fn create_tournament(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Json(request): Json<NewTournament>,
) -> Result<(StatusCode, Json<Tournament>), ApiError> {
    let tournament = state.tournaments.create(player_id, request).await?;
    Ok((StatusCode::CREATED, Json(tournament)))
}

pub async fn get_tournament(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> Result<Json<Tournament>, ApiError> {
    Ok(Json(state.tournaments.get(id).await?))
}

pub async fn list_participants(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    Ok(Json(state.tournaments.participants(id).await?))
}

/// Leaderboard ordered by points, then wins, then fewest losses.
pub async fn standings(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> Result<Json<Vec<Standing>>, ApiError> {
    Ok(Json(state.tournaments.standings(id).await?))
}

pub async fn list_matches(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> Result<Json<Vec<Match>>, ApiError> {
    Ok(Json(state.tournaments.matches(id).await?))
}

/// Register the caller for an upcoming tournament.
///
/// # Errors
///
/// - `409 Conflict`: Already registered, tournament full or not upcoming
pub async fn join(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<TournamentId>,
) -> Result<(StatusCode, Json<Participant>), ApiError> {
    let participant = state.tournaments.join(id, player_id).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

pub async fn withdraw(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<TournamentId>,
) -> Result<StatusCode, ApiError> {
    state.tournaments.withdraw(id, player_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pair every registered participant into the next round.
///
/// The first round moves the tournament from `upcoming` to `in_progress`.
///
/// # Response
///
/// Returns `201 Created` with the round number, the new matches and the
/// participant that received a bye, if any.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is neither organizer nor administrator
/// - `400 Bad Request`: Fewer than two participants registered
/// - `409 Conflict`: Fewer than two players waiting in a running tournament
pub async fn generate_round(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<TournamentId>,
) -> Result<(StatusCode, Json<RoundReport>), ApiError> {
    let report = state.tournaments.generate_round(id, player_id).await?;
    metrics::round_generated(report.matches.len());
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn complete(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<TournamentId>,
) -> Result<Json<Tournament>, ApiError> {
    Ok(Json(state.tournaments.complete(id, player_id).await?))
}

pub async fn prize_tiers(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> Result<Json<Vec<PrizeTier>>, ApiError> {
    Ok(Json(state.tournaments.prize_tiers(id).await?))
}

/// Replace the prize tiers; percentages must sum to exactly 100.
pub async fn set_prize_tiers(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<TournamentId>,
    Json(request): Json<SetPrizeTiersRequest>,
) -> Result<Json<Vec<PrizeTier>>, ApiError> {
    let tiers = state
        .tournaments
        .set_prize_tiers(id, player_id, request.tiers)
        .await?;
    Ok(Json(tiers))
}

/// Pay out the prize pool of a completed tournament.
///
/// # Errors
///
/// - `409 Conflict`: Prizes already distributed, tournament not completed,
///   or no prize tiers configured
pub async fn distribute_prizes(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Path(id): Path<TournamentId>,
) -> Result<Json<DistributionReport>, ApiError> {
    let report = state.tournaments.distribute_prizes(id, player_id).await?;
    metrics::payouts_recorded(
        report.payouts.len(),
        report.payouts.iter().map(|p| p.amount).sum(),
    );
    Ok(Json(report))
}

pub async fn payouts(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> Result<Json<Vec<Payout>>, ApiError> {
    Ok(Json(state.tournaments.payouts(id).await?))
}
