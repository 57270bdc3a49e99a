//! Player profile handlers.
//!
//! The player id always comes from the token; a profile must be registered
//! before the player can create or join tournaments.
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/profiles \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"username": "night_owl", "game_id": "OWL#4412"}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tourney::profile::{PlayerId, Profile, ProfileUpdate, RegisterProfile};

use super::{AppState, errors::ApiError, middleware::Caller};

#[derive(Debug, Deserialize)]
pub struct SkillRatingRequest {
    pub skill_rating: i32,
}

/// Register the caller's profile. Repeating the call returns the existing
/// profile unchanged.
///
/// # Errors
///
/// - `400 Bad Request`: Username shorter than 3 or longer than 32 characters,
///   or containing characters other than letters, digits and `_`
/// - `409 Conflict`: Username taken by another player
pub async fn register(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Json(request): Json<RegisterProfile>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.profiles.register(player_id, request).await?))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<PlayerId>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.profiles.get(id).await?))
}

pub async fn update_me(
    State(state): State<AppState>,
    Caller(player_id): Caller,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.profiles.update(player_id, update).await?))
}

/// Override a player's skill rating. Administrators only.
pub async fn set_skill_rating(
    State(state): State<AppState>,
    Caller(admin_id): Caller,
    Path(id): Path<PlayerId>,
    Json(request): Json<SkillRatingRequest>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state
        .profiles
        .set_skill_rating(admin_id, id, request.skill_rating)
        .await?;
    Ok(Json(profile))
}
