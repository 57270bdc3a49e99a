//! Profile manager.

use chrono::Utc;
use std::sync::Arc;

use super::errors::{ProfileError, ProfileResult};
use super::models::{
    MAX_USERNAME_LEN, MIN_USERNAME_LEN, PlayerId, Profile, ProfileUpdate, RegisterProfile,
};
use crate::db::{Repository, StoreError};

/// Longest accepted game id or avatar URL
const MAX_FIELD_LEN: usize = 255;

/// Validate and normalize a username
pub fn validate_username(username: &str) -> ProfileResult<String> {
    let username = username.trim();
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(ProfileError::InvalidUsername(format!(
            "must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ProfileError::InvalidUsername(
            "only letters, digits and underscores are allowed".to_string(),
        ));
    }
    Ok(username.to_string())
}

/// Trim an optional text field; blank becomes `None`
fn normalize_optional(field: &str, value: Option<String>) -> ProfileResult<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value.chars().count() > MAX_FIELD_LEN {
        return Err(ProfileError::InvalidInput(format!(
            "{field} must be at most {MAX_FIELD_LEN} characters"
        )));
    }
    Ok(Some(value.to_string()))
}

/// Player profile operations
#[derive(Clone)]
pub struct ProfileManager {
    repo: Arc<dyn Repository>,
}

impl ProfileManager {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Create the caller's profile.
    ///
    /// Registering again returns the existing profile unchanged.
    pub async fn register(
        &self,
        player_id: PlayerId,
        request: RegisterProfile,
    ) -> ProfileResult<Profile> {
        if let Some(existing) = self.repo.get_profile(player_id).await? {
            return Ok(existing);
        }

        let username = validate_username(&request.username)?;
        self.ensure_username_free(player_id, &username).await?;

        let mut profile = Profile::new(player_id, username);
        profile.game_id = normalize_optional("game_id", request.game_id)?;
        profile.avatar_url = normalize_optional("avatar_url", request.avatar_url)?;

        self.repo
            .upsert_profile(&profile)
            .await
            .map_err(username_conflict)?;
        log::info!("Registered profile {} ({})", profile.username, profile.id);
        Ok(profile)
    }

    pub async fn get(&self, player_id: PlayerId) -> ProfileResult<Profile> {
        self.repo
            .get_profile(player_id)
            .await?
            .ok_or(ProfileError::NotFound)
    }

    /// Whether `player_id` has a profile flagged as administrator
    pub async fn is_admin(&self, player_id: PlayerId) -> ProfileResult<bool> {
        Ok(self
            .repo
            .get_profile(player_id)
            .await?
            .is_some_and(|p| p.is_admin))
    }

    /// Update the caller's own profile
    pub async fn update(
        &self,
        player_id: PlayerId,
        update: ProfileUpdate,
    ) -> ProfileResult<Profile> {
        let mut profile = self.get(player_id).await?;

        if let Some(username) = update.username {
            let username = validate_username(&username)?;
            if !username.eq_ignore_ascii_case(&profile.username) {
                self.ensure_username_free(player_id, &username).await?;
            }
            profile.username = username;
        }
        if update.game_id.is_some() {
            profile.game_id = normalize_optional("game_id", update.game_id)?;
        }
        if update.avatar_url.is_some() {
            profile.avatar_url = normalize_optional("avatar_url", update.avatar_url)?;
        }
        profile.updated_at = Utc::now();

        self.repo
            .upsert_profile(&profile)
            .await
            .map_err(username_conflict)?;
        Ok(profile)
    }

    /// Administrator override of a player's skill rating
    pub async fn set_skill_rating(
        &self,
        admin_id: PlayerId,
        player_id: PlayerId,
        skill_rating: i32,
    ) -> ProfileResult<Profile> {
        if !self.is_admin(admin_id).await? {
            log::warn!("Player {admin_id} tried to change the rating of {player_id}");
            return Err(ProfileError::AdminRequired);
        }
        if skill_rating < 0 {
            return Err(ProfileError::InvalidInput(
                "skill rating must not be negative".to_string(),
            ));
        }

        let mut profile = self.get(player_id).await?;
        profile.skill_rating = skill_rating;
        profile.updated_at = Utc::now();
        self.repo.upsert_profile(&profile).await?;
        log::info!("Skill rating of {player_id} set to {skill_rating} by {admin_id}");
        Ok(profile)
    }

    async fn ensure_username_free(&self, player_id: PlayerId, username: &str) -> ProfileResult<()> {
        match self.repo.find_profile_by_username(username).await? {
            Some(other) if other.id != player_id => Err(ProfileError::UsernameTaken),
            _ => Ok(()),
        }
    }
}

/// A unique-index race on the username surfaces as a store conflict
fn username_conflict(err: StoreError) -> ProfileError {
    match err {
        StoreError::Conflict(_) => ProfileError::UsernameTaken,
        other => ProfileError::Store(other),
    }
}
