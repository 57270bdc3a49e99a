//! Player profile models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Player ID type (the identity provider's subject id)
pub type PlayerId = Uuid;

/// Skill rating assigned to new profiles
pub const DEFAULT_SKILL_RATING: i32 = 1000;

/// Minimum username length
pub const MIN_USERNAME_LEN: usize = 3;

/// Maximum username length
pub const MAX_USERNAME_LEN: usize = 32;

/// Player profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: PlayerId,
    pub username: String,
    pub avatar_url: Option<String>,
    /// In-game identifier revealed to opponents when a match is paired
    pub game_id: Option<String>,
    pub skill_rating: i32,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Create a non-admin profile with the default skill rating
    pub fn new(id: PlayerId, username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            username: username.into(),
            avatar_url: None,
            game_id: None,
            skill_rating: DEFAULT_SKILL_RATING,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the in-game identifier
    pub fn with_game_id(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = Some(game_id.into());
        self
    }

    /// Set the skill rating
    pub fn with_skill_rating(mut self, skill_rating: i32) -> Self {
        self.skill_rating = skill_rating;
        self
    }

    /// Grant administrator rights
    pub fn as_admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// Profile registration request
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterProfile {
    pub username: String,
    pub game_id: Option<String>,
    pub avatar_url: Option<String>,
}

/// Partial profile update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub game_id: Option<String>,
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_profile_defaults() {
        let profile = Profile::new(Uuid::new_v4(), "ace_player");
        assert_eq!(profile.skill_rating, DEFAULT_SKILL_RATING);
        assert!(!profile.is_admin);
        assert!(profile.game_id.is_none());
    }

    #[test]
    fn test_builder_helpers() {
        let profile = Profile::new(Uuid::new_v4(), "ref")
            .with_game_id("REF#001")
            .with_skill_rating(1450)
            .as_admin();
        assert_eq!(profile.game_id.as_deref(), Some("REF#001"));
        assert_eq!(profile.skill_rating, 1450);
        assert!(profile.is_admin);
    }
}
