//! Tournament data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::matches::models::Match;
use crate::profile::models::PlayerId;

/// Tournament ID type
pub type TournamentId = Uuid;

/// Tournament lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Accepting registrations
    Upcoming,
    /// At least one round has been paired
    InProgress,
    /// Finished; prizes may be distributed
    Completed,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Upcoming => "upcoming",
            TournamentStatus::InProgress => "in_progress",
            TournamentStatus::Completed => "completed",
        }
    }
}

impl FromStr for TournamentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(TournamentStatus::Upcoming),
            "in_progress" => Ok(TournamentStatus::InProgress),
            "completed" => Ok(TournamentStatus::Completed),
            other => Err(format!("unknown tournament status '{other}'")),
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub creator_id: PlayerId,
    pub title: String,
    pub description: Option<String>,
    pub game_type: String,
    pub max_participants: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: TournamentStatus,
    /// Total prize pool in whole currency units
    pub prize_pool: i64,
    pub prize_distributed: bool,
    pub tournament_rules: Option<String>,
    pub dispute_resolution_rules: Option<String>,
    pub match_time_limit_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tournament {
    /// Build a new upcoming tournament owned by `creator_id`
    pub fn new(creator_id: PlayerId, details: NewTournament) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            creator_id,
            title: details.title.trim().to_string(),
            description: details.description,
            game_type: details.game_type.trim().to_string(),
            max_participants: details.max_participants,
            start_date: details.start_date,
            end_date: details.end_date,
            status: TournamentStatus::Upcoming,
            prize_pool: details.prize_pool,
            prize_distributed: false,
            tournament_rules: details.tournament_rules,
            dispute_resolution_rules: details.dispute_resolution_rules,
            match_time_limit_minutes: details.match_time_limit_minutes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Tournament creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTournament {
    pub title: String,
    pub description: Option<String>,
    pub game_type: String,
    pub max_participants: u32,
    /// Defaults to the time of creation
    #[serde(default = "Utc::now")]
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prize_pool: i64,
    pub tournament_rules: Option<String>,
    pub dispute_resolution_rules: Option<String>,
    pub match_time_limit_minutes: Option<u32>,
}

impl NewTournament {
    /// Minimal creation request, mostly for tests and tooling
    pub fn new(title: impl Into<String>, game_type: impl Into<String>, max_participants: u32) -> Self {
        Self {
            title: title.into(),
            description: None,
            game_type: game_type.into(),
            max_participants,
            start_date: Utc::now(),
            end_date: None,
            prize_pool: 0,
            tournament_rules: None,
            dispute_resolution_rules: None,
            match_time_limit_minutes: None,
        }
    }

    /// Set the prize pool
    pub fn with_prize_pool(mut self, prize_pool: i64) -> Self {
        self.prize_pool = prize_pool;
        self
    }
}

/// Participant status inside a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    /// Waiting to be paired
    Registered,
    /// Currently assigned to an open match
    InMatch,
    /// Lost a match
    Eliminated,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Registered => "registered",
            ParticipantStatus::InMatch => "in_match",
            ParticipantStatus::Eliminated => "eliminated",
        }
    }
}

impl FromStr for ParticipantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(ParticipantStatus::Registered),
            "in_match" => Ok(ParticipantStatus::InMatch),
            "eliminated" => Ok(ParticipantStatus::Eliminated),
            other => Err(format!("unknown participant status '{other}'")),
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tournament registration entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub status: ParticipantStatus,
    pub wins: u32,
    pub losses: u32,
    pub points: u32,
    pub registration_date: DateTime<Utc>,
}

impl Participant {
    /// Fresh registration with zeroed standings
    pub fn new(tournament_id: TournamentId, player_id: PlayerId) -> Self {
        Self {
            tournament_id,
            player_id,
            status: ParticipantStatus::Registered,
            wins: 0,
            losses: 0,
            points: 0,
            registration_date: Utc::now(),
        }
    }

    /// Completed matches
    pub fn matches_played(&self) -> u32 {
        self.wins + self.losses
    }
}

/// Prize tier: the share of the pool paid to a finishing position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeTier {
    /// 1-based finishing position
    pub position: u32,
    /// Whole-number percentage of the prize pool
    pub percentage: u32,
}

impl PrizeTier {
    pub fn new(position: u32, percentage: u32) -> Self {
        Self {
            position,
            percentage,
        }
    }
}

/// Recorded prize payout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub position: u32,
    pub percentage: u32,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// 1-based rank
    pub rank: u32,
    pub player_id: PlayerId,
    pub username: Option<String>,
    pub status: ParticipantStatus,
    pub wins: u32,
    pub losses: u32,
    pub points: u32,
    pub matches_played: u32,
    /// Rounded win percentage (0 when no matches were played)
    pub win_rate: u32,
}

/// Outcome of one pairing run
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    pub tournament_id: TournamentId,
    pub round: u32,
    pub matches: Vec<Match>,
    /// Participant left unpaired this round (still registered)
    pub bye: Option<PlayerId>,
}

/// Outcome of a prize distribution
#[derive(Debug, Clone, Serialize)]
pub struct DistributionReport {
    pub tournament_id: TournamentId,
    pub payouts: Vec<Payout>,
    /// Tier positions with no participant at that rank
    pub skipped_positions: Vec<u32>,
    /// Part of the pool not paid out (skipped tiers and rounding)
    pub undistributed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            TournamentStatus::Upcoming,
            TournamentStatus::InProgress,
            TournamentStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<TournamentStatus>(), Ok(status));
        }
        assert!("ongoing".parse::<TournamentStatus>().is_err());
    }

    #[test]
    fn test_participant_status_text() {
        assert_eq!(ParticipantStatus::InMatch.to_string(), "in_match");
        assert_eq!(
            "eliminated".parse::<ParticipantStatus>(),
            Ok(ParticipantStatus::Eliminated)
        );
    }

    #[test]
    fn test_new_tournament_is_upcoming() {
        let creator = Uuid::new_v4();
        let t = Tournament::new(
            creator,
            NewTournament::new("  Spring Cup ", "fifa", 8).with_prize_pool(500),
        );
        assert_eq!(t.status, TournamentStatus::Upcoming);
        assert_eq!(t.title, "Spring Cup");
        assert_eq!(t.prize_pool, 500);
        assert!(!t.prize_distributed);
        assert_eq!(t.creator_id, creator);
    }

    #[test]
    fn test_matches_played() {
        let mut p = Participant::new(Uuid::new_v4(), Uuid::new_v4());
        p.wins = 2;
        p.losses = 1;
        assert_eq!(p.matches_played(), 3);
    }
}
