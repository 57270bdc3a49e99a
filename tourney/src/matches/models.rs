//! Match and match-chat models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::errors::{MatchError, MatchResult};
use crate::profile::models::PlayerId;
use crate::tournament::models::TournamentId;

/// Match ID type
pub type MatchId = Uuid;

/// Chat message ID type
pub type MessageId = Uuid;

/// Maximum chat message length in characters
pub const MAX_MESSAGE_LEN: usize = 1000;

/// Highest score a player can report; scores are stored as 32-bit integers
pub const MAX_SCORE: u32 = i32::MAX as u32;

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl MatchStatus {
    /// Statuses that still accept scores
    pub const OPEN: [MatchStatus; 2] = [MatchStatus::Pending, MatchStatus::InProgress];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Completed => "completed",
            MatchStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the match can still be played or scored
    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "in_progress" => Ok(MatchStatus::InProgress),
            "completed" => Ok(MatchStatus::Completed),
            "cancelled" => Ok(MatchStatus::Cancelled),
            other => Err(format!("unknown match status '{other}'")),
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single 1v1 contest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub player1_id: PlayerId,
    pub player2_id: PlayerId,
    pub round: u32,
    pub score_player1: Option<u32>,
    pub score_player2: Option<u32>,
    pub winner_id: Option<PlayerId>,
    pub status: MatchStatus,
    pub match_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    /// New pending match scheduled now
    pub fn scheduled(
        tournament_id: TournamentId,
        player1_id: PlayerId,
        player2_id: PlayerId,
        round: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            player1_id,
            player2_id,
            round,
            score_player1: None,
            score_player2: None,
            winner_id: None,
            status: MatchStatus::Pending,
            match_date: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `player_id` is one of the two contestants
    pub fn involves(&self, player_id: PlayerId) -> bool {
        self.player1_id == player_id || self.player2_id == player_id
    }

    /// The other contestant, if `player_id` plays in this match
    pub fn opponent_of(&self, player_id: PlayerId) -> Option<PlayerId> {
        if self.player1_id == player_id {
            Some(self.player2_id)
        } else if self.player2_id == player_id {
            Some(self.player1_id)
        } else {
            None
        }
    }
}

/// Validated pair of scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score_player1: u32,
    pub score_player2: u32,
}

impl ScoreReport {
    pub fn new(score_player1: u32, score_player2: u32) -> Self {
        Self {
            score_player1,
            score_player2,
        }
    }

    /// Parse user-entered scores; both must be non-negative integers.
    pub fn parse(score_player1: &str, score_player2: &str) -> MatchResult<Self> {
        Ok(Self {
            score_player1: parse_score(score_player1)?,
            score_player2: parse_score(score_player2)?,
        })
    }

    /// Reject scores above [`MAX_SCORE`].
    pub fn check_range(&self) -> MatchResult<()> {
        for score in [self.score_player1, self.score_player2] {
            if score > MAX_SCORE {
                return Err(MatchError::InvalidScore(score.to_string()));
            }
        }
        Ok(())
    }

    /// Winner of `m` under these scores; ties have no winner.
    pub fn winner(&self, m: &Match) -> Option<PlayerId> {
        use std::cmp::Ordering;
        match self.score_player1.cmp(&self.score_player2) {
            Ordering::Greater => Some(m.player1_id),
            Ordering::Less => Some(m.player2_id),
            Ordering::Equal => None,
        }
    }
}

fn parse_score(input: &str) -> MatchResult<u32> {
    input
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|score| *score <= MAX_SCORE)
        .ok_or_else(|| MatchError::InvalidScore(input.to_string()))
}

/// Match chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub match_id: MatchId,
    /// `None` for system-authored messages
    pub sender_id: Option<PlayerId>,
    pub message: String,
    pub is_system_message: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Player-authored message
    pub fn from_player(match_id: MatchId, sender_id: PlayerId, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            match_id,
            sender_id: Some(sender_id),
            message: message.into(),
            is_system_message: false,
            created_at: Utc::now(),
        }
    }

    /// System-authored message
    pub fn system(match_id: MatchId, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            match_id,
            sender_id: None,
            message: message.into(),
            is_system_message: true,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_match() -> Match {
        Match::scheduled(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 1)
    }

    #[test]
    fn test_parse_scores() {
        let report = ScoreReport::parse(" 3", "1 ").unwrap();
        assert_eq!(report, ScoreReport::new(3, 1));
    }

    #[test]
    fn test_parse_rejects_garbage_and_negatives() {
        assert!(matches!(
            ScoreReport::parse("abc", "1"),
            Err(MatchError::InvalidScore(_))
        ));
        assert!(matches!(
            ScoreReport::parse("2", "-1"),
            Err(MatchError::InvalidScore(_))
        ));
        assert!(matches!(
            ScoreReport::parse("2.5", "1"),
            Err(MatchError::InvalidScore(_))
        ));
    }

    #[test]
    fn test_scores_above_storage_range_are_rejected() {
        assert!(ScoreReport::parse("2147483647", "0").is_ok());
        assert!(matches!(
            ScoreReport::parse("3000000000", "2147483648"),
            Err(MatchError::InvalidScore(_))
        ));
        assert!(matches!(
            ScoreReport::new(MAX_SCORE + 1, 0).check_range(),
            Err(MatchError::InvalidScore(_))
        ));
        assert!(ScoreReport::new(MAX_SCORE, 0).check_range().is_ok());
    }

    #[test]
    fn test_winner_selection() {
        let m = sample_match();
        assert_eq!(ScoreReport::new(5, 2).winner(&m), Some(m.player1_id));
        assert_eq!(ScoreReport::new(0, 1).winner(&m), Some(m.player2_id));
        assert_eq!(ScoreReport::new(2, 2).winner(&m), None);
    }

    #[test]
    fn test_opponent_lookup() {
        let m = sample_match();
        assert_eq!(m.opponent_of(m.player1_id), Some(m.player2_id));
        assert_eq!(m.opponent_of(m.player2_id), Some(m.player1_id));
        assert_eq!(m.opponent_of(Uuid::new_v4()), None);
        assert!(m.involves(m.player1_id));
    }

    #[test]
    fn test_open_statuses() {
        assert!(MatchStatus::Pending.is_open());
        assert!(MatchStatus::InProgress.is_open());
        assert!(!MatchStatus::Completed.is_open());
        assert!(!MatchStatus::Cancelled.is_open());
    }
}
