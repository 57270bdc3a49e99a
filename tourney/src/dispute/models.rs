//! Dispute models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::matches::models::MatchId;
use crate::profile::models::PlayerId;

/// Dispute ID type
pub type DisputeId = Uuid;

/// Dispute lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Pending,
    UnderReview,
    Resolved,
    Rejected,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeStatus::Pending => "pending",
            DisputeStatus::UnderReview => "under_review",
            DisputeStatus::Resolved => "resolved",
            DisputeStatus::Rejected => "rejected",
        }
    }

    /// Still awaiting an administrator decision
    pub fn is_open(&self) -> bool {
        matches!(self, DisputeStatus::Pending | DisputeStatus::UnderReview)
    }
}

impl FromStr for DisputeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DisputeStatus::Pending),
            "under_review" => Ok(DisputeStatus::UnderReview),
            "resolved" => Ok(DisputeStatus::Resolved),
            "rejected" => Ok(DisputeStatus::Rejected),
            other => Err(format!("unknown dispute status '{other}'")),
        }
    }
}

/// What the dispute is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeKind {
    Score,
    Rules,
    Behavior,
    Technical,
}

impl DisputeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeKind::Score => "score",
            DisputeKind::Rules => "rules",
            DisputeKind::Behavior => "behavior",
            DisputeKind::Technical => "technical",
        }
    }
}

impl FromStr for DisputeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "score" => Ok(DisputeKind::Score),
            "rules" => Ok(DisputeKind::Rules),
            "behavior" => Ok(DisputeKind::Behavior),
            "technical" => Ok(DisputeKind::Technical),
            other => Err(format!("unknown dispute kind '{other}'")),
        }
    }
}

/// Administrator decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionType {
    Upheld,
    Rejected,
    Compromise,
}

impl ResolutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionType::Upheld => "upheld",
            ResolutionType::Rejected => "rejected",
            ResolutionType::Compromise => "compromise",
        }
    }

    /// Final dispute status for this decision
    pub fn final_status(&self) -> DisputeStatus {
        match self {
            ResolutionType::Rejected => DisputeStatus::Rejected,
            ResolutionType::Upheld | ResolutionType::Compromise => DisputeStatus::Resolved,
        }
    }
}

impl FromStr for ResolutionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upheld" => Ok(ResolutionType::Upheld),
            "rejected" => Ok(ResolutionType::Rejected),
            "compromise" => Ok(ResolutionType::Compromise),
            other => Err(format!("unknown resolution type '{other}'")),
        }
    }
}

/// Dispute case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub match_id: MatchId,
    pub reported_by_id: PlayerId,
    pub against_id: PlayerId,
    pub kind: DisputeKind,
    pub title: String,
    pub description: String,
    pub status: DisputeStatus,
    pub resolution: Option<String>,
    pub resolution_type: Option<ResolutionType>,
    /// Internal notes, only visible to administrators
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dispute {
    /// Copy without administrator-only fields
    pub fn redacted(mut self) -> Self {
        self.admin_notes = None;
        self
    }

    /// Whether `player_id` is the reporter or the accused
    pub fn involves(&self, player_id: PlayerId) -> bool {
        self.reported_by_id == player_id || self.against_id == player_id
    }
}

/// Dispute filing request
#[derive(Debug, Clone, Deserialize)]
pub struct NewDispute {
    pub kind: DisputeKind,
    pub title: String,
    pub description: String,
}

/// Administrator resolution
#[derive(Debug, Clone, Deserialize)]
pub struct Resolution {
    pub resolution_type: ResolutionType,
    pub resolution: String,
    pub admin_notes: Option<String>,
}

/// Message in a dispute thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeMessage {
    pub id: Uuid,
    pub dispute_id: DisputeId,
    pub sender_id: PlayerId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_final_status() {
        assert_eq!(ResolutionType::Upheld.final_status(), DisputeStatus::Resolved);
        assert_eq!(
            ResolutionType::Compromise.final_status(),
            DisputeStatus::Resolved
        );
        assert_eq!(
            ResolutionType::Rejected.final_status(),
            DisputeStatus::Rejected
        );
    }

    #[test]
    fn test_open_statuses() {
        assert!(DisputeStatus::Pending.is_open());
        assert!(DisputeStatus::UnderReview.is_open());
        assert!(!DisputeStatus::Resolved.is_open());
        assert!(!DisputeStatus::Rejected.is_open());
    }

    #[test]
    fn test_text_parsing() {
        assert_eq!("under_review".parse(), Ok(DisputeStatus::UnderReview));
        assert_eq!("behavior".parse(), Ok(DisputeKind::Behavior));
        assert_eq!("compromise".parse(), Ok(ResolutionType::Compromise));
        assert!("cheating".parse::<DisputeKind>().is_err());
    }
}
