//! Matches: scheduled 1v1 contests, score submission and match chat.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{MatchError, MatchResult};
pub use manager::MatchManager;
pub use models::{ChatMessage, Match, MatchId, MatchStatus, ScoreReport};
