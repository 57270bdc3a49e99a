//! Tournaments: registration, round pairing, standings and prizes.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tourney::config::CompetitionConfig;
//! use tourney::db::MemoryRepository;
//! use tourney::events::EventHub;
//! use tourney::tournament::{NewTournament, TournamentManager};
//!
//! # async fn run(organizer: uuid::Uuid) -> Result<(), Box<dyn std::error::Error>> {
//! let manager = TournamentManager::new(
//!     Arc::new(MemoryRepository::new()),
//!     EventHub::default(),
//!     CompetitionConfig::default(),
//! );
//! let cup = manager
//!     .create(organizer, NewTournament::new("Friday Cup", "chess", 16).with_prize_pool(1000))
//!     .await?;
//! let round = manager.generate_round(cup.id, organizer).await?;
//! println!("round {} has {} matches", round.round, round.matches.len());
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod manager;
pub mod models;
pub mod pairing;
pub mod prizes;

pub use errors::{TournamentError, TournamentResult};
pub use manager::TournamentManager;
pub use models::{
    DistributionReport, NewTournament, Participant, ParticipantStatus, Payout, PrizeTier,
    RoundReport, Standing, Tournament, TournamentId, TournamentStatus,
};
pub use pairing::{
    Entrant, Pairing, PairingStrategy, Pairings, RandomPairing, SkillBasedPairing, pair_entrants,
};
