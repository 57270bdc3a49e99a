//! # Tourney
//!
//! Backend library for community gaming tournaments: registration, round
//! pairing, score submission, standings, prize distribution and disputes.
//!
//! Every operation is async and runs against a shared [`db::Repository`].
//! Writes that touch several records (pairing a round, completing a match,
//! distributing prizes) are committed atomically by the repository, and each
//! successful write is announced on the [`events::EventHub`].
//!
//! ## Core Modules
//!
//! - [`tournament`]: tournament lifecycle, pairing engine and prize distributor
//! - [`matches`]: match start, score submission, cancellation and match chat
//! - [`dispute`]: participant-raised disputes and their review workflow
//! - [`direct_message`]: private player-to-player messages
//! - [`profile`]: player profiles, skill ratings and admin flags
//! - [`db`]: persistence trait with PostgreSQL and in-memory implementations
//! - [`events`]: change-event subscriptions and presence
//! - [`auth`]: bearer-token verification
//!
//! ## Example
//!
//! ```
//! use tourney::tournament::{Entrant, SkillBasedPairing, pair_entrants};
//! use uuid::Uuid;
//!
//! let field = vec![
//!     Entrant::new(Uuid::new_v4(), 1400),
//!     Entrant::new(Uuid::new_v4(), 1000),
//!     Entrant::new(Uuid::new_v4(), 1200),
//! ];
//! let round = pair_entrants(&SkillBasedPairing, field);
//! assert_eq!(round.pairs.len(), 1);
//! assert!(round.bye.is_some());
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod direct_message;
pub mod dispute;
pub mod errors;
pub mod events;
pub mod matches;
pub mod profile;
pub mod tournament;

pub use config::{CompetitionConfig, ConfigError};
pub use errors::{Classify, ErrorKind};
pub use events::{ChangeAction, ChangeEvent, EventFilter, EventHub, Subscription, Topic};
