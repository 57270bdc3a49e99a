//! Repository trait definitions for testability and dependency injection.
//!
//! Managers never talk to PostgreSQL directly; they go through
//! [`Repository`], which has a pooled PostgreSQL implementation
//! ([`PgRepository`](super::PgRepository)) and an in-process one
//! ([`MemoryRepository`](super::MemoryRepository)).
//!
//! Plain reads and single-row writes map one-to-one onto statements. The
//! `commit_*` / `record_*` / `replace_*` operations are the multi-row writes
//! of the tournament lifecycle and must be all-or-nothing: an implementation
//! re-validates the preconditions inside its transaction and fails with
//! [`StoreError::Conflict`](super::StoreError::Conflict) without writing
//! anything if they no longer hold.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::errors::StoreResult;
use crate::direct_message::models::DirectMessage;
use crate::dispute::models::{Dispute, DisputeId, DisputeMessage, DisputeStatus};
use crate::matches::models::{ChatMessage, Match, MatchId, MatchStatus};
use crate::profile::models::{PlayerId, Profile};
use crate::tournament::models::{
    Participant, Payout, PrizeTier, Tournament, TournamentId, TournamentStatus,
};

/// Everything written for one pairing round
#[derive(Debug, Clone)]
pub struct RoundPlan {
    pub tournament_id: TournamentId,
    pub round: u32,
    pub matches: Vec<Match>,
    /// System messages announcing each pairing
    pub announcements: Vec<ChatMessage>,
}

impl RoundPlan {
    /// Every player placed in a match by this plan
    pub fn paired_players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.matches
            .iter()
            .flat_map(|m| [m.player1_id, m.player2_id])
    }
}

/// Result of a scored match and the standings changes it causes
#[derive(Debug, Clone)]
pub struct MatchCompletion {
    pub match_id: MatchId,
    pub tournament_id: TournamentId,
    pub score_player1: u32,
    pub score_player2: u32,
    pub winner_id: PlayerId,
    pub loser_id: PlayerId,
    pub points_per_win: u32,
    pub points_per_loss: u32,
    pub completed_at: DateTime<Utc>,
}

/// Dispute filter; `None` fields match everything
#[derive(Debug, Clone, Default)]
pub struct DisputeFilter {
    pub match_id: Option<MatchId>,
    /// Disputes the player filed or is accused in
    pub involving: Option<PlayerId>,
    pub status: Option<DisputeStatus>,
}

/// Persistence collaborator for the whole tournament platform
#[async_trait]
pub trait Repository: Send + Sync {
    // ------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------

    /// Insert or replace a profile
    async fn upsert_profile(&self, profile: &Profile) -> StoreResult<()>;

    /// Find profile by ID
    async fn get_profile(&self, player_id: PlayerId) -> StoreResult<Option<Profile>>;

    /// Find profiles by ID; unknown IDs are omitted
    async fn get_profiles(&self, player_ids: &[PlayerId]) -> StoreResult<Vec<Profile>>;

    /// Find profile by username
    async fn find_profile_by_username(&self, username: &str) -> StoreResult<Option<Profile>>;

    /// Whether `player_id` has a profile flagged as administrator
    async fn is_admin(&self, player_id: PlayerId) -> StoreResult<bool> {
        Ok(self
            .get_profile(player_id)
            .await?
            .is_some_and(|p| p.is_admin))
    }

    // ------------------------------------------------------------------
    // Tournaments & participants
    // ------------------------------------------------------------------

    /// Insert a new tournament
    async fn insert_tournament(&self, tournament: &Tournament) -> StoreResult<()>;

    /// Find tournament by ID
    async fn get_tournament(&self, tournament_id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// List tournaments, newest start date first
    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> StoreResult<Vec<Tournament>>;

    /// Move a tournament to `to` if its status is one of `from`.
    ///
    /// Returns whether the row was updated.
    async fn transition_tournament(
        &self,
        tournament_id: TournamentId,
        from: &[TournamentStatus],
        to: TournamentStatus,
    ) -> StoreResult<bool>;

    /// Register a participant.
    ///
    /// Re-checks under lock that the tournament is still upcoming and below
    /// capacity; that, or a duplicate registration, is a conflict.
    async fn insert_participant(&self, participant: &Participant) -> StoreResult<()>;

    /// Remove a still-registered participant. Returns whether a row was removed.
    async fn remove_registered_participant(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<bool>;

    /// Participants in registration order
    async fn list_participants(&self, tournament_id: TournamentId) -> StoreResult<Vec<Participant>>;

    // ------------------------------------------------------------------
    // Matches
    // ------------------------------------------------------------------

    /// Highest round number created so far (0 when none)
    async fn max_round(&self, tournament_id: TournamentId) -> StoreResult<u32>;

    /// Atomically create a round.
    ///
    /// Inserts every match and announcement, moves every paired participant
    /// from `registered` to `in_match`, and moves the tournament to
    /// `in_progress`. Fails with a conflict if the tournament is no longer
    /// upcoming/in progress or any paired participant is no longer
    /// registered.
    async fn commit_round(&self, plan: &RoundPlan) -> StoreResult<()>;

    /// Find match by ID
    async fn get_match(&self, match_id: MatchId) -> StoreResult<Option<Match>>;

    /// Matches of a tournament ordered by round, then match date
    async fn list_matches(&self, tournament_id: TournamentId) -> StoreResult<Vec<Match>>;

    /// Move a match to `to` if its status is one of `from`.
    async fn transition_match(
        &self,
        match_id: MatchId,
        from: &[MatchStatus],
        to: MatchStatus,
    ) -> StoreResult<bool>;

    /// Atomically complete an open match and update both participants.
    async fn complete_match(&self, completion: &MatchCompletion) -> StoreResult<Match>;

    /// Atomically cancel an open match and return both players to `registered`.
    async fn cancel_match(&self, match_id: MatchId) -> StoreResult<Match>;

    // ------------------------------------------------------------------
    // Match chat
    // ------------------------------------------------------------------

    /// Append a chat message
    async fn insert_chat_message(&self, message: &ChatMessage) -> StoreResult<()>;

    /// Chat messages of a match, oldest first
    async fn list_chat_messages(&self, match_id: MatchId) -> StoreResult<Vec<ChatMessage>>;

    // ------------------------------------------------------------------
    // Prizes
    // ------------------------------------------------------------------

    /// Atomically replace the prize tiers of a tournament whose prizes have
    /// not been distributed yet.
    async fn replace_prize_tiers(
        &self,
        tournament_id: TournamentId,
        tiers: &[PrizeTier],
    ) -> StoreResult<()>;

    /// Prize tiers ordered by position
    async fn list_prize_tiers(&self, tournament_id: TournamentId) -> StoreResult<Vec<PrizeTier>>;

    /// Atomically record payouts and flip `prize_distributed` from false to
    /// true. A tournament that is already distributed is a conflict.
    async fn record_distribution(
        &self,
        tournament_id: TournamentId,
        payouts: &[Payout],
    ) -> StoreResult<()>;

    /// Recorded payouts ordered by position
    async fn list_payouts(&self, tournament_id: TournamentId) -> StoreResult<Vec<Payout>>;

    // ------------------------------------------------------------------
    // Disputes
    // ------------------------------------------------------------------

    /// File a dispute
    async fn insert_dispute(&self, dispute: &Dispute) -> StoreResult<()>;

    /// Find dispute by ID
    async fn get_dispute(&self, dispute_id: DisputeId) -> StoreResult<Option<Dispute>>;

    /// Disputes matching `filter`, newest first
    async fn list_disputes(&self, filter: &DisputeFilter) -> StoreResult<Vec<Dispute>>;

    /// Replace a dispute if its stored status is one of `from`.
    ///
    /// Status, resolution fields and `updated_at` are taken from `dispute`.
    async fn update_dispute(&self, dispute: &Dispute, from: &[DisputeStatus]) -> StoreResult<bool>;

    /// Append a message to a dispute thread
    async fn insert_dispute_message(&self, message: &DisputeMessage) -> StoreResult<()>;

    /// Dispute thread, oldest first
    async fn list_dispute_messages(&self, dispute_id: DisputeId)
    -> StoreResult<Vec<DisputeMessage>>;

    // ------------------------------------------------------------------
    // Direct messages
    // ------------------------------------------------------------------

    /// Store a direct message
    async fn insert_direct_message(&self, message: &DirectMessage) -> StoreResult<()>;

    /// Messages between two players in either direction, oldest first
    async fn list_conversation(&self, a: PlayerId, b: PlayerId) -> StoreResult<Vec<DirectMessage>>;

    /// Mark unread messages from `sender` to `reader` as read; returns the
    /// number of messages updated.
    async fn mark_conversation_read(&self, reader: PlayerId, sender: PlayerId) -> StoreResult<u64>;

    // ------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------

    /// Check that the backing store answers
    async fn health_check(&self) -> StoreResult<()>;
}
