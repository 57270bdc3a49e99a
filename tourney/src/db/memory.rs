//! In-process [`Repository`] implementation.
//!
//! All state lives behind one mutex, so every operation (including the
//! multi-row commits) is trivially atomic. Used by the test suites and by
//! the server's `STORAGE=memory` mode.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::errors::{StoreError, StoreResult};
use super::repository::{DisputeFilter, MatchCompletion, Repository, RoundPlan};
use crate::direct_message::models::DirectMessage;
use crate::dispute::models::{Dispute, DisputeId, DisputeMessage, DisputeStatus};
use crate::matches::models::{ChatMessage, Match, MatchId, MatchStatus};
use crate::profile::models::{PlayerId, Profile};
use crate::tournament::models::{
    Participant, ParticipantStatus, Payout, PrizeTier, Tournament, TournamentId, TournamentStatus,
};

#[derive(Default)]
struct MemoryState {
    profiles: HashMap<PlayerId, Profile>,
    tournaments: HashMap<TournamentId, Tournament>,
    /// Insertion order doubles as registration order
    participants: Vec<Participant>,
    matches: Vec<Match>,
    chat: Vec<ChatMessage>,
    prize_tiers: HashMap<TournamentId, Vec<PrizeTier>>,
    payouts: Vec<Payout>,
    disputes: Vec<Dispute>,
    dispute_messages: Vec<DisputeMessage>,
    direct_messages: Vec<DirectMessage>,
}

impl MemoryState {
    fn participant_mut(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.tournament_id == tournament_id && p.player_id == player_id)
    }

    fn participant(&self, tournament_id: TournamentId, player_id: PlayerId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.tournament_id == tournament_id && p.player_id == player_id)
    }
}

/// Mutex-guarded in-memory store
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock cannot leave a half-applied commit
        // behind because every commit validates before it mutates.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn upsert_profile(&self, profile: &Profile) -> StoreResult<()> {
        let mut state = self.lock();
        let taken = state
            .profiles
            .values()
            .any(|p| p.id != profile.id && p.username.eq_ignore_ascii_case(&profile.username));
        if taken {
            return Err(StoreError::conflict("username already exists"));
        }
        state.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn get_profile(&self, player_id: PlayerId) -> StoreResult<Option<Profile>> {
        Ok(self.lock().profiles.get(&player_id).cloned())
    }

    async fn get_profiles(&self, player_ids: &[PlayerId]) -> StoreResult<Vec<Profile>> {
        let state = self.lock();
        Ok(player_ids
            .iter()
            .filter_map(|id| state.profiles.get(id).cloned())
            .collect())
    }

    async fn find_profile_by_username(&self, username: &str) -> StoreResult<Option<Profile>> {
        Ok(self
            .lock()
            .profiles
            .values()
            .find(|p| p.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn insert_tournament(&self, tournament: &Tournament) -> StoreResult<()> {
        let mut state = self.lock();
        if state.tournaments.contains_key(&tournament.id) {
            return Err(StoreError::conflict("tournament already exists"));
        }
        state.tournaments.insert(tournament.id, tournament.clone());
        Ok(())
    }

    async fn get_tournament(&self, tournament_id: TournamentId) -> StoreResult<Option<Tournament>> {
        Ok(self.lock().tournaments.get(&tournament_id).cloned())
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> StoreResult<Vec<Tournament>> {
        let state = self.lock();
        let mut tournaments: Vec<Tournament> = state
            .tournaments
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        tournaments.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(tournaments)
    }

    async fn transition_tournament(
        &self,
        tournament_id: TournamentId,
        from: &[TournamentStatus],
        to: TournamentStatus,
    ) -> StoreResult<bool> {
        let mut state = self.lock();
        match state.tournaments.get_mut(&tournament_id) {
            Some(t) if from.contains(&t.status) => {
                t.status = to;
                t.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_participant(&self, participant: &Participant) -> StoreResult<()> {
        let mut state = self.lock();
        let tournament = state
            .tournaments
            .get(&participant.tournament_id)
            .ok_or(StoreError::NotFound {
                entity: "tournament",
            })?;
        if tournament.status != TournamentStatus::Upcoming {
            return Err(StoreError::conflict(format!(
                "tournament is {}",
                tournament.status
            )));
        }
        let max = usize::try_from(tournament.max_participants).unwrap_or(usize::MAX);
        let registered = state
            .participants
            .iter()
            .filter(|p| p.tournament_id == participant.tournament_id)
            .count();
        if state
            .participant(participant.tournament_id, participant.player_id)
            .is_some()
        {
            return Err(StoreError::conflict("participant already exists"));
        }
        if registered >= max {
            return Err(StoreError::conflict("tournament is full"));
        }
        state.participants.push(participant.clone());
        Ok(())
    }

    async fn remove_registered_participant(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<bool> {
        let mut state = self.lock();
        let before = state.participants.len();
        state.participants.retain(|p| {
            !(p.tournament_id == tournament_id
                && p.player_id == player_id
                && p.status == ParticipantStatus::Registered)
        });
        Ok(state.participants.len() < before)
    }

    async fn list_participants(&self, tournament_id: TournamentId) -> StoreResult<Vec<Participant>> {
        Ok(self
            .lock()
            .participants
            .iter()
            .filter(|p| p.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn max_round(&self, tournament_id: TournamentId) -> StoreResult<u32> {
        Ok(self
            .lock()
            .matches
            .iter()
            .filter(|m| m.tournament_id == tournament_id)
            .map(|m| m.round)
            .max()
            .unwrap_or(0))
    }

    async fn commit_round(&self, plan: &RoundPlan) -> StoreResult<()> {
        let mut state = self.lock();

        let tournament = state
            .tournaments
            .get(&plan.tournament_id)
            .ok_or(StoreError::NotFound {
                entity: "tournament",
            })?;
        if !matches!(
            tournament.status,
            TournamentStatus::Upcoming | TournamentStatus::InProgress
        ) {
            return Err(StoreError::conflict(format!(
                "tournament is {}",
                tournament.status
            )));
        }

        for player_id in plan.paired_players() {
            match state.participant(plan.tournament_id, player_id) {
                Some(p) if p.status == ParticipantStatus::Registered => {}
                Some(_) => {
                    return Err(StoreError::conflict(format!(
                        "participant {player_id} is no longer registered"
                    )));
                }
                None => {
                    return Err(StoreError::conflict(format!(
                        "participant {player_id} left the tournament"
                    )));
                }
            }
        }

        let paired: Vec<PlayerId> = plan.paired_players().collect();
        for player_id in paired {
            if let Some(p) = state.participant_mut(plan.tournament_id, player_id) {
                p.status = ParticipantStatus::InMatch;
            }
        }
        state.matches.extend(plan.matches.iter().cloned());
        state.chat.extend(plan.announcements.iter().cloned());
        if let Some(t) = state.tournaments.get_mut(&plan.tournament_id) {
            t.status = TournamentStatus::InProgress;
            t.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn get_match(&self, match_id: MatchId) -> StoreResult<Option<Match>> {
        Ok(self.lock().matches.iter().find(|m| m.id == match_id).cloned())
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> StoreResult<Vec<Match>> {
        let mut matches: Vec<Match> = self
            .lock()
            .matches
            .iter()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.round.cmp(&b.round).then(a.match_date.cmp(&b.match_date)));
        Ok(matches)
    }

    async fn transition_match(
        &self,
        match_id: MatchId,
        from: &[MatchStatus],
        to: MatchStatus,
    ) -> StoreResult<bool> {
        let mut state = self.lock();
        match state.matches.iter_mut().find(|m| m.id == match_id) {
            Some(m) if from.contains(&m.status) => {
                m.status = to;
                m.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete_match(&self, completion: &MatchCompletion) -> StoreResult<Match> {
        let mut state = self.lock();

        let current = state
            .matches
            .iter()
            .find(|m| m.id == completion.match_id)
            .ok_or(StoreError::NotFound { entity: "match" })?;
        if !current.status.is_open() {
            return Err(StoreError::conflict(format!("match is {}", current.status)));
        }
        for player_id in [completion.winner_id, completion.loser_id] {
            if state
                .participant(completion.tournament_id, player_id)
                .is_none()
            {
                return Err(StoreError::NotFound {
                    entity: "participant",
                });
            }
        }

        if let Some(winner) = state.participant_mut(completion.tournament_id, completion.winner_id)
        {
            winner.wins += 1;
            winner.points += completion.points_per_win;
            winner.status = ParticipantStatus::Registered;
        }
        if let Some(loser) = state.participant_mut(completion.tournament_id, completion.loser_id) {
            loser.losses += 1;
            loser.points += completion.points_per_loss;
            loser.status = ParticipantStatus::Eliminated;
        }

        let m = state
            .matches
            .iter_mut()
            .find(|m| m.id == completion.match_id)
            .ok_or(StoreError::NotFound { entity: "match" })?;
        m.score_player1 = Some(completion.score_player1);
        m.score_player2 = Some(completion.score_player2);
        m.winner_id = Some(completion.winner_id);
        m.status = MatchStatus::Completed;
        m.updated_at = completion.completed_at;
        Ok(m.clone())
    }

    async fn cancel_match(&self, match_id: MatchId) -> StoreResult<Match> {
        let mut state = self.lock();

        let m = state
            .matches
            .iter_mut()
            .find(|m| m.id == match_id)
            .ok_or(StoreError::NotFound { entity: "match" })?;
        if !m.status.is_open() {
            return Err(StoreError::conflict(format!("match is {}", m.status)));
        }
        m.status = MatchStatus::Cancelled;
        m.updated_at = Utc::now();
        let cancelled = m.clone();

        for player_id in [cancelled.player1_id, cancelled.player2_id] {
            if let Some(p) = state.participant_mut(cancelled.tournament_id, player_id) {
                if p.status == ParticipantStatus::InMatch {
                    p.status = ParticipantStatus::Registered;
                }
            }
        }
        Ok(cancelled)
    }

    async fn insert_chat_message(&self, message: &ChatMessage) -> StoreResult<()> {
        let mut state = self.lock();
        if !state.matches.iter().any(|m| m.id == message.match_id) {
            return Err(StoreError::NotFound { entity: "match" });
        }
        state.chat.push(message.clone());
        Ok(())
    }

    async fn list_chat_messages(&self, match_id: MatchId) -> StoreResult<Vec<ChatMessage>> {
        Ok(self
            .lock()
            .chat
            .iter()
            .filter(|c| c.match_id == match_id)
            .cloned()
            .collect())
    }

    async fn replace_prize_tiers(
        &self,
        tournament_id: TournamentId,
        tiers: &[PrizeTier],
    ) -> StoreResult<()> {
        let mut state = self.lock();
        let tournament = state
            .tournaments
            .get(&tournament_id)
            .ok_or(StoreError::NotFound {
                entity: "tournament",
            })?;
        if tournament.prize_distributed {
            return Err(StoreError::conflict("prizes already distributed"));
        }
        let mut tiers = tiers.to_vec();
        tiers.sort_by_key(|t| t.position);
        state.prize_tiers.insert(tournament_id, tiers);
        Ok(())
    }

    async fn list_prize_tiers(&self, tournament_id: TournamentId) -> StoreResult<Vec<PrizeTier>> {
        Ok(self
            .lock()
            .prize_tiers
            .get(&tournament_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn record_distribution(
        &self,
        tournament_id: TournamentId,
        payouts: &[Payout],
    ) -> StoreResult<()> {
        let mut state = self.lock();
        let tournament = state
            .tournaments
            .get_mut(&tournament_id)
            .ok_or(StoreError::NotFound {
                entity: "tournament",
            })?;
        if tournament.prize_distributed {
            return Err(StoreError::conflict("prizes already distributed"));
        }
        tournament.prize_distributed = true;
        tournament.updated_at = Utc::now();
        state.payouts.extend(payouts.iter().cloned());
        Ok(())
    }

    async fn list_payouts(&self, tournament_id: TournamentId) -> StoreResult<Vec<Payout>> {
        let mut payouts: Vec<Payout> = self
            .lock()
            .payouts
            .iter()
            .filter(|p| p.tournament_id == tournament_id)
            .cloned()
            .collect();
        payouts.sort_by_key(|p| p.position);
        Ok(payouts)
    }

    async fn insert_dispute(&self, dispute: &Dispute) -> StoreResult<()> {
        let mut state = self.lock();
        if !state.matches.iter().any(|m| m.id == dispute.match_id) {
            return Err(StoreError::NotFound { entity: "match" });
        }
        state.disputes.push(dispute.clone());
        Ok(())
    }

    async fn get_dispute(&self, dispute_id: DisputeId) -> StoreResult<Option<Dispute>> {
        Ok(self
            .lock()
            .disputes
            .iter()
            .find(|d| d.id == dispute_id)
            .cloned())
    }

    async fn list_disputes(&self, filter: &DisputeFilter) -> StoreResult<Vec<Dispute>> {
        let state = self.lock();
        let mut disputes: Vec<Dispute> = state
            .disputes
            .iter()
            .rev()
            .filter(|d| filter.match_id.is_none_or(|id| d.match_id == id))
            .filter(|d| filter.involving.is_none_or(|id| d.involves(id)))
            .filter(|d| filter.status.is_none_or(|s| d.status == s))
            .cloned()
            .collect();
        disputes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(disputes)
    }

    async fn update_dispute(&self, dispute: &Dispute, from: &[DisputeStatus]) -> StoreResult<bool> {
        let mut state = self.lock();
        match state.disputes.iter_mut().find(|d| d.id == dispute.id) {
            Some(stored) if from.contains(&stored.status) => {
                stored.status = dispute.status;
                stored.resolution = dispute.resolution.clone();
                stored.resolution_type = dispute.resolution_type;
                stored.admin_notes = dispute.admin_notes.clone();
                stored.updated_at = dispute.updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_dispute_message(&self, message: &DisputeMessage) -> StoreResult<()> {
        let mut state = self.lock();
        if !state.disputes.iter().any(|d| d.id == message.dispute_id) {
            return Err(StoreError::NotFound { entity: "dispute" });
        }
        state.dispute_messages.push(message.clone());
        Ok(())
    }

    async fn list_dispute_messages(
        &self,
        dispute_id: DisputeId,
    ) -> StoreResult<Vec<DisputeMessage>> {
        Ok(self
            .lock()
            .dispute_messages
            .iter()
            .filter(|m| m.dispute_id == dispute_id)
            .cloned()
            .collect())
    }

    async fn insert_direct_message(&self, message: &DirectMessage) -> StoreResult<()> {
        let mut state = self.lock();
        for player in [message.sender_id, message.receiver_id] {
            if !state.profiles.contains_key(&player) {
                return Err(StoreError::NotFound { entity: "profile" });
            }
        }
        state.direct_messages.push(message.clone());
        Ok(())
    }

    async fn list_conversation(&self, a: PlayerId, b: PlayerId) -> StoreResult<Vec<DirectMessage>> {
        Ok(self
            .lock()
            .direct_messages
            .iter()
            .filter(|m| m.between(a, b))
            .cloned()
            .collect())
    }

    async fn mark_conversation_read(&self, reader: PlayerId, sender: PlayerId) -> StoreResult<u64> {
        let mut updated = 0;
        for message in self
            .lock()
            .direct_messages
            .iter_mut()
            .filter(|m| m.sender_id == sender && m.receiver_id == reader && !m.read)
        {
            message.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
