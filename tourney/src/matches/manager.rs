//! Match manager: start, score submission, cancellation and match chat.

use chrono::Utc;
use std::sync::Arc;

use super::errors::{MatchError, MatchResult};
use super::models::{ChatMessage, MAX_MESSAGE_LEN, Match, MatchId, MatchStatus, ScoreReport};
use crate::config::CompetitionConfig;
use crate::db::{MatchCompletion, Repository, StoreError};
use crate::events::{ChangeAction, EventHub, Topic};
use crate::profile::models::PlayerId;

/// Match manager
#[derive(Clone)]
pub struct MatchManager {
    repo: Arc<dyn Repository>,
    events: EventHub,
    config: CompetitionConfig,
}

impl MatchManager {
    pub fn new(repo: Arc<dyn Repository>, events: EventHub, config: CompetitionConfig) -> Self {
        Self {
            repo,
            events,
            config,
        }
    }

    pub async fn get(&self, match_id: MatchId) -> MatchResult<Match> {
        self.repo
            .get_match(match_id)
            .await?
            .ok_or(MatchError::NotFound)
    }

    /// Mark a pending match as being played
    pub async fn start(&self, match_id: MatchId, caller: PlayerId) -> MatchResult<Match> {
        let m = self.get(match_id).await?;
        if !m.involves(caller) {
            return Err(MatchError::NotParticipant);
        }

        let moved = self
            .repo
            .transition_match(match_id, &[MatchStatus::Pending], MatchStatus::InProgress)
            .await?;
        let m = self.get(match_id).await?;
        if !moved {
            return Err(MatchError::InvalidState(m.status));
        }

        log::info!("Match {match_id} started by {caller}");
        self.publish_match(&m);
        Ok(m)
    }

    /// Record the final score of an open match.
    ///
    /// Only the two contestants may report; the player with the strictly
    /// higher score wins and ties are rejected. Standings of both players
    /// are updated in the same commit as the match.
    pub async fn submit_score(
        &self,
        match_id: MatchId,
        caller: PlayerId,
        report: ScoreReport,
    ) -> MatchResult<Match> {
        let m = self.get(match_id).await?;
        let Some(opponent) = m.opponent_of(caller) else {
            log::warn!("Player {caller} tried to score match {match_id} they do not play in");
            return Err(MatchError::NotParticipant);
        };
        if !m.status.is_open() {
            return Err(MatchError::InvalidState(m.status));
        }

        report.check_range()?;
        let winner_id = report.winner(&m).ok_or(MatchError::TieNotAllowed)?;
        let loser_id = if winner_id == caller { opponent } else { caller };

        let completion = MatchCompletion {
            match_id,
            tournament_id: m.tournament_id,
            score_player1: report.score_player1,
            score_player2: report.score_player2,
            winner_id,
            loser_id,
            points_per_win: self.config.points_per_win,
            points_per_loss: self.config.points_per_loss,
            completed_at: Utc::now(),
        };

        let completed = match self.repo.complete_match(&completion).await {
            Ok(completed) => completed,
            Err(StoreError::Conflict(reason)) => {
                log::warn!("Score for match {match_id} lost a race: {reason}");
                let current = self.get(match_id).await?;
                return Err(MatchError::InvalidState(current.status));
            }
            Err(e) => return Err(e.into()),
        };

        log::info!(
            "Match {match_id} completed {}-{}, winner {winner_id}",
            report.score_player1,
            report.score_player2
        );
        self.publish_match(&completed);
        self.publish_standings(&completed, [winner_id, loser_id]);
        Ok(completed)
    }

    /// Parse free-form scores and submit them
    pub async fn submit_score_text(
        &self,
        match_id: MatchId,
        caller: PlayerId,
        score_player1: &str,
        score_player2: &str,
    ) -> MatchResult<Match> {
        let report = ScoreReport::parse(score_player1, score_player2)?;
        self.submit_score(match_id, caller, report).await
    }

    /// Cancel an open match; both players return to the pairing pool.
    pub async fn cancel(&self, match_id: MatchId, caller: PlayerId) -> MatchResult<Match> {
        let m = self.get(match_id).await?;
        let creator = self
            .repo
            .get_tournament(m.tournament_id)
            .await?
            .map(|t| t.creator_id);
        if creator != Some(caller) && !self.repo.is_admin(caller).await? {
            return Err(MatchError::Unauthorized);
        }

        let cancelled = match self.repo.cancel_match(match_id).await {
            Ok(cancelled) => cancelled,
            Err(StoreError::Conflict(_)) => {
                let current = self.get(match_id).await?;
                return Err(MatchError::InvalidState(current.status));
            }
            Err(e) => return Err(e.into()),
        };

        log::info!("Match {match_id} cancelled by {caller}");
        self.publish_match(&cancelled);
        self.publish_standings(&cancelled, [cancelled.player1_id, cancelled.player2_id]);
        Ok(cancelled)
    }

    /// Post a chat message as a contestant or administrator
    pub async fn post_message(
        &self,
        match_id: MatchId,
        caller: PlayerId,
        text: &str,
    ) -> MatchResult<ChatMessage> {
        let m = self.get(match_id).await?;
        self.ensure_chat_access(&m, caller).await?;

        let text = text.trim();
        if text.is_empty() || text.chars().count() > MAX_MESSAGE_LEN {
            return Err(MatchError::InvalidMessage);
        }

        let message = ChatMessage::from_player(match_id, caller, text);
        self.repo.insert_chat_message(&message).await?;
        self.events.publish_change(
            Topic::ChatMessages,
            ChangeAction::Insert,
            message.id,
            Some(match_id),
            &message,
        );
        Ok(message)
    }

    /// Chat log, oldest first
    pub async fn messages(
        &self,
        match_id: MatchId,
        caller: PlayerId,
    ) -> MatchResult<Vec<ChatMessage>> {
        let m = self.get(match_id).await?;
        self.ensure_chat_access(&m, caller).await?;
        Ok(self.repo.list_chat_messages(match_id).await?)
    }

    async fn ensure_chat_access(&self, m: &Match, caller: PlayerId) -> MatchResult<()> {
        if m.involves(caller) || self.repo.is_admin(caller).await? {
            Ok(())
        } else {
            Err(MatchError::NotParticipant)
        }
    }

    fn publish_match(&self, m: &Match) {
        self.events.publish_change(
            Topic::Matches,
            ChangeAction::Update,
            m.id,
            Some(m.tournament_id),
            m,
        );
    }

    fn publish_standings(&self, m: &Match, players: [PlayerId; 2]) {
        for player_id in players {
            self.events.publish_change(
                Topic::Participants,
                ChangeAction::Update,
                player_id,
                Some(m.tournament_id),
                &serde_json::json!({ "tournament_id": m.tournament_id, "player_id": player_id }),
            );
        }
    }
}
