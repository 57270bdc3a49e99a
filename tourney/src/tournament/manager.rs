//! Tournament manager: registry, pairing rounds, completion and prizes.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use super::errors::{TournamentError, TournamentResult};
use super::models::{
    DistributionReport, NewTournament, Participant, ParticipantStatus, Payout, PrizeTier,
    RoundReport, Standing, Tournament, TournamentId, TournamentStatus,
};
use super::pairing::{Entrant, PairingStrategy, pair_entrants};
use super::prizes::{compute_payouts, rank_standings, validate_tiers};
use crate::config::CompetitionConfig;
use crate::db::{Repository, RoundPlan, StoreError};
use crate::events::{ChangeAction, EventHub, Topic};
use crate::matches::models::{ChatMessage, Match};
use crate::profile::models::{DEFAULT_SKILL_RATING, PlayerId, Profile};

/// Longest accepted tournament title
pub const MAX_TITLE_LEN: usize = 200;

/// Longest accepted game type
pub const MAX_GAME_TYPE_LEN: usize = 100;

/// Largest field a tournament may declare
pub const MAX_PARTICIPANTS: u32 = 1024;

/// Largest prize pool a tournament may declare
pub const MAX_PRIZE_POOL: i64 = 1_000_000_000_000_000;

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    repo: Arc<dyn Repository>,
    events: EventHub,
    config: CompetitionConfig,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(repo: Arc<dyn Repository>, events: EventHub, config: CompetitionConfig) -> Self {
        Self {
            repo,
            events,
            config,
        }
    }

    pub fn config(&self) -> &CompetitionConfig {
        &self.config
    }

    /// Create a new tournament owned by `creator_id`
    pub async fn create(
        &self,
        creator_id: PlayerId,
        details: NewTournament,
    ) -> TournamentResult<Tournament> {
        self.require_profile(creator_id).await?;
        validate_new_tournament(&details)?;

        let tournament = Tournament::new(creator_id, details);
        self.repo.insert_tournament(&tournament).await?;

        log::info!(
            "Tournament {} '{}' created by {}",
            tournament.id,
            tournament.title,
            creator_id
        );
        self.publish_tournament(&tournament, ChangeAction::Insert);
        Ok(tournament)
    }

    pub async fn get(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.repo
            .get_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::NotFound)
    }

    /// List tournaments, newest start date first
    pub async fn list(&self, status: Option<TournamentStatus>) -> TournamentResult<Vec<Tournament>> {
        Ok(self.repo.list_tournaments(status).await?)
    }

    /// Register `player_id` for an upcoming tournament
    pub async fn join(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Participant> {
        self.require_profile(player_id).await?;
        let tournament = self.get(tournament_id).await?;
        if tournament.status != TournamentStatus::Upcoming {
            return Err(TournamentError::RegistrationClosed);
        }

        let participants = self.repo.list_participants(tournament_id).await?;
        if participants.iter().any(|p| p.player_id == player_id) {
            return Err(TournamentError::AlreadyRegistered);
        }
        if participants.len() >= tournament.max_participants as usize {
            return Err(TournamentError::TournamentFull(tournament.max_participants));
        }

        let participant = Participant::new(tournament_id, player_id);
        self.repo.insert_participant(&participant).await?;

        log::info!("Player {player_id} joined tournament {tournament_id}");
        self.events.publish_change(
            Topic::Participants,
            ChangeAction::Insert,
            player_id,
            Some(tournament_id),
            &participant,
        );
        Ok(participant)
    }

    /// Withdraw from a tournament that has not started
    pub async fn withdraw(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<()> {
        let tournament = self.get(tournament_id).await?;
        if tournament.status != TournamentStatus::Upcoming {
            return Err(TournamentError::RegistrationClosed);
        }
        if !self
            .repo
            .remove_registered_participant(tournament_id, player_id)
            .await?
        {
            return Err(TournamentError::NotRegistered);
        }

        log::info!("Player {player_id} withdrew from tournament {tournament_id}");
        self.events.publish_change(
            Topic::Participants,
            ChangeAction::Delete,
            player_id,
            Some(tournament_id),
            &serde_json::json!({ "tournament_id": tournament_id, "player_id": player_id }),
        );
        Ok(())
    }

    /// Participants in registration order
    pub async fn participants(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Participant>> {
        self.get(tournament_id).await?;
        Ok(self.repo.list_participants(tournament_id).await?)
    }

    /// Leaderboard ordered by points, then wins
    pub async fn standings(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Standing>> {
        let ranked = rank_standings(self.participants(tournament_id).await?);
        let ids: Vec<PlayerId> = ranked.iter().map(|p| p.player_id).collect();
        let profiles = self.profiles_by_id(&ids).await?;

        Ok(ranked
            .into_iter()
            .enumerate()
            .map(|(index, p)| {
                let played = p.matches_played();
                Standing {
                    rank: index as u32 + 1,
                    player_id: p.player_id,
                    username: profiles.get(&p.player_id).map(|pr| pr.username.clone()),
                    status: p.status,
                    wins: p.wins,
                    losses: p.losses,
                    points: p.points,
                    matches_played: played,
                    win_rate: win_rate(p.wins, played),
                }
            })
            .collect())
    }

    /// Matches ordered by round, then match date
    pub async fn matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        self.get(tournament_id).await?;
        Ok(self.repo.list_matches(tournament_id).await?)
    }

    /// Pair every registered participant into a new round.
    ///
    /// The whole round (matches, pairing announcements, participant and
    /// tournament transitions) is committed at once; if any paired player
    /// changed state in the meantime nothing is written.
    pub async fn generate_round(
        &self,
        tournament_id: TournamentId,
        caller: PlayerId,
    ) -> TournamentResult<RoundReport> {
        let tournament = self.get(tournament_id).await?;
        self.ensure_organizer(&tournament, caller).await?;

        if tournament.status == TournamentStatus::Completed {
            return Err(TournamentError::InvalidState {
                expected: TournamentStatus::InProgress,
                actual: tournament.status,
            });
        }

        let waiting: Vec<Participant> = self
            .repo
            .list_participants(tournament_id)
            .await?
            .into_iter()
            .filter(|p| p.status == ParticipantStatus::Registered)
            .collect();

        if waiting.len() < 2 {
            log::warn!(
                "Cannot pair tournament {tournament_id}: {} participants waiting",
                waiting.len()
            );
            return Err(match tournament.status {
                TournamentStatus::Upcoming => TournamentError::InsufficientPlayers(waiting.len()),
                _ => TournamentError::NothingToPair(waiting.len()),
            });
        }

        let ids: Vec<PlayerId> = waiting.iter().map(|p| p.player_id).collect();
        let profiles = self.profiles_by_id(&ids).await?;
        let entrants = waiting
            .iter()
            .map(|p| {
                let rating = profiles
                    .get(&p.player_id)
                    .map_or(DEFAULT_SKILL_RATING, |pr| pr.skill_rating);
                Entrant::new(p.player_id, rating)
            })
            .collect();

        let pairings = pair_entrants(&self.config.pairing, entrants);
        let round = self.repo.max_round(tournament_id).await? + 1;

        let matches: Vec<Match> = pairings
            .pairs
            .iter()
            .map(|&(p1, p2)| Match::scheduled(tournament_id, p1, p2, round))
            .collect();
        let announcements = matches
            .iter()
            .map(|m| {
                ChatMessage::system(
                    m.id,
                    pairing_announcement(
                        round,
                        profiles.get(&m.player1_id),
                        profiles.get(&m.player2_id),
                    ),
                )
            })
            .collect();

        let plan = RoundPlan {
            tournament_id,
            round,
            matches,
            announcements,
        };
        self.repo.commit_round(&plan).await.inspect_err(|e| {
            log::warn!("Round {round} of tournament {tournament_id} was not committed: {e}");
        })?;

        log::info!(
            "Tournament {tournament_id} round {round}: {} matches ({} pairing), bye: {:?}",
            plan.matches.len(),
            self.config.pairing.name(),
            pairings.bye
        );
        self.publish_round(&tournament, &plan).await;

        Ok(RoundReport {
            tournament_id,
            round,
            matches: plan.matches,
            bye: pairings.bye,
        })
    }

    /// Close an in-progress tournament once no matches remain open
    pub async fn complete(
        &self,
        tournament_id: TournamentId,
        caller: PlayerId,
    ) -> TournamentResult<Tournament> {
        let tournament = self.get(tournament_id).await?;
        self.ensure_organizer(&tournament, caller).await?;
        expect_status(&tournament, TournamentStatus::InProgress)?;

        let open = self
            .repo
            .list_matches(tournament_id)
            .await?
            .iter()
            .filter(|m| m.status.is_open())
            .count();
        if open > 0 {
            return Err(TournamentError::MatchesOutstanding(open));
        }

        let moved = self
            .repo
            .transition_tournament(
                tournament_id,
                &[TournamentStatus::InProgress],
                TournamentStatus::Completed,
            )
            .await?;
        let tournament = self.get(tournament_id).await?;
        if !moved {
            return Err(TournamentError::InvalidState {
                expected: TournamentStatus::InProgress,
                actual: tournament.status,
            });
        }

        log::info!("Tournament {tournament_id} completed");
        self.publish_tournament(&tournament, ChangeAction::Update);
        Ok(tournament)
    }

    /// Replace the prize tiers of a tournament
    pub async fn set_prize_tiers(
        &self,
        tournament_id: TournamentId,
        caller: PlayerId,
        mut tiers: Vec<PrizeTier>,
    ) -> TournamentResult<Vec<PrizeTier>> {
        let tournament = self.get(tournament_id).await?;
        self.ensure_organizer(&tournament, caller).await?;
        if tournament.prize_distributed {
            return Err(TournamentError::PrizesAlreadyDistributed);
        }
        validate_tiers(&tiers)?;

        self.repo
            .replace_prize_tiers(tournament_id, &tiers)
            .await
            .map_err(already_distributed)?;

        tiers.sort_by_key(|t| t.position);
        log::info!(
            "Tournament {tournament_id} prize tiers set: {:?}",
            tiers
                .iter()
                .map(|t| (t.position, t.percentage))
                .collect::<Vec<_>>()
        );
        Ok(tiers)
    }

    pub async fn prize_tiers(&self, tournament_id: TournamentId) -> TournamentResult<Vec<PrizeTier>> {
        self.get(tournament_id).await?;
        Ok(self.repo.list_prize_tiers(tournament_id).await?)
    }

    /// Compute and record payouts for a completed tournament.
    ///
    /// Runs at most once per tournament; a second call fails with
    /// [`TournamentError::PrizesAlreadyDistributed`] and pays nothing.
    pub async fn distribute_prizes(
        &self,
        tournament_id: TournamentId,
        caller: PlayerId,
    ) -> TournamentResult<DistributionReport> {
        let tournament = self.get(tournament_id).await?;
        self.ensure_organizer(&tournament, caller).await?;
        expect_status(&tournament, TournamentStatus::Completed)?;
        if tournament.prize_distributed {
            return Err(TournamentError::PrizesAlreadyDistributed);
        }

        let tiers = self.repo.list_prize_tiers(tournament_id).await?;
        if tiers.is_empty() {
            return Err(TournamentError::NoPrizeTiers);
        }

        let ranked = rank_standings(self.repo.list_participants(tournament_id).await?);
        let report = compute_payouts(
            tournament_id,
            tournament.prize_pool,
            &tiers,
            &ranked,
            Utc::now(),
        );

        self.repo
            .record_distribution(tournament_id, &report.payouts)
            .await
            .map_err(already_distributed)?;

        for position in &report.skipped_positions {
            log::warn!(
                "Tournament {tournament_id}: no participant at rank {position}, tier skipped"
            );
        }
        log::info!(
            "Tournament {tournament_id} prizes distributed: {} payouts, {} undistributed",
            report.payouts.len(),
            report.undistributed
        );

        if let Ok(updated) = self.get(tournament_id).await {
            self.publish_tournament(&updated, ChangeAction::Update);
        }
        Ok(report)
    }

    /// Recorded payouts ordered by position
    pub async fn payouts(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Payout>> {
        self.get(tournament_id).await?;
        Ok(self.repo.list_payouts(tournament_id).await?)
    }

    async fn require_profile(&self, player_id: PlayerId) -> TournamentResult<Profile> {
        self.repo
            .get_profile(player_id)
            .await?
            .ok_or(TournamentError::ProfileRequired)
    }

    /// Creator or administrator
    async fn ensure_organizer(
        &self,
        tournament: &Tournament,
        caller: PlayerId,
    ) -> TournamentResult<()> {
        if tournament.creator_id == caller || self.repo.is_admin(caller).await? {
            return Ok(());
        }
        log::warn!(
            "Player {caller} is not allowed to manage tournament {}",
            tournament.id
        );
        Err(TournamentError::Unauthorized)
    }

    async fn profiles_by_id(
        &self,
        ids: &[PlayerId],
    ) -> TournamentResult<HashMap<PlayerId, Profile>> {
        Ok(self
            .repo
            .get_profiles(ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect())
    }

    fn publish_tournament(&self, tournament: &Tournament, action: ChangeAction) {
        self.events
            .publish_change(Topic::Tournaments, action, tournament.id, None, tournament);
    }

    async fn publish_round(&self, before: &Tournament, plan: &RoundPlan) {
        if before.status == TournamentStatus::Upcoming {
            if let Ok(started) = self.get(plan.tournament_id).await {
                self.publish_tournament(&started, ChangeAction::Update);
            }
        }
        for m in &plan.matches {
            self.events.publish_change(
                Topic::Matches,
                ChangeAction::Insert,
                m.id,
                Some(m.tournament_id),
                m,
            );
        }
        for message in &plan.announcements {
            self.events.publish_change(
                Topic::ChatMessages,
                ChangeAction::Insert,
                message.id,
                Some(message.match_id),
                message,
            );
        }
        for player_id in plan.paired_players() {
            self.events.publish_change(
                Topic::Participants,
                ChangeAction::Update,
                player_id,
                Some(plan.tournament_id),
                &serde_json::json!({
                    "tournament_id": plan.tournament_id,
                    "player_id": player_id,
                    "status": ParticipantStatus::InMatch,
                }),
            );
        }
    }
}

fn expect_status(tournament: &Tournament, expected: TournamentStatus) -> TournamentResult<()> {
    if tournament.status == expected {
        Ok(())
    } else {
        Err(TournamentError::InvalidState {
            expected,
            actual: tournament.status,
        })
    }
}

/// A lost distribution race surfaces as a store conflict
fn already_distributed(err: StoreError) -> TournamentError {
    match err {
        StoreError::Conflict(_) => TournamentError::PrizesAlreadyDistributed,
        other => TournamentError::Store(other),
    }
}

fn validate_new_tournament(details: &NewTournament) -> TournamentResult<()> {
    let title = details.title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(TournamentError::InvalidInput(format!(
            "title must be 1-{MAX_TITLE_LEN} characters"
        )));
    }
    let game_type = details.game_type.trim();
    if game_type.is_empty() || game_type.chars().count() > MAX_GAME_TYPE_LEN {
        return Err(TournamentError::InvalidInput(format!(
            "game type must be 1-{MAX_GAME_TYPE_LEN} characters"
        )));
    }
    if !(2..=MAX_PARTICIPANTS).contains(&details.max_participants) {
        return Err(TournamentError::InvalidInput(format!(
            "max participants must be between 2 and {MAX_PARTICIPANTS}"
        )));
    }
    if !(0..=MAX_PRIZE_POOL).contains(&details.prize_pool) {
        return Err(TournamentError::InvalidInput(format!(
            "prize pool must be between 0 and {MAX_PRIZE_POOL}"
        )));
    }
    if details.end_date.is_some_and(|end| end < details.start_date) {
        return Err(TournamentError::InvalidInput(
            "end date must not be before the start date".to_string(),
        ));
    }
    if details.match_time_limit_minutes == Some(0) {
        return Err(TournamentError::InvalidInput(
            "match time limit must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Rounded win percentage
fn win_rate(wins: u32, played: u32) -> u32 {
    if played == 0 {
        0
    } else {
        (wins * 100 + played / 2) / played
    }
}

fn pairing_announcement(round: u32, player1: Option<&Profile>, player2: Option<&Profile>) -> String {
    let name = |p: Option<&Profile>| p.map_or("unknown player", |p| p.username.as_str()).to_string();
    let game_id = |p: Option<&Profile>| {
        p.and_then(|p| p.game_id.clone())
            .unwrap_or_else(|| "not set".to_string())
    };
    format!(
        "Round {round} match: {} vs {}. Game IDs: {} = {}, {} = {}. Good luck!",
        name(player1),
        name(player2),
        name(player1),
        game_id(player1),
        name(player2),
        game_id(player2),
    )
}
