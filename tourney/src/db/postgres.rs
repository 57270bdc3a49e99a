//! PostgreSQL [`Repository`] implementation.
//!
//! Single statements run under [`with_default_timeout`]; the atomic
//! lifecycle writes run in one transaction under
//! [`with_transaction_timeout`] and lock the rows they re-validate with
//! `SELECT ... FOR UPDATE`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::str::FromStr;

use super::errors::{StoreError, StoreResult};
use super::repository::{DisputeFilter, MatchCompletion, Repository, RoundPlan};
use super::timeouts::{with_default_timeout, with_transaction_timeout};
use crate::direct_message::models::DirectMessage;
use crate::dispute::models::{Dispute, DisputeId, DisputeMessage, DisputeStatus};
use crate::matches::models::{ChatMessage, Match, MatchId, MatchStatus};
use crate::profile::models::{PlayerId, Profile};
use crate::tournament::models::{
    Participant, ParticipantStatus, Payout, PrizeTier, Tournament, TournamentId, TournamentStatus,
};

const PROFILE_COLUMNS: &str =
    "id, username, avatar_url, game_id, skill_rating, is_admin, created_at, updated_at";

const TOURNAMENT_COLUMNS: &str = "id, creator_id, title, description, game_type, max_participants,
    start_date, end_date, status, prize_pool, prize_distributed, tournament_rules,
    dispute_resolution_rules, match_time_limit_minutes, created_at, updated_at";

const PARTICIPANT_COLUMNS: &str =
    "tournament_id, player_id, status, wins, losses, points, registration_date";

const MATCH_COLUMNS: &str = "id, tournament_id, player1_id, player2_id, round, score_player1,
    score_player2, winner_id, status, match_date, created_at, updated_at";

const DISPUTE_COLUMNS: &str = "id, match_id, reported_by_id, against_id, kind, title, description,
    status, resolution, resolution_type, admin_notes, created_at, updated_at";

/// Repository backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_db_int(value: u32, column: &str) -> StoreResult<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{column} is out of range: {value}")))
}

fn from_db_int(value: i32, column: &str) -> StoreResult<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{column} is negative: {value}")))
}

fn parse_text<T: FromStr<Err = String>>(value: String) -> StoreResult<T> {
    value.parse().map_err(StoreError::InvalidData)
}

fn status_texts<S>(statuses: &[S], as_str: fn(&S) -> &'static str) -> Vec<&'static str> {
    statuses.iter().map(as_str).collect()
}

fn profile_from_row(row: &PgRow) -> StoreResult<Profile> {
    Ok(Profile {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        avatar_url: row.try_get("avatar_url")?,
        game_id: row.try_get("game_id")?,
        skill_rating: row.try_get("skill_rating")?,
        is_admin: row.try_get("is_admin")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn tournament_from_row(row: &PgRow) -> StoreResult<Tournament> {
    Ok(Tournament {
        id: row.try_get("id")?,
        creator_id: row.try_get("creator_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        game_type: row.try_get("game_type")?,
        max_participants: from_db_int(row.try_get("max_participants")?, "max_participants")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        status: parse_text(row.try_get("status")?)?,
        prize_pool: row.try_get("prize_pool")?,
        prize_distributed: row.try_get("prize_distributed")?,
        tournament_rules: row.try_get("tournament_rules")?,
        dispute_resolution_rules: row.try_get("dispute_resolution_rules")?,
        match_time_limit_minutes: row
            .try_get::<Option<i32>, _>("match_time_limit_minutes")?
            .map(|v| from_db_int(v, "match_time_limit_minutes"))
            .transpose()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn participant_from_row(row: &PgRow) -> StoreResult<Participant> {
    Ok(Participant {
        tournament_id: row.try_get("tournament_id")?,
        player_id: row.try_get("player_id")?,
        status: parse_text(row.try_get("status")?)?,
        wins: from_db_int(row.try_get("wins")?, "wins")?,
        losses: from_db_int(row.try_get("losses")?, "losses")?,
        points: from_db_int(row.try_get("points")?, "points")?,
        registration_date: row.try_get("registration_date")?,
    })
}

fn match_from_row(row: &PgRow) -> StoreResult<Match> {
    let score = |column: &str| -> StoreResult<Option<u32>> {
        row.try_get::<Option<i32>, _>(column)?
            .map(|v| from_db_int(v, column))
            .transpose()
    };
    Ok(Match {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        player1_id: row.try_get("player1_id")?,
        player2_id: row.try_get("player2_id")?,
        round: from_db_int(row.try_get("round")?, "round")?,
        score_player1: score("score_player1")?,
        score_player2: score("score_player2")?,
        winner_id: row.try_get("winner_id")?,
        status: parse_text(row.try_get("status")?)?,
        match_date: row.try_get("match_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn chat_from_row(row: &PgRow) -> StoreResult<ChatMessage> {
    Ok(ChatMessage {
        id: row.try_get("id")?,
        match_id: row.try_get("match_id")?,
        sender_id: row.try_get("sender_id")?,
        message: row.try_get("message")?,
        is_system_message: row.try_get("is_system_message")?,
        created_at: row.try_get("created_at")?,
    })
}

fn payout_from_row(row: &PgRow) -> StoreResult<Payout> {
    Ok(Payout {
        tournament_id: row.try_get("tournament_id")?,
        player_id: row.try_get("player_id")?,
        position: from_db_int(row.try_get("position")?, "position")?,
        percentage: from_db_int(row.try_get("percentage")?, "percentage")?,
        amount: row.try_get("amount")?,
        created_at: row.try_get("created_at")?,
    })
}

fn dispute_from_row(row: &PgRow) -> StoreResult<Dispute> {
    Ok(Dispute {
        id: row.try_get("id")?,
        match_id: row.try_get("match_id")?,
        reported_by_id: row.try_get("reported_by_id")?,
        against_id: row.try_get("against_id")?,
        kind: parse_text(row.try_get("kind")?)?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: parse_text(row.try_get("status")?)?,
        resolution: row.try_get("resolution")?,
        resolution_type: row
            .try_get::<Option<String>, _>("resolution_type")?
            .map(parse_text)
            .transpose()?,
        admin_notes: row.try_get("admin_notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn dispute_message_from_row(row: &PgRow) -> StoreResult<DisputeMessage> {
    Ok(DisputeMessage {
        id: row.try_get("id")?,
        dispute_id: row.try_get("dispute_id")?,
        sender_id: row.try_get("sender_id")?,
        message: row.try_get("message")?,
        created_at: row.try_get("created_at")?,
    })
}

fn direct_message_from_row(row: &PgRow) -> StoreResult<DirectMessage> {
    Ok(DirectMessage {
        id: row.try_get("id")?,
        sender_id: row.try_get("sender_id")?,
        receiver_id: row.try_get("receiver_id")?,
        message: row.try_get("message")?,
        read: row.try_get("read")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Lock the tournament row and return its status and distribution flag.
async fn lock_tournament(
    tx: &mut Transaction<'_, Postgres>,
    tournament_id: TournamentId,
) -> StoreResult<(TournamentStatus, bool)> {
    let row = sqlx::query(
        "SELECT status, prize_distributed FROM tournaments WHERE id = $1 FOR UPDATE",
    )
    .bind(tournament_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(StoreError::NotFound {
        entity: "tournament",
    })?;

    Ok((
        parse_text(row.try_get("status")?)?,
        row.try_get("prize_distributed")?,
    ))
}

/// Lock an open match row
async fn lock_open_match(
    tx: &mut Transaction<'_, Postgres>,
    match_id: MatchId,
) -> StoreResult<Match> {
    let row = sqlx::query(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 FOR UPDATE"
    ))
    .bind(match_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(StoreError::NotFound { entity: "match" })?;

    let m = match_from_row(&row)?;
    if !m.status.is_open() {
        return Err(StoreError::conflict(format!("match is {}", m.status)));
    }
    Ok(m)
}

#[async_trait]
impl Repository for PgRepository {
    async fn upsert_profile(&self, profile: &Profile) -> StoreResult<()> {
        with_default_timeout(async {
            sqlx::query(
                "INSERT INTO profiles (id, username, avatar_url, game_id, skill_rating, is_admin, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (id) DO UPDATE SET
                    username = EXCLUDED.username,
                    avatar_url = EXCLUDED.avatar_url,
                    game_id = EXCLUDED.game_id,
                    skill_rating = EXCLUDED.skill_rating,
                    is_admin = EXCLUDED.is_admin,
                    updated_at = EXCLUDED.updated_at",
            )
            .bind(profile.id)
            .bind(&profile.username)
            .bind(&profile.avatar_url)
            .bind(&profile.game_id)
            .bind(profile.skill_rating)
            .bind(profile.is_admin)
            .bind(profile.created_at)
            .bind(profile.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_insert(e, "username"))?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn get_profile(&self, player_id: PlayerId) -> StoreResult<Option<Profile>> {
        let row = with_default_timeout(
            sqlx::query(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"))
                .bind(player_id)
                .fetch_optional(&self.pool),
        )
        .await?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn get_profiles(&self, player_ids: &[PlayerId]) -> StoreResult<Vec<Profile>> {
        let rows = with_default_timeout(
            sqlx::query(&format!(
                "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ANY($1)"
            ))
            .bind(player_ids)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(profile_from_row).collect()
    }

    async fn find_profile_by_username(&self, username: &str) -> StoreResult<Option<Profile>> {
        let row = with_default_timeout(
            sqlx::query(&format!(
                "SELECT {PROFILE_COLUMNS} FROM profiles WHERE LOWER(username) = LOWER($1)"
            ))
            .bind(username)
            .fetch_optional(&self.pool),
        )
        .await?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn insert_tournament(&self, t: &Tournament) -> StoreResult<()> {
        with_default_timeout(async {
            sqlx::query(&format!(
                "INSERT INTO tournaments ({TOURNAMENT_COLUMNS})
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
            ))
            .bind(t.id)
            .bind(t.creator_id)
            .bind(&t.title)
            .bind(&t.description)
            .bind(&t.game_type)
            .bind(to_db_int(t.max_participants, "max_participants")?)
            .bind(t.start_date)
            .bind(t.end_date)
            .bind(t.status.as_str())
            .bind(t.prize_pool)
            .bind(t.prize_distributed)
            .bind(&t.tournament_rules)
            .bind(&t.dispute_resolution_rules)
            .bind(
                t.match_time_limit_minutes
                    .map(|v| to_db_int(v, "match_time_limit_minutes"))
                    .transpose()?,
            )
            .bind(t.created_at)
            .bind(t.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_insert(e, "tournament"))?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn get_tournament(&self, tournament_id: TournamentId) -> StoreResult<Option<Tournament>> {
        let row = with_default_timeout(
            sqlx::query(&format!(
                "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"
            ))
            .bind(tournament_id)
            .fetch_optional(&self.pool),
        )
        .await?;
        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> StoreResult<Vec<Tournament>> {
        let rows = with_default_timeout(
            sqlx::query(&format!(
                "SELECT {TOURNAMENT_COLUMNS} FROM tournaments
                 WHERE ($1::TEXT IS NULL OR status = $1)
                 ORDER BY start_date DESC"
            ))
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(tournament_from_row).collect()
    }

    async fn transition_tournament(
        &self,
        tournament_id: TournamentId,
        from: &[TournamentStatus],
        to: TournamentStatus,
    ) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query(
                "UPDATE tournaments SET status = $2, updated_at = NOW()
                 WHERE id = $1 AND status = ANY($3)",
            )
            .bind(tournament_id)
            .bind(to.as_str())
            .bind(status_texts(from, TournamentStatus::as_str))
            .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_participant(&self, p: &Participant) -> StoreResult<()> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;

            let row = sqlx::query(
                "SELECT status, max_participants FROM tournaments WHERE id = $1 FOR UPDATE",
            )
            .bind(p.tournament_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "tournament",
            })?;
            let status: TournamentStatus = parse_text(row.try_get("status")?)?;
            if status != TournamentStatus::Upcoming {
                return Err(StoreError::conflict(format!("tournament is {status}")));
            }
            let max_participants: i32 = row.try_get("max_participants")?;

            let count = sqlx::query(
                "SELECT COUNT(*) AS registered FROM tournament_participants WHERE tournament_id = $1",
            )
            .bind(p.tournament_id)
            .fetch_one(&mut *tx)
            .await?;
            let registered: i64 = count.try_get("registered")?;
            if registered >= i64::from(max_participants) {
                return Err(StoreError::conflict("tournament is full"));
            }

            sqlx::query(&format!(
                "INSERT INTO tournament_participants ({PARTICIPANT_COLUMNS})
                 VALUES ($1, $2, $3, $4, $5, $6, $7)"
            ))
            .bind(p.tournament_id)
            .bind(p.player_id)
            .bind(p.status.as_str())
            .bind(to_db_int(p.wins, "wins")?)
            .bind(to_db_int(p.losses, "losses")?)
            .bind(to_db_int(p.points, "points")?)
            .bind(p.registration_date)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::from_insert(e, "participant"))?;

            tx.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn remove_registered_participant(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query(
                "DELETE FROM tournament_participants
                 WHERE tournament_id = $1 AND player_id = $2 AND status = 'registered'",
            )
            .bind(tournament_id)
            .bind(player_id)
            .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_participants(&self, tournament_id: TournamentId) -> StoreResult<Vec<Participant>> {
        let rows = with_default_timeout(
            sqlx::query(&format!(
                "SELECT {PARTICIPANT_COLUMNS} FROM tournament_participants
                 WHERE tournament_id = $1
                 ORDER BY registration_date, player_id"
            ))
            .bind(tournament_id)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(participant_from_row).collect()
    }

    async fn max_round(&self, tournament_id: TournamentId) -> StoreResult<u32> {
        let row = with_default_timeout(
            sqlx::query("SELECT COALESCE(MAX(round), 0) AS max_round FROM matches WHERE tournament_id = $1")
                .bind(tournament_id)
                .fetch_one(&self.pool),
        )
        .await?;
        from_db_int(row.try_get("max_round")?, "round")
    }

    async fn commit_round(&self, plan: &RoundPlan) -> StoreResult<()> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;

            let (status, _) = lock_tournament(&mut tx, plan.tournament_id).await?;
            if !matches!(
                status,
                TournamentStatus::Upcoming | TournamentStatus::InProgress
            ) {
                return Err(StoreError::conflict(format!("tournament is {status}")));
            }

            let paired: Vec<PlayerId> = plan.paired_players().collect();
            let rows = sqlx::query(
                "SELECT player_id, status FROM tournament_participants
                 WHERE tournament_id = $1 AND player_id = ANY($2)
                 FOR UPDATE",
            )
            .bind(plan.tournament_id)
            .bind(&paired[..])
            .fetch_all(&mut *tx)
            .await?;

            if rows.len() != paired.len() {
                return Err(StoreError::conflict("a paired participant left the tournament"));
            }
            for row in &rows {
                let status: ParticipantStatus = parse_text(row.try_get("status")?)?;
                if status != ParticipantStatus::Registered {
                    let player_id: PlayerId = row.try_get("player_id")?;
                    return Err(StoreError::conflict(format!(
                        "participant {player_id} is no longer registered"
                    )));
                }
            }

            for m in &plan.matches {
                sqlx::query(&format!(
                    "INSERT INTO matches ({MATCH_COLUMNS})
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
                ))
                .bind(m.id)
                .bind(m.tournament_id)
                .bind(m.player1_id)
                .bind(m.player2_id)
                .bind(to_db_int(m.round, "round")?)
                .bind(m.score_player1.map(|v| to_db_int(v, "score_player1")).transpose()?)
                .bind(m.score_player2.map(|v| to_db_int(v, "score_player2")).transpose()?)
                .bind(m.winner_id)
                .bind(m.status.as_str())
                .bind(m.match_date)
                .bind(m.created_at)
                .bind(m.updated_at)
                .execute(&mut *tx)
                .await?;
            }

            for message in &plan.announcements {
                insert_chat(&mut tx, message).await?;
            }

            sqlx::query(
                "UPDATE tournament_participants SET status = 'in_match'
                 WHERE tournament_id = $1 AND player_id = ANY($2)",
            )
            .bind(plan.tournament_id)
            .bind(&paired[..])
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE tournaments SET status = 'in_progress', updated_at = NOW() WHERE id = $1",
            )
            .bind(plan.tournament_id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn get_match(&self, match_id: MatchId) -> StoreResult<Option<Match>> {
        let row = with_default_timeout(
            sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
                .bind(match_id)
                .fetch_optional(&self.pool),
        )
        .await?;
        row.as_ref().map(match_from_row).transpose()
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> StoreResult<Vec<Match>> {
        let rows = with_default_timeout(
            sqlx::query(&format!(
                "SELECT {MATCH_COLUMNS} FROM matches
                 WHERE tournament_id = $1
                 ORDER BY round, match_date, id"
            ))
            .bind(tournament_id)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(match_from_row).collect()
    }

    async fn transition_match(
        &self,
        match_id: MatchId,
        from: &[MatchStatus],
        to: MatchStatus,
    ) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query(
                "UPDATE matches SET status = $2, updated_at = NOW()
                 WHERE id = $1 AND status = ANY($3)",
            )
            .bind(match_id)
            .bind(to.as_str())
            .bind(status_texts(from, MatchStatus::as_str))
            .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete_match(&self, completion: &MatchCompletion) -> StoreResult<Match> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;
            lock_open_match(&mut tx, completion.match_id).await?;

            let row = sqlx::query(&format!(
                "UPDATE matches
                 SET score_player1 = $2, score_player2 = $3, winner_id = $4,
                     status = 'completed', updated_at = $5
                 WHERE id = $1
                 RETURNING {MATCH_COLUMNS}"
            ))
            .bind(completion.match_id)
            .bind(to_db_int(completion.score_player1, "score_player1")?)
            .bind(to_db_int(completion.score_player2, "score_player2")?)
            .bind(completion.winner_id)
            .bind(completion.completed_at)
            .fetch_one(&mut *tx)
            .await?;
            let completed = match_from_row(&row)?;

            let winner = sqlx::query(
                "UPDATE tournament_participants
                 SET wins = wins + 1, points = points + $3, status = 'registered'
                 WHERE tournament_id = $1 AND player_id = $2",
            )
            .bind(completion.tournament_id)
            .bind(completion.winner_id)
            .bind(to_db_int(completion.points_per_win, "points")?)
            .execute(&mut *tx)
            .await?;

            let loser = sqlx::query(
                "UPDATE tournament_participants
                 SET losses = losses + 1, points = points + $3, status = 'eliminated'
                 WHERE tournament_id = $1 AND player_id = $2",
            )
            .bind(completion.tournament_id)
            .bind(completion.loser_id)
            .bind(to_db_int(completion.points_per_loss, "points")?)
            .execute(&mut *tx)
            .await?;

            if winner.rows_affected() == 0 || loser.rows_affected() == 0 {
                return Err(StoreError::NotFound {
                    entity: "participant",
                });
            }

            tx.commit().await?;
            Ok::<_, StoreError>(completed)
        })
        .await
    }

    async fn cancel_match(&self, match_id: MatchId) -> StoreResult<Match> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;
            lock_open_match(&mut tx, match_id).await?;

            let row = sqlx::query(&format!(
                "UPDATE matches SET status = 'cancelled', updated_at = NOW()
                 WHERE id = $1
                 RETURNING {MATCH_COLUMNS}"
            ))
            .bind(match_id)
            .fetch_one(&mut *tx)
            .await?;
            let cancelled = match_from_row(&row)?;

            sqlx::query(
                "UPDATE tournament_participants SET status = 'registered'
                 WHERE tournament_id = $1 AND player_id = ANY($2) AND status = 'in_match'",
            )
            .bind(cancelled.tournament_id)
            .bind(vec![cancelled.player1_id, cancelled.player2_id])
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok::<_, StoreError>(cancelled)
        })
        .await
    }

    async fn insert_chat_message(&self, message: &ChatMessage) -> StoreResult<()> {
        with_default_timeout(async {
            let mut tx = self.pool.begin().await?;
            insert_chat(&mut tx, message).await?;
            tx.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn list_chat_messages(&self, match_id: MatchId) -> StoreResult<Vec<ChatMessage>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT id, match_id, sender_id, message, is_system_message, created_at
                 FROM match_chat WHERE match_id = $1
                 ORDER BY created_at",
            )
            .bind(match_id)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(chat_from_row).collect()
    }

    async fn replace_prize_tiers(
        &self,
        tournament_id: TournamentId,
        tiers: &[PrizeTier],
    ) -> StoreResult<()> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;

            let (_, distributed) = lock_tournament(&mut tx, tournament_id).await?;
            if distributed {
                return Err(StoreError::conflict("prizes already distributed"));
            }

            sqlx::query("DELETE FROM prize_tiers WHERE tournament_id = $1")
                .bind(tournament_id)
                .execute(&mut *tx)
                .await?;

            for tier in tiers {
                sqlx::query(
                    "INSERT INTO prize_tiers (tournament_id, position, percentage) VALUES ($1, $2, $3)",
                )
                .bind(tournament_id)
                .bind(to_db_int(tier.position, "position")?)
                .bind(to_db_int(tier.percentage, "percentage")?)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn list_prize_tiers(&self, tournament_id: TournamentId) -> StoreResult<Vec<PrizeTier>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT position, percentage FROM prize_tiers
                 WHERE tournament_id = $1 ORDER BY position",
            )
            .bind(tournament_id)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter()
            .map(|row| -> StoreResult<PrizeTier> {
                Ok(PrizeTier::new(
                    from_db_int(row.try_get("position")?, "position")?,
                    from_db_int(row.try_get("percentage")?, "percentage")?,
                ))
            })
            .collect()
    }

    async fn record_distribution(
        &self,
        tournament_id: TournamentId,
        payouts: &[Payout],
    ) -> StoreResult<()> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;

            let (_, distributed) = lock_tournament(&mut tx, tournament_id).await?;
            if distributed {
                return Err(StoreError::conflict("prizes already distributed"));
            }

            for payout in payouts {
                sqlx::query(
                    "INSERT INTO prize_payouts (tournament_id, player_id, position, percentage, amount, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(payout.tournament_id)
                .bind(payout.player_id)
                .bind(to_db_int(payout.position, "position")?)
                .bind(to_db_int(payout.percentage, "percentage")?)
                .bind(payout.amount)
                .bind(payout.created_at)
                .execute(&mut *tx)
                .await?;
            }

            sqlx::query(
                "UPDATE tournaments SET prize_distributed = TRUE, updated_at = NOW() WHERE id = $1",
            )
            .bind(tournament_id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn list_payouts(&self, tournament_id: TournamentId) -> StoreResult<Vec<Payout>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT tournament_id, player_id, position, percentage, amount, created_at
                 FROM prize_payouts WHERE tournament_id = $1 ORDER BY position",
            )
            .bind(tournament_id)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(payout_from_row).collect()
    }

    async fn insert_dispute(&self, d: &Dispute) -> StoreResult<()> {
        with_default_timeout(async {
            sqlx::query(&format!(
                "INSERT INTO disputes ({DISPUTE_COLUMNS})
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
            ))
            .bind(d.id)
            .bind(d.match_id)
            .bind(d.reported_by_id)
            .bind(d.against_id)
            .bind(d.kind.as_str())
            .bind(&d.title)
            .bind(&d.description)
            .bind(d.status.as_str())
            .bind(&d.resolution)
            .bind(d.resolution_type.map(|r| r.as_str()))
            .bind(&d.admin_notes)
            .bind(d.created_at)
            .bind(d.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_insert(e, "dispute"))?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn get_dispute(&self, dispute_id: DisputeId) -> StoreResult<Option<Dispute>> {
        let row = with_default_timeout(
            sqlx::query(&format!("SELECT {DISPUTE_COLUMNS} FROM disputes WHERE id = $1"))
                .bind(dispute_id)
                .fetch_optional(&self.pool),
        )
        .await?;
        row.as_ref().map(dispute_from_row).transpose()
    }

    async fn list_disputes(&self, filter: &DisputeFilter) -> StoreResult<Vec<Dispute>> {
        let rows = with_default_timeout(
            sqlx::query(&format!(
                "SELECT {DISPUTE_COLUMNS} FROM disputes
                 WHERE ($1::UUID IS NULL OR match_id = $1)
                   AND ($2::UUID IS NULL OR reported_by_id = $2 OR against_id = $2)
                   AND ($3::TEXT IS NULL OR status = $3)
                 ORDER BY created_at DESC"
            ))
            .bind(filter.match_id)
            .bind(filter.involving)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(dispute_from_row).collect()
    }

    async fn update_dispute(&self, d: &Dispute, from: &[DisputeStatus]) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query(
                "UPDATE disputes
                 SET status = $2, resolution = $3, resolution_type = $4, admin_notes = $5, updated_at = $6
                 WHERE id = $1 AND status = ANY($7)",
            )
            .bind(d.id)
            .bind(d.status.as_str())
            .bind(&d.resolution)
            .bind(d.resolution_type.map(|r| r.as_str()))
            .bind(&d.admin_notes)
            .bind(d.updated_at)
            .bind(status_texts(from, DisputeStatus::as_str))
            .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_dispute_message(&self, message: &DisputeMessage) -> StoreResult<()> {
        with_default_timeout(async {
            sqlx::query(
                "INSERT INTO dispute_messages (id, dispute_id, sender_id, message, created_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(message.id)
            .bind(message.dispute_id)
            .bind(message.sender_id)
            .bind(&message.message)
            .bind(message.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_insert(e, "dispute message"))?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn list_dispute_messages(
        &self,
        dispute_id: DisputeId,
    ) -> StoreResult<Vec<DisputeMessage>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT id, dispute_id, sender_id, message, created_at
                 FROM dispute_messages WHERE dispute_id = $1 ORDER BY created_at",
            )
            .bind(dispute_id)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(dispute_message_from_row).collect()
    }

    async fn insert_direct_message(&self, message: &DirectMessage) -> StoreResult<()> {
        with_default_timeout(async {
            sqlx::query(
                "INSERT INTO direct_messages (id, sender_id, receiver_id, message, read, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(message.id)
            .bind(message.sender_id)
            .bind(message.receiver_id)
            .bind(&message.message)
            .bind(message.read)
            .bind(message.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_insert(e, "direct message"))?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn list_conversation(&self, a: PlayerId, b: PlayerId) -> StoreResult<Vec<DirectMessage>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT id, sender_id, receiver_id, message, read, created_at
                 FROM direct_messages
                 WHERE (sender_id = $1 AND receiver_id = $2)
                    OR (sender_id = $2 AND receiver_id = $1)
                 ORDER BY created_at",
            )
            .bind(a)
            .bind(b)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(direct_message_from_row).collect()
    }

    async fn mark_conversation_read(&self, reader: PlayerId, sender: PlayerId) -> StoreResult<u64> {
        let result = with_default_timeout(
            sqlx::query(
                "UPDATE direct_messages SET read = TRUE
                 WHERE receiver_id = $1 AND sender_id = $2 AND NOT read",
            )
            .bind(reader)
            .bind(sender)
            .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> StoreResult<()> {
        with_default_timeout(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }
}

async fn insert_chat(tx: &mut Transaction<'_, Postgres>, message: &ChatMessage) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO match_chat (id, match_id, sender_id, message, is_system_message, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(message.id)
    .bind(message.match_id)
    .bind(message.sender_id)
    .bind(&message.message)
    .bind(message.is_system_message)
    .bind(message.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
