//! Integration tests for match score submission
//!
//! Covers winner selection, tie rejection, state guards, participant checks
//! and the standings updates that ride along with a completed match.

#[cfg(test)]
mod score_tests {
    use std::sync::Arc;

    use tourney::config::CompetitionConfig;
    use tourney::db::{MemoryRepository, Repository};
    use tourney::errors::{Classify, ErrorKind};
    use tourney::events::EventHub;
    use tourney::matches::{Match, MatchError, MatchManager, MatchStatus, ScoreReport};
    use tourney::profile::{PlayerId, Profile};
    use tourney::tournament::{NewTournament, ParticipantStatus, TournamentManager};
    use uuid::Uuid;

    struct Fixture {
        repo: Arc<MemoryRepository>,
        tournaments: TournamentManager,
        matches: MatchManager,
        organizer: PlayerId,
    }

    async fn fixture() -> Fixture {
        let repo = Arc::new(MemoryRepository::new());
        let events = EventHub::default();
        let config = CompetitionConfig::default();
        let organizer = Uuid::new_v4();
        repo.upsert_profile(&Profile::new(organizer, "organizer"))
            .await
            .unwrap();
        Fixture {
            tournaments: TournamentManager::new(repo.clone(), events.clone(), config),
            matches: MatchManager::new(repo.clone(), events, config),
            repo,
            organizer,
        }
    }

    impl Fixture {
        /// One paired match between two fresh players
        async fn paired_match(&self) -> Match {
            let tournament = self
                .tournaments
                .create(self.organizer, NewTournament::new("Duel", "chess", 2))
                .await
                .unwrap();
            for name in ["alpha", "bravo"] {
                let id = Uuid::new_v4();
                let profile = Profile::new(id, format!("{name}_{}", id.simple()));
                self.repo.upsert_profile(&profile).await.unwrap();
                self.tournaments.join(tournament.id, profile.id).await.unwrap();
            }
            let round = self
                .tournaments
                .generate_round(tournament.id, self.organizer)
                .await
                .unwrap();
            round.matches[0].clone()
        }
    }

    #[tokio::test]
    async fn test_higher_score_wins() {
        let fx = fixture().await;
        for (a, b) in [(3u32, 1u32), (0, 2), (10, 9), (1, 100)] {
            let m = fx.paired_match().await;
            let done = fx
                .matches
                .submit_score(m.id, m.player1_id, ScoreReport::new(a, b))
                .await
                .unwrap();

            let expected = if a > b { m.player1_id } else { m.player2_id };
            assert_eq!(done.winner_id, Some(expected));
            assert_eq!(done.status, MatchStatus::Completed);
            assert_eq!(done.score_player1, Some(a));
            assert_eq!(done.score_player2, Some(b));
        }
    }

    #[tokio::test]
    async fn test_tie_is_rejected() {
        let fx = fixture().await;
        let m = fx.paired_match().await;

        let err = fx
            .matches
            .submit_score(m.id, m.player2_id, ScoreReport::new(2, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::TieNotAllowed));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(fx.matches.get(m.id).await.unwrap().status, MatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_non_participant_is_rejected() {
        let fx = fixture().await;
        let m = fx.paired_match().await;

        let err = fx
            .matches
            .submit_score(m.id, fx.organizer, ScoreReport::new(1, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::NotParticipant));
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_closed_match_is_rejected() {
        let fx = fixture().await;
        let m = fx.paired_match().await;
        fx.matches
            .submit_score(m.id, m.player1_id, ScoreReport::new(2, 0))
            .await
            .unwrap();

        let err = fx
            .matches
            .submit_score(m.id, m.player2_id, ScoreReport::new(0, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::InvalidState(MatchStatus::Completed)));

        let other = fx.paired_match().await;
        fx.matches.cancel(other.id, fx.organizer).await.unwrap();
        let err = fx
            .matches
            .submit_score(other.id, other.player1_id, ScoreReport::new(2, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::InvalidState(MatchStatus::Cancelled)));
    }

    #[tokio::test]
    async fn test_in_progress_match_accepts_score() {
        let fx = fixture().await;
        let m = fx.paired_match().await;

        let started = fx.matches.start(m.id, m.player2_id).await.unwrap();
        assert_eq!(started.status, MatchStatus::InProgress);
        assert!(matches!(
            fx.matches.start(m.id, m.player1_id).await,
            Err(MatchError::InvalidState(MatchStatus::InProgress))
        ));

        let done = fx
            .matches
            .submit_score(m.id, m.player2_id, ScoreReport::new(1, 4))
            .await
            .unwrap();
        assert_eq!(done.winner_id, Some(m.player2_id));
    }

    #[tokio::test]
    async fn test_scores_beyond_storage_range_leave_match_open() {
        let fx = fixture().await;
        let m = fx.paired_match().await;

        let err = fx
            .matches
            .submit_score(m.id, m.player1_id, ScoreReport::new(3_000_000_000, 2_147_483_648))
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::InvalidScore(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);

        let current = fx.matches.get(m.id).await.unwrap();
        assert!(current.status.is_open());
        assert_eq!(current.winner_id, None);
    }

    #[tokio::test]
    async fn test_text_scores_are_parsed() {
        let fx = fixture().await;
        let m = fx.paired_match().await;

        for bad in ["", "abc", "-1", "2.5", "2147483648", "3000000000"] {
            let err = fx
                .matches
                .submit_score_text(m.id, m.player1_id, bad, "1")
                .await
                .unwrap_err();
            assert!(matches!(err, MatchError::InvalidScore(_)), "{bad:?}");
        }

        let done = fx
            .matches
            .submit_score_text(m.id, m.player1_id, " 5 ", "3")
            .await
            .unwrap();
        assert_eq!(done.winner_id, Some(m.player1_id));
    }

    #[tokio::test]
    async fn test_standings_follow_results() {
        let fx = fixture().await;
        let m = fx.paired_match().await;
        fx.matches
            .submit_score(m.id, m.player1_id, ScoreReport::new(0, 1))
            .await
            .unwrap();

        let standings = fx.tournaments.standings(m.tournament_id).await.unwrap();
        assert_eq!(standings[0].player_id, m.player2_id);
        assert_eq!(standings[0].rank, 1);
        assert_eq!(standings[0].wins, 1);
        assert_eq!(standings[0].points, 3);
        assert_eq!(standings[0].win_rate, 100);
        assert_eq!(standings[0].status, ParticipantStatus::Registered);

        assert_eq!(standings[1].player_id, m.player1_id);
        assert_eq!(standings[1].losses, 1);
        assert_eq!(standings[1].points, 0);
        assert_eq!(standings[1].status, ParticipantStatus::Eliminated);
    }

    #[tokio::test]
    async fn test_cancel_returns_players_to_pool() {
        let fx = fixture().await;
        let m = fx.paired_match().await;

        assert!(matches!(
            fx.matches.cancel(m.id, m.player1_id).await,
            Err(MatchError::Unauthorized)
        ));
        let cancelled = fx.matches.cancel(m.id, fx.organizer).await.unwrap();
        assert_eq!(cancelled.status, MatchStatus::Cancelled);

        let participants = fx.tournaments.participants(m.tournament_id).await.unwrap();
        assert!(
            participants
                .iter()
                .all(|p| p.status == ParticipantStatus::Registered)
        );

        let replay = fx
            .tournaments
            .generate_round(m.tournament_id, fx.organizer)
            .await
            .unwrap();
        assert_eq!(replay.round, 2);
        assert_eq!(replay.matches.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_complete_once() {
        let fx = fixture().await;
        let m = fx.paired_match().await;

        let (first, second) = tokio::join!(
            fx.matches
                .submit_score(m.id, m.player1_id, ScoreReport::new(3, 0)),
            fx.matches
                .submit_score(m.id, m.player2_id, ScoreReport::new(0, 3)),
        );
        assert_eq!(usize::from(first.is_ok()) + usize::from(second.is_ok()), 1);

        let standings = fx.tournaments.standings(m.tournament_id).await.unwrap();
        let total_wins: u32 = standings.iter().map(|s| s.wins).sum();
        assert_eq!(total_wins, 1);
    }

    #[tokio::test]
    async fn test_chat_is_limited_to_participants() {
        let fx = fixture().await;
        let m = fx.paired_match().await;

        fx.matches
            .post_message(m.id, m.player1_id, "ready when you are")
            .await
            .unwrap();
        assert!(matches!(
            fx.matches.post_message(m.id, fx.organizer, "hi").await,
            Err(MatchError::NotParticipant)
        ));
        assert!(matches!(
            fx.matches.post_message(m.id, m.player2_id, "   ").await,
            Err(MatchError::InvalidMessage)
        ));

        let log = fx.matches.messages(m.id, m.player2_id).await.unwrap();
        assert_eq!(log.len(), 2);
        assert!(log[0].is_system_message);
        assert_eq!(log[1].sender_id, Some(m.player1_id));
    }
}
