//! Integration tests for prize distribution
//!
//! A full tournament is played to completion before prizes are paid; the
//! tests check the payout arithmetic, tier validation and that a pool is
//! never paid twice.

#[cfg(test)]
mod prize_tests {
    use std::sync::Arc;

    use tourney::config::CompetitionConfig;
    use tourney::db::{MemoryRepository, Repository};
    use tourney::errors::{Classify, ErrorKind};
    use tourney::events::EventHub;
    use tourney::matches::{MatchManager, ScoreReport};
    use tourney::profile::{PlayerId, Profile};
    use tourney::tournament::{
        NewTournament, PrizeTier, TournamentError, TournamentId, TournamentManager,
        TournamentStatus,
    };
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

    fn standard_tiers() -> Vec<PrizeTier> {
        vec![
            PrizeTier::new(1, 50),
            PrizeTier::new(2, 30),
            PrizeTier::new(3, 20),
        ]
    }

    impl Fixture {
        async fn open_tournament(&self, pool: i64, players: usize) -> (TournamentId, Vec<PlayerId>) {
            let tournament = self
                .tournaments
                .create(
                    self.organizer,
                    NewTournament::new("Prize Cup", "chess", 16).with_prize_pool(pool),
                )
                .await
                .unwrap();
            let mut ids = Vec::new();
            for i in 0..players {
                let profile = Profile::new(Uuid::new_v4(), format!("entrant_{i}"))
                    .with_skill_rating(1000 + i as i32);
                self.repo.upsert_profile(&profile).await.unwrap();
                self.tournaments.join(tournament.id, profile.id).await.unwrap();
                ids.push(profile.id);
            }
            (tournament.id, ids)
        }

        /// Play rounds until one player is left standing; player 1 always
        /// wins, so lower-rated entrants advance.
        async fn play_out(&self, tournament_id: TournamentId) {
            while let Ok(round) = self
                .tournaments
                .generate_round(tournament_id, self.organizer)
                .await
            {
                for m in &round.matches {
                    self.matches
                        .submit_score(m.id, m.player1_id, ScoreReport::new(2, 1))
                        .await
                        .unwrap();
                }
            }
            self.tournaments
                .complete(tournament_id, self.organizer)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_three_way_split_pays_exact_amounts() {
        let fx = fixture().await;
        let (tid, _) = fx.open_tournament(1000, 3).await;
        fx.tournaments
            .set_prize_tiers(tid, fx.organizer, standard_tiers())
            .await
            .unwrap();
        fx.play_out(tid).await;

        let report = fx.tournaments.distribute_prizes(tid, fx.organizer).await.unwrap();
        let amounts: Vec<i64> = report.payouts.iter().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![500, 300, 200]);
        assert_eq!(report.undistributed, 0);

        let standings = fx.tournaments.standings(tid).await.unwrap();
        for (payout, standing) in report.payouts.iter().zip(&standings) {
            assert_eq!(payout.player_id, standing.player_id);
            assert_eq!(payout.position, standing.rank);
        }

        let tournament = fx.tournaments.get(tid).await.unwrap();
        assert!(tournament.prize_distributed);
        assert_eq!(fx.tournaments.payouts(tid).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_second_distribution_pays_nothing() {
        let fx = fixture().await;
        let (tid, _) = fx.open_tournament(1000, 3).await;
        fx.tournaments
            .set_prize_tiers(tid, fx.organizer, standard_tiers())
            .await
            .unwrap();
        fx.play_out(tid).await;

        fx.tournaments.distribute_prizes(tid, fx.organizer).await.unwrap();
        let err = fx
            .tournaments
            .distribute_prizes(tid, fx.organizer)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::PrizesAlreadyDistributed));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let paid: i64 = fx
            .tournaments
            .payouts(tid)
            .await
            .unwrap()
            .iter()
            .map(|p| p.amount)
            .sum();
        assert_eq!(paid, 1000);

        // Tiers are frozen once paid
        assert!(matches!(
            fx.tournaments
                .set_prize_tiers(tid, fx.organizer, vec![PrizeTier::new(1, 100)])
                .await,
            Err(TournamentError::PrizesAlreadyDistributed)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_distribution_pays_once() {
        let fx = fixture().await;
        let (tid, _) = fx.open_tournament(900, 4).await;
        fx.tournaments
            .set_prize_tiers(tid, fx.organizer, standard_tiers())
            .await
            .unwrap();
        fx.play_out(tid).await;

        let (a, b) = tokio::join!(
            fx.tournaments.distribute_prizes(tid, fx.organizer),
            fx.tournaments.distribute_prizes(tid, fx.organizer),
        );
        assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
        assert_eq!(fx.tournaments.payouts(tid).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_tiers_not_summing_to_hundred_are_rejected() {
        let fx = fixture().await;
        let (tid, _) = fx.open_tournament(1000, 2).await;

        let err = fx
            .tournaments
            .set_prize_tiers(
                tid,
                fx.organizer,
                vec![PrizeTier::new(1, 60), PrizeTier::new(2, 30)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidPrizeTiers(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(fx.tournaments.prize_tiers(tid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tiers_are_replaced_wholesale() {
        let fx = fixture().await;
        let (tid, players) = fx.open_tournament(1000, 2).await;

        fx.tournaments
            .set_prize_tiers(tid, fx.organizer, standard_tiers())
            .await
            .unwrap();
        fx.tournaments
            .set_prize_tiers(
                tid,
                fx.organizer,
                vec![PrizeTier::new(2, 40), PrizeTier::new(1, 60)],
            )
            .await
            .unwrap();

        let tiers = fx.tournaments.prize_tiers(tid).await.unwrap();
        assert_eq!(tiers, vec![PrizeTier::new(1, 60), PrizeTier::new(2, 40)]);

        assert!(matches!(
            fx.tournaments
                .set_prize_tiers(tid, players[0], standard_tiers())
                .await,
            Err(TournamentError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_tiers_beyond_field_are_undistributed() {
        let fx = fixture().await;
        let (tid, _) = fx.open_tournament(1000, 2).await;
        fx.tournaments
            .set_prize_tiers(tid, fx.organizer, standard_tiers())
            .await
            .unwrap();
        fx.play_out(tid).await;

        let report = fx.tournaments.distribute_prizes(tid, fx.organizer).await.unwrap();
        assert_eq!(report.payouts.len(), 2);
        assert_eq!(report.skipped_positions, vec![3]);
        assert_eq!(report.undistributed, 200);
    }

    #[tokio::test]
    async fn test_distribution_requires_completed_tournament() {
        let fx = fixture().await;
        let (tid, _) = fx.open_tournament(1000, 2).await;
        fx.tournaments
            .set_prize_tiers(tid, fx.organizer, standard_tiers())
            .await
            .unwrap();

        let err = fx
            .tournaments
            .distribute_prizes(tid, fx.organizer)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TournamentError::InvalidState {
                expected: TournamentStatus::Completed,
                actual: TournamentStatus::Upcoming,
            }
        ));
    }

    #[tokio::test]
    async fn test_distribution_requires_tiers() {
        let fx = fixture().await;
        let (tid, _) = fx.open_tournament(1000, 2).await;
        fx.play_out(tid).await;

        assert!(matches!(
            fx.tournaments.distribute_prizes(tid, fx.organizer).await,
            Err(TournamentError::NoPrizeTiers)
        ));
    }
}
