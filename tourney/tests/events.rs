//! Integration tests for change-event subscriptions
//!
//! Subscribers attach a filter and should see exactly the committed changes
//! they asked for, in commit order.

#[cfg(test)]
mod event_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tourney::config::CompetitionConfig;
    use tourney::db::{MemoryRepository, Repository};
    use tourney::dispute::{DisputeKind, DisputeManager, NewDispute, Resolution, ResolutionType};
    use tourney::events::{ChangeAction, ChangeEvent, EventFilter, EventHub, Subscription, Topic};
    use tourney::matches::{MatchManager, ScoreReport};
    use tourney::profile::Profile;
    use tourney::tournament::{NewTournament, TournamentManager};
    use uuid::Uuid;

    async fn next(sub: &mut Subscription) -> ChangeEvent {
        tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("event not delivered in time")
            .expect("hub closed")
    }

    async fn nothing_pending(sub: &mut Subscription) -> bool {
        tokio::time::timeout(Duration::from_millis(50), sub.recv())
            .await
            .is_err()
    }

    #[tokio::test]
    async fn test_round_and_score_events_reach_match_subscribers() {
        let repo = Arc::new(MemoryRepository::new());
        let hub = EventHub::default();
        let tournaments =
            TournamentManager::new(repo.clone(), hub.clone(), CompetitionConfig::default());
        let matches = MatchManager::new(repo.clone(), hub.clone(), CompetitionConfig::default());

        let organizer = Profile::new(Uuid::new_v4(), "organizer");
        repo.upsert_profile(&organizer).await.unwrap();
        let tournament = tournaments
            .create(organizer.id, NewTournament::new("Live Cup", "chess", 4))
            .await
            .unwrap();
        for name in ["alpha", "bravo"] {
            let profile = Profile::new(Uuid::new_v4(), name);
            repo.upsert_profile(&profile).await.unwrap();
            tournaments.join(tournament.id, profile.id).await.unwrap();
        }

        let mut sub = hub.subscribe(EventFilter::topic(Topic::Matches).with_key(tournament.id));
        let round = tournaments
            .generate_round(tournament.id, organizer.id)
            .await
            .unwrap();
        let m = &round.matches[0];

        let inserted = next(&mut sub).await;
        assert_eq!(inserted.action, ChangeAction::Insert);
        assert_eq!(inserted.key, m.id);
        assert_eq!(inserted.scope, Some(tournament.id));
        assert_eq!(inserted.payload["status"], "pending");

        matches
            .submit_score(m.id, m.player2_id, ScoreReport::new(1, 3))
            .await
            .unwrap();
        let updated = next(&mut sub).await;
        assert_eq!(updated.action, ChangeAction::Update);
        assert_eq!(updated.payload["status"], "completed");
        assert_eq!(updated.payload["winner_id"], m.player2_id.to_string());

        assert!(nothing_pending(&mut sub).await);
    }

    #[tokio::test]
    async fn test_chat_subscribers_see_announcement_and_messages() {
        let repo = Arc::new(MemoryRepository::new());
        let hub = EventHub::default();
        let tournaments =
            TournamentManager::new(repo.clone(), hub.clone(), CompetitionConfig::default());
        let matches = MatchManager::new(repo.clone(), hub.clone(), CompetitionConfig::default());

        let organizer = Profile::new(Uuid::new_v4(), "organizer");
        repo.upsert_profile(&organizer).await.unwrap();
        let tournament = tournaments
            .create(organizer.id, NewTournament::new("Chatty Cup", "chess", 2))
            .await
            .unwrap();
        for name in ["alpha", "bravo"] {
            let profile = Profile::new(Uuid::new_v4(), name);
            repo.upsert_profile(&profile).await.unwrap();
            tournaments.join(tournament.id, profile.id).await.unwrap();
        }

        let mut all_chat = hub.subscribe(
            EventFilter::topic(Topic::ChatMessages).with_actions([ChangeAction::Insert]),
        );
        let round = tournaments
            .generate_round(tournament.id, organizer.id)
            .await
            .unwrap();
        let m = &round.matches[0];

        let announcement = next(&mut all_chat).await;
        assert_eq!(announcement.scope, Some(m.id));
        assert_eq!(announcement.payload["is_system_message"], true);

        matches
            .post_message(m.id, m.player1_id, "gl hf")
            .await
            .unwrap();
        let message = next(&mut all_chat).await;
        assert_eq!(message.payload["message"], "gl hf");
    }

    #[tokio::test]
    async fn test_dispute_events_never_carry_admin_notes() {
        let repo = Arc::new(MemoryRepository::new());
        let hub = EventHub::default();
        let tournaments =
            TournamentManager::new(repo.clone(), hub.clone(), CompetitionConfig::default());
        let disputes = DisputeManager::new(repo.clone(), hub.clone());

        let organizer = Profile::new(Uuid::new_v4(), "organizer").as_admin();
        repo.upsert_profile(&organizer).await.unwrap();
        let tournament = tournaments
            .create(organizer.id, NewTournament::new("Cup", "chess", 2))
            .await
            .unwrap();
        for name in ["alpha", "bravo"] {
            let profile = Profile::new(Uuid::new_v4(), name);
            repo.upsert_profile(&profile).await.unwrap();
            tournaments.join(tournament.id, profile.id).await.unwrap();
        }
        let round = tournaments
            .generate_round(tournament.id, organizer.id)
            .await
            .unwrap();
        let m = &round.matches[0];

        let mut sub = hub.subscribe(EventFilter::topic(Topic::Disputes).with_key(m.id));
        let dispute = disputes
            .raise(
                m.id,
                m.player1_id,
                NewDispute {
                    kind: DisputeKind::Behavior,
                    title: "Left early".to_string(),
                    description: "Opponent disconnected on purpose".to_string(),
                },
            )
            .await
            .unwrap();
        disputes
            .resolve(
                dispute.id,
                organizer.id,
                Resolution {
                    resolution_type: ResolutionType::Compromise,
                    resolution: "Match will be replayed".to_string(),
                    admin_notes: Some("second offence".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(next(&mut sub).await.action, ChangeAction::Insert);
        let resolved = next(&mut sub).await;
        assert_eq!(resolved.payload["status"], "resolved");
        assert!(resolved.payload["admin_notes"].is_null());
    }

    #[tokio::test]
    async fn test_presence_follows_connections() {
        let hub = EventHub::default();
        let player = Uuid::new_v4();
        let mut sub = hub.subscribe(EventFilter::topic(Topic::Presence).with_key(player));

        let first = hub.track_presence(player);
        let second = hub.track_presence(player);
        assert!(hub.is_online(player));
        assert_eq!(next(&mut sub).await.action, ChangeAction::Insert);

        drop(first);
        assert!(hub.is_online(player));
        assert!(nothing_pending(&mut sub).await);

        drop(second);
        assert!(!hub.is_online(player));
        assert_eq!(next(&mut sub).await.action, ChangeAction::Delete);
        assert!(hub.online_players().is_empty());
    }
}
