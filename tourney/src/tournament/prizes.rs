//! Prize tier validation, standings and payout arithmetic.
//!
//! Everything here is pure; the manager loads the inputs and records the
//! result atomically.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::errors::{TournamentError, TournamentResult};
use super::models::{DistributionReport, Participant, Payout, PrizeTier, TournamentId};

/// Check a complete tier set: non-empty, unique positions >= 1,
/// percentages within 0..=100 summing to exactly 100.
pub fn validate_tiers(tiers: &[PrizeTier]) -> TournamentResult<()> {
    if tiers.is_empty() {
        return Err(TournamentError::InvalidPrizeTiers(
            "at least one tier is required".to_string(),
        ));
    }

    let mut positions = HashSet::with_capacity(tiers.len());
    for tier in tiers {
        if tier.position == 0 {
            return Err(TournamentError::InvalidPrizeTiers(
                "positions start at 1".to_string(),
            ));
        }
        if tier.percentage > 100 {
            return Err(TournamentError::InvalidPrizeTiers(format!(
                "percentage for position {} exceeds 100",
                tier.position
            )));
        }
        if !positions.insert(tier.position) {
            return Err(TournamentError::InvalidPrizeTiers(format!(
                "duplicate position {}",
                tier.position
            )));
        }
    }

    let total: u32 = tiers.iter().map(|t| t.percentage).sum();
    if total != 100 {
        return Err(TournamentError::InvalidPrizeTiers(format!(
            "percentages sum to {total}, expected 100"
        )));
    }
    Ok(())
}

/// Order participants by points, then wins, both descending.
///
/// The sort is stable, so exact ties keep the input (registration) order.
pub fn rank_standings(mut participants: Vec<Participant>) -> Vec<Participant> {
    participants.sort_by(|a, b| b.points.cmp(&a.points).then(b.wins.cmp(&a.wins)));
    participants
}

/// Share of the pool for `percentage`, rounded down.
///
/// Whole hundreds and the remainder are scaled separately, so the
/// intermediate never exceeds the pool for percentages up to 100.
pub fn payout_amount(prize_pool: i64, percentage: u32) -> i64 {
    let percentage = i64::from(percentage.min(100));
    (prize_pool / 100) * percentage + (prize_pool % 100) * percentage / 100
}

/// Compute payouts for ranked standings.
///
/// Tiers whose position is beyond the number of ranked participants are
/// skipped; the skipped share and all rounding remainders are reported as
/// undistributed.
pub fn compute_payouts(
    tournament_id: TournamentId,
    prize_pool: i64,
    tiers: &[PrizeTier],
    ranked: &[Participant],
    now: DateTime<Utc>,
) -> DistributionReport {
    let mut tiers = tiers.to_vec();
    tiers.sort_by_key(|t| t.position);

    let mut payouts = Vec::with_capacity(tiers.len());
    let mut skipped_positions = Vec::new();

    for tier in &tiers {
        let Some(winner) = tier
            .position
            .checked_sub(1)
            .and_then(|rank| usize::try_from(rank).ok())
            .and_then(|rank| ranked.get(rank))
        else {
            skipped_positions.push(tier.position);
            continue;
        };

        payouts.push(Payout {
            tournament_id,
            player_id: winner.player_id,
            position: tier.position,
            percentage: tier.percentage,
            amount: payout_amount(prize_pool, tier.percentage),
            created_at: now,
        });
    }

    let paid: i64 = payouts.iter().map(|p| p.amount).sum();
    DistributionReport {
        tournament_id,
        payouts,
        skipped_positions,
        undistributed: prize_pool - paid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn tiers(pairs: &[(u32, u32)]) -> Vec<PrizeTier> {
        pairs.iter().map(|&(p, pct)| PrizeTier::new(p, pct)).collect()
    }

    fn participant(points: u32, wins: u32) -> Participant {
        let mut p = Participant::new(Uuid::new_v4(), Uuid::new_v4());
        p.points = points;
        p.wins = wins;
        p
    }

    #[test]
    fn test_validate_accepts_exact_hundred() {
        assert!(validate_tiers(&tiers(&[(1, 50), (2, 30), (3, 20)])).is_ok());
        assert!(validate_tiers(&tiers(&[(1, 100)])).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_sets() {
        for bad in [
            tiers(&[]),
            tiers(&[(1, 50), (2, 40)]),
            tiers(&[(1, 60), (2, 50)]),
            tiers(&[(0, 100)]),
            tiers(&[(1, 50), (1, 50)]),
            tiers(&[(1, 101)]),
        ] {
            assert!(
                matches!(
                    validate_tiers(&bad),
                    Err(TournamentError::InvalidPrizeTiers(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_rank_standings_is_stable() {
        let a = participant(6, 2);
        let b = participant(6, 2);
        let c = participant(9, 3);
        let d = participant(6, 1);

        let ranked = rank_standings(vec![a.clone(), b.clone(), c.clone(), d.clone()]);
        let order: Vec<_> = ranked.iter().map(|p| p.player_id).collect();
        assert_eq!(
            order,
            vec![c.player_id, a.player_id, b.player_id, d.player_id]
        );
    }

    #[test]
    fn test_three_way_split() {
        let ranked = vec![participant(9, 3), participant(6, 2), participant(3, 1)];
        let report = compute_payouts(
            Uuid::new_v4(),
            1000,
            &tiers(&[(1, 50), (2, 30), (3, 20)]),
            &ranked,
            Utc::now(),
        );

        let amounts: Vec<i64> = report.payouts.iter().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![500, 300, 200]);
        assert_eq!(report.payouts[0].player_id, ranked[0].player_id);
        assert!(report.skipped_positions.is_empty());
        assert_eq!(report.undistributed, 0);
    }

    #[test]
    fn test_missing_ranks_are_skipped() {
        let ranked = vec![participant(3, 1), participant(0, 0)];
        let report = compute_payouts(
            Uuid::new_v4(),
            1000,
            &tiers(&[(1, 50), (2, 30), (3, 20)]),
            &ranked,
            Utc::now(),
        );

        assert_eq!(report.payouts.len(), 2);
        assert_eq!(report.skipped_positions, vec![3]);
        assert_eq!(report.undistributed, 200);
    }

    #[test]
    fn test_rounding_remainder_is_undistributed() {
        let ranked = vec![participant(3, 1), participant(0, 0), participant(0, 0)];
        let report = compute_payouts(
            Uuid::new_v4(),
            100,
            &tiers(&[(1, 33), (2, 33), (3, 34)]),
            &ranked,
            Utc::now(),
        );
        assert_eq!(report.undistributed, 0);

        let report = compute_payouts(
            Uuid::new_v4(),
            7,
            &tiers(&[(1, 50), (2, 50)]),
            &ranked,
            Utc::now(),
        );
        let amounts: Vec<i64> = report.payouts.iter().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![3, 3]);
        assert_eq!(report.undistributed, 1);
    }

    #[test]
    fn test_payout_amount_near_i64_max() {
        let pool = i64::MAX / 10;
        assert_eq!(payout_amount(pool, 100), pool);
        assert_eq!(payout_amount(i64::MAX, 100), i64::MAX);
        assert_eq!(payout_amount(i64::MAX, 50), i64::MAX / 2);

        let ranked = vec![participant(3, 1), participant(0, 0)];
        let report = compute_payouts(
            Uuid::new_v4(),
            i64::MAX,
            &tiers(&[(1, 60), (2, 40)]),
            &ranked,
            Utc::now(),
        );
        let paid: i64 = report.payouts.iter().map(|p| p.amount).sum();
        assert!(report.payouts.iter().all(|p| p.amount > 0));
        assert_eq!(paid + report.undistributed, i64::MAX);
    }

    proptest! {
        #[test]
        fn prop_payout_matches_wide_arithmetic(pool in 0i64..=i64::MAX, pct in 0u32..=100) {
            let wide = i128::from(pool) * i128::from(pct) / 100;
            prop_assert_eq!(i128::from(payout_amount(pool, pct)), wide);
        }


        #[test]
        fn prop_never_pays_more_than_the_pool(
            pool in 0i64..10_000_000,
            split in prop::collection::vec(1u32..=100, 1..8),
            field in 0usize..10,
        ) {
            // Turn arbitrary weights into a valid tier set summing to 100
            let total: u32 = split.iter().sum();
            let mut pcts: Vec<u32> = split.iter().map(|w| w * 100 / total).collect();
            let assigned: u32 = pcts.iter().sum();
            pcts[0] += 100 - assigned;
            let tier_set: Vec<PrizeTier> = pcts
                .iter()
                .enumerate()
                .map(|(i, &pct)| PrizeTier::new(i as u32 + 1, pct))
                .collect();
            prop_assert!(validate_tiers(&tier_set).is_ok());

            let ranked: Vec<Participant> = (0..field).map(|_| participant(0, 0)).collect();
            let report = compute_payouts(Uuid::new_v4(), pool, &tier_set, &ranked, Utc::now());

            let paid: i64 = report.payouts.iter().map(|p| p.amount).sum();
            prop_assert!(paid <= pool);
            prop_assert_eq!(paid + report.undistributed, pool);
            prop_assert_eq!(
                report.payouts.len() + report.skipped_positions.len(),
                tier_set.len()
            );
        }
    }
}
