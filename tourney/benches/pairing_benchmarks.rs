use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tourney::tournament::{
    Entrant, Participant, Pairing, PrizeTier, RandomPairing, SkillBasedPairing, pair_entrants,
    prizes::{compute_payouts, rank_standings},
};
use uuid::Uuid;

/// Field of `n` entrants with spread-out ratings
fn field(n: usize) -> Vec<Entrant> {
    (0..n)
        .map(|i| Entrant::new(Uuid::new_v4(), ((i * 7919) % 2400) as i32))
        .collect()
}

/// Benchmark skill-based pairing across field sizes
fn bench_skill_pairing(c: &mut Criterion) {
    let mut group = c.benchmark_group("skill_pairing");
    for n in [8, 64, 512, 1024] {
        let entrants = field(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &entrants, |b, entrants| {
            b.iter(|| pair_entrants(&SkillBasedPairing, black_box(entrants.clone())));
        });
    }
    group.finish();
}

/// Benchmark seeded random pairing across field sizes
fn bench_random_pairing(c: &mut Criterion) {
    let strategy = Pairing::from(RandomPairing::seeded(42));
    let mut group = c.benchmark_group("random_pairing");
    for n in [8, 64, 512, 1024] {
        let entrants = field(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &entrants, |b, entrants| {
            b.iter(|| pair_entrants(&strategy, black_box(entrants.clone())));
        });
    }
    group.finish();
}

/// Benchmark ranking and paying out a full field
fn bench_prize_distribution(c: &mut Criterion) {
    let tournament_id = Uuid::new_v4();
    let participants: Vec<Participant> = (0..1024u32)
        .map(|i| {
            let mut p = Participant::new(tournament_id, Uuid::new_v4());
            p.wins = i % 11;
            p.points = p.wins * 3;
            p
        })
        .collect();
    let tiers = vec![
        PrizeTier::new(1, 40),
        PrizeTier::new(2, 25),
        PrizeTier::new(3, 15),
        PrizeTier::new(4, 10),
        PrizeTier::new(5, 10),
    ];

    c.bench_function("rank_and_pay_1024", |b| {
        b.iter(|| {
            let ranked = rank_standings(black_box(participants.clone()));
            compute_payouts(tournament_id, 1_000_000, &tiers, &ranked, chrono::Utc::now())
        });
    });
}

criterion_group!(pairing, bench_skill_pairing, bench_random_pairing);

criterion_group!(prizes, bench_prize_distribution);

criterion_main!(pairing, prizes);
