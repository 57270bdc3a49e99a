//! Pairing strategies.
//!
//! A strategy only decides the *order* of the registered entrants; pairing
//! itself is always consecutive (0-1, 2-3, ...) and an odd entrant out gets
//! the bye. Strategies are dispatched statically through [`Pairing`].

use enum_dispatch::enum_dispatch;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::profile::models::PlayerId;

/// Registered participant as seen by the pairing engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entrant {
    pub player_id: PlayerId,
    pub skill_rating: i32,
}

impl Entrant {
    pub fn new(player_id: PlayerId, skill_rating: i32) -> Self {
        Self {
            player_id,
            skill_rating,
        }
    }
}

/// Orders entrants before they are paired consecutively
#[enum_dispatch]
pub trait PairingStrategy {
    /// Reorder `entrants` in place. Input order is registration order.
    fn arrange(&self, entrants: &mut [Entrant]);

    /// Stable name used in logs and configuration
    fn name(&self) -> &'static str;
}

/// Stable ascending sort by skill rating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillBasedPairing;

impl PairingStrategy for SkillBasedPairing {
    fn arrange(&self, entrants: &mut [Entrant]) {
        entrants.sort_by_key(|e| e.skill_rating);
    }

    fn name(&self) -> &'static str {
        "skill"
    }
}

/// Uniform shuffle, reproducible when seeded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomPairing {
    pub seed: Option<u64>,
}

impl RandomPairing {
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl PairingStrategy for RandomPairing {
    fn arrange(&self, entrants: &mut [Entrant]) {
        match self.seed {
            Some(seed) => entrants.shuffle(&mut StdRng::seed_from_u64(seed)),
            None => entrants.shuffle(&mut rand::rng()),
        }
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Built-in pairing policies
#[enum_dispatch(PairingStrategy)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pairing {
    SkillBased(SkillBasedPairing),
    Random(RandomPairing),
}

impl Default for Pairing {
    fn default() -> Self {
        Pairing::SkillBased(SkillBasedPairing)
    }
}

/// One round's pairings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairings {
    /// `(player1, player2)` in strategy order
    pub pairs: Vec<(PlayerId, PlayerId)>,
    /// Entrant left over when the count is odd
    pub bye: Option<PlayerId>,
}

/// Arrange `entrants` with `strategy` and pair them consecutively.
///
/// With an odd count the last entrant in strategy order gets the bye.
pub fn pair_entrants<S: PairingStrategy>(strategy: &S, mut entrants: Vec<Entrant>) -> Pairings {
    strategy.arrange(&mut entrants);

    let pairs = entrants
        .chunks_exact(2)
        .map(|pair| (pair[0].player_id, pair[1].player_id))
        .collect();
    let bye = if entrants.len() % 2 == 1 {
        entrants.last().map(|e| e.player_id)
    } else {
        None
    };

    Pairings { pairs, bye }
}
