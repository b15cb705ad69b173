//! The small randomness capability passed into the engine's constructor, per
//! the design note that seating shuffle, role shuffle, leader pick, and
//! mission-vote shuffle must draw from a source tests can replace with a
//! seeded generator.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub trait GameRandomness: Send + Sync {
    fn shuffle<T>(&mut self, items: &mut [T]);
    fn gen_range(&mut self, upper_exclusive: usize) -> usize;
}

/// Production randomness: `rand::thread_rng` seeded from the OS, matching
/// Python's `random` module usage in the original source but drawn fresh
/// per call so no engine instance holds long-lived entropy state.
#[derive(Default)]
pub struct OsRandomness;

impl GameRandomness for OsRandomness {
    fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut rand::thread_rng());
    }

    fn gen_range(&mut self, upper_exclusive: usize) -> usize {
        rand::thread_rng().gen_range(0..upper_exclusive)
    }
}

/// Deterministic randomness for tests: a seeded `StdRng`.
pub struct SeededRandomness(StdRng);

impl SeededRandomness {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl GameRandomness for SeededRandomness {
    fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.0);
    }

    fn gen_range(&mut self, upper_exclusive: usize) -> usize {
        self.0.gen_range(0..upper_exclusive)
    }
}
