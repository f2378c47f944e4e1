//! Deterministic RNG resource for procedural generation.
//!
//! Wraps `ChaCha8Rng` so identical seeds produce identical building layouts
//! on every platform. Generation code takes `&mut impl Rng` and is handed
//! `rng.0`; nothing in the engine touches `rand::thread_rng()`.

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::DEFAULT_SEED;

#[derive(Resource)]
pub struct PlacementRng(pub ChaCha8Rng);

impl Default for PlacementRng {
    fn default() -> Self {
        Self(ChaCha8Rng::seed_from_u64(DEFAULT_SEED))
    }
}

impl PlacementRng {
    pub fn from_seed_u64(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}
