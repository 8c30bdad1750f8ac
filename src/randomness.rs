//! Pluggable randomness source.
//!
//! Phrasing variants and the simulated safety/environmental samples all draw
//! from one shared, seedable generator so a fixed seed reproduces an entire
//! report while bucket selection stays deterministic regardless of seed.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Shared seedable RNG handle. Cheap to clone behind an `Arc`.
pub struct RandomSource {
    rng: Mutex<StdRng>,
}

impl RandomSource {
    /// Generator seeded from OS entropy; the production default.
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Generator with a fixed seed, for reproducing a report byte-for-byte.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Run `f` with exclusive access to the generator.
    pub fn with<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut rng = self.rng.lock();
        f(&mut rng)
    }
}
