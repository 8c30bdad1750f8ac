//! Simulated public-safety feed.
//!
//! There is no real upstream: records are synthesized from the locality
//! key. The crime-rate tier comes from a stable hash, so the same
//! `(city, state, neighborhood)` always lands in the same tier, while the
//! sampled score and crime-type labels vary within the tier's range. A real
//! deployment would integrate state security departments and open municipal
//! data here.

use crate::models::{CrimeTier, SafetyData};
use crate::randomness::RandomSource;
use rand::seq::SliceRandom;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

const CRIME_TYPES: [&str; 5] = [
    "furto",
    "roubo",
    "vandalismo",
    "tráfico",
    "violência doméstica",
];

/// Simulated safety-data provider.
pub struct SafetyProvider {
    rng: Arc<RandomSource>,
}

impl SafetyProvider {
    pub fn new(rng: Arc<RandomSource>) -> Self {
        Self { rng }
    }

    /// Stable bucket in `0..100` for a locality. SHA-256 rather than the
    /// stdlib hasher so the bucket survives process restarts and builds.
    fn locality_bucket(city: &str, state: &str, neighborhood: &str) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(city.as_bytes());
        hasher.update([0x1f]);
        hasher.update(state.as_bytes());
        hasher.update([0x1f]);
        hasher.update(neighborhood.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes) % 100
    }

    /// Tier thresholds: under 30 low, under 70 moderate, else high.
    pub fn tier_for(city: &str, state: &str, neighborhood: &str) -> CrimeTier {
        match Self::locality_bucket(city, state, neighborhood) {
            0..=29 => CrimeTier::Low,
            30..=69 => CrimeTier::Moderate,
            _ => CrimeTier::High,
        }
    }

    /// Synthesize a safety record for a locality.
    pub fn fetch(&self, city: &str, state: &str, neighborhood: &str) -> SafetyData {
        let tier = Self::tier_for(city, state, neighborhood);

        self.rng.with(|rng| {
            let safety_score = match tier {
                CrimeTier::Low => rng.gen_range(7..=9),
                CrimeTier::Moderate => rng.gen_range(4..=7),
                CrimeTier::High => rng.gen_range(1..=4),
            };

            let label_count = rng.gen_range(2..=4);
            let main_crime_types: Vec<String> = CRIME_TYPES
                .choose_multiple(rng, label_count)
                .map(|s| s.to_string())
                .collect();

            SafetyData {
                crime_rate: tier,
                main_crime_types,
                safety_score,
                police_stations_nearby: rng.gen_range(1..=5),
                recent_incidents: rng.gen_range(0..=20),
                data_source: "Simulado - Em produção usaria dados oficiais".to_string(),
            }
        })
    }
}
