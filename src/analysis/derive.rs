//! Derivation of normalized per-category metrics from raw provider output.
//!
//! Pure functions, no I/O. The one exception to determinism is the
//! environmental record, which is synthesized from the pluggable randomness
//! source until a real data source replaces it.

use crate::models::{
    CommerceMetrics, EducationMetrics, EnvironmentMetrics, HealthFacility, HealthMetrics,
    PoiData,
};
use crate::randomness::RandomSource;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;

const AIR_QUALITY_OPTIONS: [&str; 4] = ["boa", "moderada", "ruim", "desconhecida"];

/// Classify nearby schools by name substrings. Best-effort text matching,
/// not authoritative: a school named after neither network falls back to
/// the generic public label.
pub fn derive_education(poi: &PoiData) -> EducationMetrics {
    let mut school_types = BTreeSet::new();

    for school in &poi.schools.places {
        let name = school.name.to_lowercase();
        let kind = if name.contains("municipal") || name.contains("emef") {
            "escola municipal"
        } else if name.contains("estadual") || name.contains("eef") {
            "escola estadual"
        } else if name.contains("particular") || name.contains("colégio") {
            "escola particular"
        } else {
            "escola pública"
        };
        school_types.insert(kind.to_string());
    }

    let school_types: Vec<String> = if school_types.is_empty() {
        vec!["escolas públicas".to_string()]
    } else {
        school_types.into_iter().collect()
    };

    EducationMetrics {
        school_count: poi.schools.count,
        school_types,
        schools_nearby: poi.schools.places.iter().take(3).cloned().collect(),
        score: poi.schools.score,
    }
}

/// Merge hospitals and pharmacies into one typed facility list.
pub fn derive_health(poi: &PoiData) -> HealthMetrics {
    let mut facilities = Vec::new();

    for hospital in &poi.hospitals.places {
        facilities.push(HealthFacility {
            name: hospital.name.clone(),
            kind: "hospital".to_string(),
        });
    }
    for pharmacy in &poi.pharmacies.places {
        facilities.push(HealthFacility {
            name: pharmacy.name.clone(),
            kind: "farmácia".to_string(),
        });
    }

    HealthMetrics {
        facilities,
        hospital_count: poi.hospitals.count,
        pharmacy_count: poi.pharmacies.count,
        total_facilities: poi.hospitals.count + poi.pharmacies.count,
    }
}

/// Presence per fixed commerce category drives the label set; the total
/// sums raw counts across those categories.
pub fn derive_commerce(poi: &PoiData) -> CommerceMetrics {
    let categories: [(&str, usize); 4] = [
        ("supermercados", poi.supermarkets.count),
        ("restaurantes", poi.restaurants.count),
        ("bancos", poi.banks.count),
        ("farmácias", poi.pharmacies.count),
    ];

    let commerce_types = categories
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(label, _)| label.to_string())
        .collect();

    CommerceMetrics {
        commerce_types,
        total_establishments: categories.iter().map(|(_, count)| count).sum(),
    }
}

/// Synthetic environmental record. Placeholder until a real air-quality /
/// green-area source is wired in; not a load-bearing metric.
pub fn derive_environment(rng: &RandomSource) -> EnvironmentMetrics {
    rng.with(|rng| EnvironmentMetrics {
        green_areas: rng.gen_range(0..=5),
        air_quality: AIR_QUALITY_OPTIONS
            .choose(rng)
            .unwrap_or(&"desconhecida")
            .to_string(),
        environmental_score: rng.gen_range(3..=8),
    })
}
