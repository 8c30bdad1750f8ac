//! Points-of-interest lookup around a coordinate.
//!
//! Runs one spatial query per fixed category; the shared search client's
//! minimum-interval throttle keeps the aggregate request rate polite. Each
//! category fails independently: a failed sub-query yields an empty record
//! for that category only, never aborting the others.

use crate::models::{Coordinates, Place, PoiCategory, PoiData};
use crate::providers::spatial::{haversine_m, Feature, SpatialSearch};
use std::sync::Arc;
use tracing::warn;

/// Places kept per category, nearest first.
const PLACES_PER_CATEGORY: usize = 5;

/// The fixed category list: `(label, Overpass selector)`.
const CATEGORIES: [(&str, &str); 6] = [
    ("escolas", "amenity=school"),
    ("hospitais", "amenity=hospital"),
    ("supermercados", "shop=supermarket"),
    ("farmacias", "amenity=pharmacy"),
    ("bancos", "amenity=bank"),
    ("restaurantes", "amenity=restaurant"),
];

/// POI provider backed by a shared spatial search client.
pub struct PoiProvider {
    search: Arc<dyn SpatialSearch>,
    radius_m: u32,
}

impl PoiProvider {
    pub fn new(search: Arc<dyn SpatialSearch>, radius_m: u32) -> Self {
        Self { search, radius_m }
    }

    /// Fetch all six categories. Sequential by design: the throttle in the
    /// search client spaces the sub-queries out.
    pub async fn fetch(&self, center: Coordinates) -> PoiData {
        let mut data = PoiData::default();

        for (label, selector) in CATEGORIES {
            let category = match self.search.search(center, self.radius_m, selector).await {
                Ok(features) => Self::to_category(center, features),
                Err(e) => {
                    warn!("poi search for {} failed, keeping empty record: {}", label, e);
                    PoiCategory::default()
                }
            };

            match label {
                "escolas" => data.schools = category,
                "hospitais" => data.hospitals = category,
                "supermercados" => data.supermarkets = category,
                "farmacias" => data.pharmacies = category,
                "bancos" => data.banks = category,
                "restaurantes" => data.restaurants = category,
                _ => unreachable!(),
            }
        }

        data
    }

    /// Score the full hit count, keep only the nearest few places.
    fn to_category(center: Coordinates, features: Vec<Feature>) -> PoiCategory {
        let count = features.len();

        let mut places: Vec<Place> = features
            .into_iter()
            .map(|f| {
                let distance_m = haversine_m(center, f.latitude, f.longitude);
                Place {
                    name: f.name.unwrap_or_else(|| "Sem nome".to_string()),
                    latitude: f.latitude,
                    longitude: f.longitude,
                    distance_m,
                }
            })
            .collect();

        places.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        places.truncate(PLACES_PER_CATEGORY);

        PoiCategory {
            count,
            places,
            score: count.min(10) as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    fn center() -> Coordinates {
        Coordinates {
            latitude: -23.5613,
            longitude: -46.6563,
        }
    }

    fn feature_at(name: &str, latitude: f64, longitude: f64) -> Feature {
        Feature {
            name: Some(name.to_string()),
            latitude,
            longitude,
            tags: HashMap::new(),
        }
    }

    #[test]
    fn test_category_caps_places_to_nearest_five() {
        // Seven hits at increasing offsets from the center.
        let features: Vec<Feature> = (1..=7)
            .map(|i| {
                feature_at(
                    &format!("Lugar {}", i),
                    -23.5613 + 0.001 * i as f64,
                    -46.6563,
                )
            })
            .rev()
            .collect();

        let category = PoiProvider::to_category(center(), features);
        assert_eq!(category.count, 7);
        assert_eq!(category.score, 7);
        assert_eq!(category.places.len(), 5);
        assert_eq!(category.places[0].name, "Lugar 1");
        assert!(category.places[0].distance_m < category.places[4].distance_m);
    }

    #[test]
    fn test_score_caps_at_ten() {
        let features: Vec<Feature> = (0..25)
            .map(|i| feature_at("x", -23.5613 + 0.0001 * i as f64, -46.6563))
            .collect();

        let category = PoiProvider::to_category(center(), features);
        assert_eq!(category.count, 25);
        assert_eq!(category.score, 10);
    }

    #[test]
    fn test_unnamed_features_get_placeholder() {
        let features = vec![Feature {
            name: None,
            latitude: -23.5613,
            longitude: -46.6563,
            tags: HashMap::new(),
        }];

        let category = PoiProvider::to_category(center(), features);
        assert_eq!(category.places[0].name, "Sem nome");
    }

    /// Search stub that fails only for the configured selector.
    struct FlakySearch {
        fail_selector: &'static str,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl SpatialSearch for FlakySearch {
        async fn search(
            &self,
            _center: Coordinates,
            _radius_m: u32,
            selector: &str,
        ) -> anyhow::Result<Vec<Feature>> {
            self.calls.lock().push(selector.to_string());
            if selector == self.fail_selector {
                anyhow::bail!("category unavailable");
            }
            Ok(vec![feature_at("Lugar", -23.5613, -46.6563)])
        }
    }

    #[tokio::test]
    async fn test_one_category_failure_leaves_others_intact() {
        let search = Arc::new(FlakySearch {
            fail_selector: "amenity=hospital",
            calls: Mutex::new(Vec::new()),
        });
        let provider = PoiProvider::new(search.clone(), 1500);

        let data = provider.fetch(center()).await;

        // The failed category degrades to the empty record.
        assert_eq!(data.hospitals, PoiCategory::default());
        // Every other category still got its hit.
        assert_eq!(data.schools.count, 1);
        assert_eq!(data.supermarkets.count, 1);
        assert_eq!(data.pharmacies.count, 1);
        assert_eq!(data.banks.count, 1);
        assert_eq!(data.restaurants.count, 1);
        // All six sub-queries ran despite the failure in the middle.
        assert_eq!(search.calls.lock().len(), 6);
    }
}
