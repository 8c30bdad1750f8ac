//! Public-transport lookup around a coordinate.
//!
//! Searches `public_transport` features in a fixed radius and classifies
//! each hit into bus/train/subway by tag inspection. Upstream failure
//! degrades to a neutral record instead of an error, so the narrative stage
//! never special-cases it.

use crate::models::{Coordinates, TransitData};
use crate::providers::spatial::{Feature, SpatialSearch};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

/// Transit provider backed by a shared spatial search client.
pub struct TransitProvider {
    search: Arc<dyn SpatialSearch>,
    radius_m: u32,
}

impl TransitProvider {
    pub fn new(search: Arc<dyn SpatialSearch>, radius_m: u32) -> Self {
        Self { search, radius_m }
    }

    /// Classify one feature into a transport type. Features tagged for
    /// public transport but matching none of the rules (ferries, aerial
    /// ways) are ignored.
    fn classify(feature: &Feature) -> Option<&'static str> {
        let tag = |key: &str| feature.tags.get(key).map(String::as_str);

        if tag("highway") == Some("bus_stop")
            || tag("amenity") == Some("bus_station")
            || tag("bus") == Some("yes")
        {
            return Some("ônibus");
        }
        if tag("railway") == Some("subway_entrance")
            || tag("station") == Some("subway")
            || tag("subway") == Some("yes")
        {
            return Some("metrô");
        }
        if matches!(tag("railway"), Some("station") | Some("halt") | Some("tram_stop"))
            || tag("train") == Some("yes")
        {
            return Some("trem");
        }
        None
    }

    /// Fetch and classify transit features around the coordinate.
    pub async fn fetch(&self, center: Coordinates) -> TransitData {
        let features = match self
            .search
            .search(center, self.radius_m, "public_transport")
            .await
        {
            Ok(features) => features,
            Err(e) => {
                warn!("transit search unavailable, using neutral fallback: {}", e);
                return TransitData::unavailable();
            }
        };

        Self::classify_all(&features)
    }

    fn classify_all(features: &[Feature]) -> TransitData {
        let mut types = BTreeSet::new();
        let mut stations_count = 0;

        for feature in features {
            if let Some(kind) = Self::classify(feature) {
                types.insert(kind.to_string());
                stations_count += 1;
            }
        }

        TransitData {
            transport_types: types.into_iter().collect(),
            transport_score: stations_count.min(10) as u8,
            stations_count,
        }
    }
}
