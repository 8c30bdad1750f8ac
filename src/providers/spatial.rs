//! Overpass-style spatial feature search.
//!
//! One client is shared by the transit and POI providers. A minimum
//! interval between requests is enforced client-wide, so however callers
//! interleave their queries the aggregate rate respects the upstream usage
//! policy.

use crate::models::Coordinates;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// A raw feature returned by a spatial search.
#[derive(Debug, Clone)]
pub struct Feature {
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub tags: HashMap<String, String>,
}

/// Radius search for tagged map features around a coordinate.
///
/// `selector` is a tag filter in Overpass syntax, e.g. `"amenity=school"`
/// or a bare key like `"public_transport"`.
#[async_trait]
pub trait SpatialSearch: Send + Sync {
    async fn search(
        &self,
        center: Coordinates,
        radius_m: u32,
        selector: &str,
    ) -> Result<Vec<Feature>>;
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

/// Overpass API client with a shared politeness throttle.
pub struct OverpassClient {
    http: reqwest::Client,
    base_url: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl OverpassClient {
    pub fn new(
        base_url: String,
        user_agent: &str,
        timeout: Duration,
        min_interval: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("failed to build Overpass HTTP client")?;

        Ok(Self {
            http,
            base_url,
            min_interval,
            last_request: Mutex::new(None),
        })
    }

    /// Wait until at least `min_interval` has passed since the previous
    /// request. Held across the stamp update only, not the request itself:
    /// the spacing guarantee is on request starts.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn build_query(center: Coordinates, radius_m: u32, selector: &str) -> String {
        let around = format!(
            "around:{},{:.7},{:.7}",
            radius_m, center.latitude, center.longitude
        );
        format!(
            "[out:json][timeout:25];(node[{sel}]({around});way[{sel}]({around}););out center 30;",
            sel = selector,
            around = around,
        )
    }
}

#[async_trait]
impl SpatialSearch for OverpassClient {
    async fn search(
        &self,
        center: Coordinates,
        radius_m: u32,
        selector: &str,
    ) -> Result<Vec<Feature>> {
        self.throttle().await;

        let query = Self::build_query(center, radius_m, selector);
        debug!("overpass query: {}", query);

        let response = self
            .http
            .post(&self.base_url)
            .form(&[("data", query.as_str())])
            .send()
            .await
            .context("Overpass request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Overpass API error: {}", response.status());
        }

        let body: OverpassResponse = response
            .json()
            .await
            .context("failed to parse Overpass response")?;

        let features = body
            .elements
            .into_iter()
            .filter_map(|element| {
                // Nodes carry lat/lon directly; ways only a computed center.
                let (lat, lon) = match (element.lat, element.lon, &element.center) {
                    (Some(lat), Some(lon), _) => (lat, lon),
                    (_, _, Some(center)) => (center.lat, center.lon),
                    _ => return None,
                };
                Some(Feature {
                    name: element.tags.get("name").cloned(),
                    latitude: lat,
                    longitude: lon,
                    tags: element.tags,
                })
            })
            .collect();

        Ok(features)
    }
}

/// Great-circle distance between a query center and a feature, in meters.
pub fn haversine_m(center: Coordinates, latitude: f64, longitude: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    let d_lat = (latitude - center.latitude).to_radians();
    let d_lon = (longitude - center.longitude).to_radians();
    let lat1 = center.latitude.to_radians();
    let lat2 = latitude.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * a.sqrt().asin() * EARTH_RADIUS_M
}
