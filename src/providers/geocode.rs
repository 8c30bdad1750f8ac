//! Address resolution via a Nominatim-compatible geocoding API.
//!
//! Returns `Ok(None)` when the provider answers with zero candidates, so
//! callers can distinguish an unresolvable address from an unreachable
//! provider (an `Err`).

use crate::models::{AddressComponents, Coordinates, Location};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Free text to coordinates plus administrative components.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Option<Location>>;
}

// Nominatim serializes coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: Option<String>,
    importance: Option<f64>,
    #[serde(default)]
    address: NominatimAddress,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    suburb: Option<String>,
    neighbourhood: Option<String>,
    quarter: Option<String>,
    city: Option<String>,
    town: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
}

/// Nominatim client.
pub struct NominatimGeocoder {
    http: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: String, user_agent: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("failed to build Nominatim HTTP client")?;

        Ok(Self { http, base_url })
    }

    /// Append a country hint when the input carries none; markedly better
    /// candidate ranking for bare street addresses.
    fn normalize_address(address: &str) -> String {
        let lower = address.to_lowercase();
        if lower.contains("brasil") || lower.contains("brazil") {
            address.to_string()
        } else {
            format!("{}, Brasil", address)
        }
    }

    /// Map the highest-relevance candidate onto a `Location`, degrading
    /// each administrative field through its fallback chain.
    fn to_location(result: NominatimResult) -> Option<Location> {
        let latitude: f64 = result.lat.parse().ok()?;
        let longitude: f64 = result.lon.parse().ok()?;
        let addr = result.address;

        let components = AddressComponents {
            neighborhood: addr.suburb.or(addr.neighbourhood).or(addr.quarter),
            city: addr.city.or(addr.town).or(addr.municipality),
            state: addr.state,
            postal_code: addr.postcode,
            country: addr.country.unwrap_or_else(|| "Brasil".to_string()),
        };

        Some(Location {
            coordinates: Coordinates {
                latitude,
                longitude,
            },
            formatted_address: result.display_name.unwrap_or_default(),
            components,
            confidence: result.importance.unwrap_or(0.5),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn resolve(&self, address: &str) -> Result<Option<Location>> {
        let normalized = Self::normalize_address(address);
        let url = format!("{}/search", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", normalized.as_str()),
                ("format", "json"),
                ("countrycodes", "br"),
                ("limit", "3"),
                ("addressdetails", "1"),
            ])
            .send()
            .await
            .context("Nominatim request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Nominatim API error: {}", response.status());
        }

        let mut results: Vec<NominatimResult> = response
            .json()
            .await
            .context("failed to parse Nominatim response")?;

        if results.is_empty() {
            debug!("no geocoding candidates for: {}", address);
            return Ok(None);
        }

        // First result is the most relevant; no disambiguation.
        Ok(Self::to_location(results.remove(0)))
    }
}
