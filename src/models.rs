//! Data models for the neighborhood analysis service.
//!
//! This module contains the core data structures used throughout the
//! pipeline: resolved locations, raw provider records, derived per-category
//! metrics, and the assembled analysis report.
//!
//! The public JSON surface keeps the Portuguese field names of the original
//! service contract (`bairro`, `cidade`, `coordenadas`, ...); Rust
//! identifiers stay English via serde renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic coordinates of a resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Administrative components extracted from a geocoding result.
///
/// Every field except `country` is optional: the resolver degrades through
/// provider-specific fallback chains, and downstream stages must tolerate
/// whatever is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressComponents {
    #[serde(rename = "bairro")]
    pub neighborhood: Option<String>,
    #[serde(rename = "cidade")]
    pub city: Option<String>,
    #[serde(rename = "estado")]
    pub state: Option<String>,
    #[serde(rename = "cep")]
    pub postal_code: Option<String>,
    #[serde(rename = "pais")]
    pub country: String,
}

/// A fully resolved location. Immutable once produced by the resolver;
/// serializable so geocoding results are cache-eligible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(flatten)]
    pub coordinates: Coordinates,
    #[serde(rename = "endereco_formatado")]
    pub formatted_address: String,
    #[serde(rename = "componentes")]
    pub components: AddressComponents,
    #[serde(rename = "confianca")]
    pub confidence: f64,
}

impl Location {
    /// The `(city, state, neighborhood)` triple used to bucket simulated
    /// safety data. Missing components collapse to empty strings so the
    /// triple is always hashable.
    pub fn locality_key(&self) -> (String, String, String) {
        (
            self.components.city.clone().unwrap_or_default(),
            self.components.state.clone().unwrap_or_default(),
            self.components.neighborhood.clone().unwrap_or_default(),
        )
    }
}

/// Municipality record from the administrative-statistics lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MunicipalityInfo {
    #[serde(rename = "codigo")]
    pub code: u64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "uf")]
    pub state: String,
    #[serde(rename = "regiao")]
    pub region: String,
    #[serde(rename = "populacao")]
    pub population: Option<u64>,
    #[serde(rename = "densidade_demografica")]
    pub population_density: Option<f64>,
    #[serde(rename = "pib_per_capita")]
    pub gdp_per_capita: Option<f64>,
    #[serde(rename = "idh")]
    pub hdi: Option<f64>,
}

/// Crime-rate tier of the simulated safety feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrimeTier {
    #[serde(rename = "baixo")]
    Low,
    #[serde(rename = "moderado")]
    Moderate,
    #[serde(rename = "alto")]
    High,
}

impl fmt::Display for CrimeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrimeTier::Low => write!(f, "baixo"),
            CrimeTier::Moderate => write!(f, "moderado"),
            CrimeTier::High => write!(f, "alto"),
        }
    }
}

/// Raw output of the safety provider. Simulated from the locality key;
/// the tier is deterministic, the sampled fields are not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyData {
    pub crime_rate: CrimeTier,
    pub main_crime_types: Vec<String>,
    pub safety_score: u8,
    pub police_stations_nearby: u8,
    pub recent_incidents: u8,
    pub data_source: String,
}

/// Raw output of the transit provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitData {
    pub transport_types: Vec<String>,
    pub stations_count: usize,
    pub transport_score: u8,
}

impl TransitData {
    /// Neutral fallback used when the upstream search is unreachable. The
    /// midpoint score keeps the synthesis unbiased and the narrative stage
    /// never has to special-case failure.
    pub fn unavailable() -> Self {
        Self {
            transport_types: vec!["indisponível".to_string()],
            stations_count: 0,
            transport_score: 5,
        }
    }
}

/// A named place returned by a spatial search, with its distance from the
/// queried coordinate in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(rename = "nome")]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "distancia_m")]
    pub distance_m: f64,
}

/// Hits for one point-of-interest category.
///
/// `count` is the full number of matches; `places` is capped to the 5
/// nearest. A failed sub-query leaves the default (empty) record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoiCategory {
    pub count: usize,
    pub places: Vec<Place>,
    pub score: u8,
}

/// Raw output of the points-of-interest provider, one record per fixed
/// category. Each category fails independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoiData {
    #[serde(rename = "escolas")]
    pub schools: PoiCategory,
    #[serde(rename = "hospitais")]
    pub hospitals: PoiCategory,
    #[serde(rename = "supermercados")]
    pub supermarkets: PoiCategory,
    #[serde(rename = "farmacias")]
    pub pharmacies: PoiCategory,
    #[serde(rename = "bancos")]
    pub banks: PoiCategory,
    #[serde(rename = "restaurantes")]
    pub restaurants: PoiCategory,
}

/// Derived education metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationMetrics {
    pub school_count: usize,
    pub school_types: Vec<String>,
    pub schools_nearby: Vec<Place>,
    pub score: u8,
}

/// One entry in the merged health facility list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthFacility {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipo")]
    pub kind: String,
}

/// Derived health metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    pub facilities: Vec<HealthFacility>,
    pub hospital_count: usize,
    pub pharmacy_count: usize,
    pub total_facilities: usize,
}

/// Derived commerce metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommerceMetrics {
    pub commerce_types: Vec<String>,
    pub total_establishments: usize,
}

/// Synthetic environmental metrics. Placeholder for a future real data
/// source, not a load-bearing signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentMetrics {
    pub green_areas: u8,
    pub air_quality: String,
    pub environmental_score: u8,
}

/// Generated narrative text, one sentence per category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Narratives {
    #[serde(rename = "seguranca")]
    pub safety: String,
    #[serde(rename = "transporte")]
    pub transport: String,
    #[serde(rename = "educacao")]
    pub education: String,
    #[serde(rename = "saude")]
    pub health: String,
    #[serde(rename = "comercio")]
    pub commerce: String,
    #[serde(rename = "ambiental")]
    pub environment: String,
}

/// Raw provider records attached to the full report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawData {
    #[serde(rename = "demografia")]
    pub demographics: Option<MunicipalityInfo>,
    #[serde(rename = "seguranca")]
    pub safety: SafetyData,
    #[serde(rename = "transporte")]
    pub transit: TransitData,
    #[serde(rename = "infraestrutura")]
    pub infrastructure: PoiData,
}

/// The complete analysis report returned by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub bairro: String,
    pub cidade: String,
    pub estado: String,
    pub coordenadas: Coordinates,
    pub endereco_formatado: String,

    #[serde(flatten)]
    pub narratives: Narratives,

    pub analise_final: String,

    pub dados_brutos: RawData,

    pub timestamp: DateTime<Utc>,
    pub fonte_dados: String,
}

/// Truncated narrative sections of the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarySections {
    pub seguranca: String,
    pub transporte: String,
    pub infraestrutura: String,
}

/// Short-form result of `summarize`: two truncated narratives plus one
/// derived infrastructure sentence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub bairro: String,
    pub cidade: String,
    pub resumo: SummarySections,
    pub coordenadas: Coordinates,
}

/// Placeholder used when a masculine administrative component is missing.
pub const UNIDENTIFIED_M: &str = "Não identificado";
/// Feminine form, for `cidade`.
pub const UNIDENTIFIED_F: &str = "Não identificada";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locality_key_defaults_empty() {
        let location = Location {
            coordinates: Coordinates {
                latitude: -23.56,
                longitude: -46.65,
            },
            formatted_address: "Avenida Paulista, São Paulo".to_string(),
            components: AddressComponents {
                city: Some("São Paulo".to_string()),
                ..Default::default()
            },
            confidence: 0.8,
        };

        let (city, state, neighborhood) = location.locality_key();
        assert_eq!(city, "São Paulo");
        assert_eq!(state, "");
        assert_eq!(neighborhood, "");
    }

    #[test]
    fn test_transit_fallback_is_neutral() {
        let fallback = TransitData::unavailable();
        assert_eq!(fallback.transport_score, 5);
        assert_eq!(fallback.stations_count, 0);
        assert_eq!(fallback.transport_types, vec!["indisponível"]);
    }

    #[test]
    fn test_location_roundtrips_through_json() {
        let location = Location {
            coordinates: Coordinates {
                latitude: -23.5613,
                longitude: -46.6563,
            },
            formatted_address: "Avenida Paulista, 1000".to_string(),
            components: AddressComponents {
                neighborhood: Some("Bela Vista".to_string()),
                city: Some("São Paulo".to_string()),
                state: Some("São Paulo".to_string()),
                postal_code: Some("01310-100".to_string()),
                country: "Brasil".to_string(),
            },
            confidence: 0.87,
        };

        let json = serde_json::to_string(&location).unwrap();
        let back: Location = serde_json::from_str(&json).unwrap();
        assert_eq!(back, location);
        assert!(json.contains("\"bairro\""));
        assert!(json.contains("\"endereco_formatado\""));
    }

    #[test]
    fn test_report_serializes_portuguese_fields() {
        let report = AnalysisReport {
            bairro: "Bela Vista".to_string(),
            cidade: "São Paulo".to_string(),
            estado: "SP".to_string(),
            coordenadas: Coordinates {
                latitude: -23.56,
                longitude: -46.65,
            },
            endereco_formatado: "Avenida Paulista, 1000".to_string(),
            narratives: Narratives {
                safety: "s".to_string(),
                transport: "t".to_string(),
                education: "e".to_string(),
                health: "h".to_string(),
                commerce: "c".to_string(),
                environment: "a".to_string(),
            },
            analise_final: "f".to_string(),
            dados_brutos: RawData {
                demographics: None,
                safety: SafetyData {
                    crime_rate: CrimeTier::Low,
                    main_crime_types: vec![],
                    safety_score: 8,
                    police_stations_nearby: 2,
                    recent_incidents: 3,
                    data_source: "Simulado".to_string(),
                },
                transit: TransitData::unavailable(),
                infrastructure: PoiData::default(),
            },
            timestamp: Utc::now(),
            fonte_dados: "Múltiplas fontes públicas".to_string(),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("seguranca").is_some());
        assert!(json.get("transporte").is_some());
        assert!(json.get("educacao").is_some());
        assert!(json.get("saude").is_some());
        assert!(json.get("comercio").is_some());
        assert!(json.get("ambiental").is_some());
        assert!(json.get("analise_final").is_some());
        assert_eq!(json["dados_brutos"]["seguranca"]["crime_rate"], "baixo");
    }
}
