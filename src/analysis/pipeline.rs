//! Analysis orchestration.
//!
//! Drives the full flow for one address: validate, resolve, fan out to the
//! category providers concurrently, derive metrics, and render narratives.
//! Category-provider failures are absorbed into degraded records per the
//! partial-failure policy; only malformed input and location-resolution
//! failures abort.

use crate::analysis::derive;
use crate::cache::Cache;
use crate::config::Config;
use crate::error::AnalysisError;
use crate::models::{
    AnalysisReport, AnalysisSummary, Location, Narratives, PoiData, RawData, SafetyData,
    SummarySections, TransitData, UNIDENTIFIED_F, UNIDENTIFIED_M,
};
use crate::narrative::NarrativeGenerator;
use crate::providers::{
    Demographics, Geocoder, IbgeClient, NominatimGeocoder, OverpassClient, PoiProvider,
    SafetyProvider, SpatialSearch, TransitProvider,
};
use crate::randomness::RandomSource;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// Minimum address length after trimming.
const MIN_ADDRESS_CHARS: usize = 5;

/// Character budget for truncated summary narratives.
const SUMMARY_CHARS: usize = 100;

/// Tunables the pipeline needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub transit_radius_m: u32,
    pub poi_radius_m: u32,
    pub geocode_ttl: Duration,
    pub safety_ttl: Duration,
    pub provider_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            transit_radius_m: 1000,
            poi_radius_m: 1500,
            geocode_ttl: Duration::from_secs(86400),
            safety_ttl: Duration::from_secs(3600),
            provider_timeout: Duration::from_secs(30),
        }
    }
}

/// The analysis pipeline. All collaborators sit behind trait objects so
/// tests can inject in-memory fakes.
pub struct Pipeline {
    geocoder: Arc<dyn Geocoder>,
    demographics: Arc<dyn Demographics>,
    safety: SafetyProvider,
    transit: TransitProvider,
    poi: PoiProvider,
    narrative: NarrativeGenerator,
    rng: Arc<RandomSource>,
    cache: Arc<Cache>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        demographics: Arc<dyn Demographics>,
        search: Arc<dyn SpatialSearch>,
        cache: Arc<Cache>,
        rng: Arc<RandomSource>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            geocoder,
            demographics,
            safety: SafetyProvider::new(rng.clone()),
            transit: TransitProvider::new(search.clone(), options.transit_radius_m),
            poi: PoiProvider::new(search, options.poi_radius_m),
            narrative: NarrativeGenerator::new(rng.clone()),
            rng,
            cache,
            options,
        }
    }

    /// Wire up the real upstream clients from configuration.
    pub fn from_config(
        config: &Config,
        cache: Arc<Cache>,
        rng: Arc<RandomSource>,
    ) -> anyhow::Result<Self> {
        let providers = &config.providers;
        let timeout = providers.request_timeout();

        let geocoder = NominatimGeocoder::new(
            providers.nominatim_base.clone(),
            &providers.user_agent,
            timeout,
        )?;
        let demographics = IbgeClient::new(providers.ibge_base.clone(), timeout)?;
        let search = OverpassClient::new(
            providers.overpass_base.clone(),
            &providers.user_agent,
            timeout,
            providers.request_delay(),
        )?;

        let options = PipelineOptions {
            transit_radius_m: providers.transit_radius_m,
            poi_radius_m: providers.poi_radius_m,
            geocode_ttl: providers.geocode_ttl(),
            safety_ttl: providers.safety_ttl(),
            provider_timeout: timeout,
        };

        Ok(Self::new(
            Arc::new(geocoder),
            Arc::new(demographics),
            Arc::new(search),
            cache,
            rng,
            options,
        ))
    }

    fn validate(address: &str) -> Result<String, AnalysisError> {
        let trimmed = address.trim();
        if trimmed.chars().count() < MIN_ADDRESS_CHARS {
            return Err(AnalysisError::InvalidInput(
                "informe um endereço com pelo menos 5 caracteres".to_string(),
            ));
        }
        Ok(trimmed.to_string())
    }

    /// Resolve an address, consulting the cache first. Validation happens
    /// before any network call.
    async fn resolve(&self, address: &str) -> Result<Location, AnalysisError> {
        let trimmed = Self::validate(address)?;
        let cache_key = trimmed.to_lowercase();

        let geocoder = self.geocoder.clone();
        let query = trimmed.clone();
        let resolved = self
            .cache
            .cached(
                "geocode",
                &[cache_key.as_str()],
                Some(self.options.geocode_ttl),
                move || async move { geocoder.resolve(&query).await },
            )
            .await
            .map_err(|e| AnalysisError::Upstream(e.to_string()))?;

        resolved.ok_or(AnalysisError::AddressNotFound)
    }

    /// Full analysis for one address.
    pub async fn analyze(&self, address: &str) -> Result<AnalysisReport, AnalysisError> {
        let location = self.resolve(address).await?;
        let (city, state, neighborhood) = location.locality_key();
        let center = location.coordinates;

        info!(
            "analyzing {} ({}, {})",
            location.formatted_address, center.latitude, center.longitude
        );

        let (demographics, safety, transit, poi) = tokio::join!(
            self.fetch_demographics(&city, &state),
            self.fetch_safety(&city, &state, &neighborhood),
            self.fetch_transit(center),
            self.fetch_poi(center),
        );

        let education = derive::derive_education(&poi);
        let health = derive::derive_health(&poi);
        let commerce = derive::derive_commerce(&poi);
        let environment = derive::derive_environment(&self.rng);

        let narratives = Narratives {
            safety: self.narrative.safety(&safety),
            transport: self.narrative.transport(&transit),
            education: self.narrative.education(&education),
            health: self.narrative.health(&health),
            commerce: self.narrative.commerce(&commerce),
            environment: self.narrative.environment(&environment),
        };

        let analise_final = self.narrative.synthesis([
            Some(safety.safety_score),
            Some(transit.transport_score),
            Some(environment.environmental_score),
        ]);

        Ok(AnalysisReport {
            bairro: location
                .components
                .neighborhood
                .clone()
                .unwrap_or_else(|| UNIDENTIFIED_M.to_string()),
            cidade: location
                .components
                .city
                .clone()
                .unwrap_or_else(|| UNIDENTIFIED_F.to_string()),
            estado: location
                .components
                .state
                .clone()
                .unwrap_or_else(|| UNIDENTIFIED_M.to_string()),
            coordenadas: center,
            endereco_formatado: location.formatted_address,
            narratives,
            analise_final,
            dados_brutos: RawData {
                demographics,
                safety,
                transit,
                infrastructure: poi,
            },
            timestamp: Utc::now(),
            fonte_dados: "Múltiplas fontes públicas e APIs abertas".to_string(),
        })
    }

    /// Short-form analysis: same pipeline, truncated narratives. Errors
    /// from the full analysis propagate unchanged.
    pub async fn summarize(&self, address: &str) -> Result<AnalysisSummary, AnalysisError> {
        let report = self.analyze(address).await?;

        Ok(AnalysisSummary {
            resumo: SummarySections {
                seguranca: truncate_chars(&report.narratives.safety, SUMMARY_CHARS),
                transporte: truncate_chars(&report.narratives.transport, SUMMARY_CHARS),
                infraestrutura: format!(
                    "Região com {} escolas próximas",
                    report.dados_brutos.infrastructure.schools.count
                ),
            },
            bairro: report.bairro,
            cidade: report.cidade,
            coordenadas: report.coordenadas,
        })
    }

    /// The resolver alone, exposed for the geocode endpoint.
    pub async fn geocode(&self, address: &str) -> Result<Location, AnalysisError> {
        self.resolve(address).await
    }

    /// Demographic enrichment is optional: skipped without city or state,
    /// and any failure or timeout degrades to `None`.
    async fn fetch_demographics(
        &self,
        city: &str,
        state: &str,
    ) -> Option<crate::models::MunicipalityInfo> {
        if city.is_empty() || state.is_empty() {
            return None;
        }

        let client = self.demographics.clone();
        let (city_arg, state_arg) = (city.to_string(), state.to_string());
        let (city_key, state_key) = (city.to_lowercase(), state.to_lowercase());
        // The args slice must outlive the future, which is awaited below.
        let args = [city_key.as_str(), state_key.as_str()];
        let lookup = self.cache.cached(
            "ibge_municipio",
            &args,
            Some(self.options.geocode_ttl),
            move || async move { client.municipality(&city_arg, &state_arg).await },
        );

        match timeout(self.options.provider_timeout, lookup).await {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                warn!("demographic lookup failed: {}", e);
                None
            }
            Err(_) => {
                warn!("demographic lookup timed out");
                None
            }
        }
    }

    /// Simulated locally, but cached so scores feel sticky within a
    /// session.
    async fn fetch_safety(&self, city: &str, state: &str, neighborhood: &str) -> SafetyData {
        let provider = &self.safety;
        let (c, s, n) = (
            city.to_string(),
            state.to_string(),
            neighborhood.to_string(),
        );
        let (city_key, state_key, hood_key) = (
            city.to_lowercase(),
            state.to_lowercase(),
            neighborhood.to_lowercase(),
        );
        let cached = self
            .cache
            .cached(
                "security_analysis",
                &[city_key.as_str(), state_key.as_str(), hood_key.as_str()],
                Some(self.options.safety_ttl),
                move || async move { Ok(Some(provider.fetch(&c, &s, &n))) },
            )
            .await;

        match cached {
            Ok(Some(data)) => data,
            _ => self.safety.fetch(city, state, neighborhood),
        }
    }

    async fn fetch_transit(&self, center: crate::models::Coordinates) -> TransitData {
        match timeout(self.options.provider_timeout, self.transit.fetch(center)).await {
            Ok(data) => data,
            Err(_) => {
                warn!("transit fetch timed out, using neutral fallback");
                TransitData::unavailable()
            }
        }
    }

    /// No deadline around the fan-out as a whole: six throttled sequential
    /// sub-queries can legitimately take longer than any single call's
    /// budget. Each sub-query is bounded by the HTTP client timeout and a
    /// failed one degrades to an empty record for that category only.
    async fn fetch_poi(&self, center: crate::models::Coordinates) -> PoiData {
        self.poi.fetch(center).await
    }
}

/// Truncate to a character budget and append an ellipsis marker, the way
/// the summary endpoint has always rendered it. Char-based so multi-byte
/// Portuguese text never splits mid-codepoint.
fn truncate_chars(text: &str, limit: usize) -> String {
    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::models::{AddressComponents, Coordinates};
    use crate::providers::spatial::Feature;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockGeocoder {
        location: Option<Location>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockGeocoder {
        fn found(location: Location) -> Self {
            Self {
                location: Some(location),
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn not_found() -> Self {
            Self {
                location: None,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn unreachable() -> Self {
            Self {
                location: None,
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Geocoder for MockGeocoder {
        async fn resolve(&self, _address: &str) -> anyhow::Result<Option<Location>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("nominatim unreachable");
            }
            Ok(self.location.clone())
        }
    }

    struct MockDemographics {
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockDemographics {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Demographics for MockDemographics {
        async fn municipality(
            &self,
            city: &str,
            _state: &str,
        ) -> anyhow::Result<Option<crate::models::MunicipalityInfo>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("ibge unreachable");
            }
            Ok(Some(crate::models::MunicipalityInfo {
                code: 3550308,
                name: city.to_string(),
                state: "SP".to_string(),
                region: "Sudeste".to_string(),
                population: None,
                population_density: None,
                gdp_per_capita: None,
                hdi: None,
            }))
        }
    }

    struct MockSearch {
        fail: bool,
        hits: usize,
    }

    #[async_trait]
    impl SpatialSearch for MockSearch {
        async fn search(
            &self,
            center: Coordinates,
            _radius_m: u32,
            selector: &str,
        ) -> anyhow::Result<Vec<Feature>> {
            if self.fail {
                anyhow::bail!("overpass unreachable");
            }
            let tags: HashMap<String, String> = if selector == "public_transport" {
                [("highway".to_string(), "bus_stop".to_string())].into()
            } else {
                HashMap::new()
            };
            Ok((0..self.hits)
                .map(|i| Feature {
                    name: Some(format!("Lugar {}", i)),
                    latitude: center.latitude + 0.001 * i as f64,
                    longitude: center.longitude,
                    tags: tags.clone(),
                })
                .collect())
        }
    }

    fn paulista() -> Location {
        Location {
            coordinates: Coordinates {
                latitude: -23.5613,
                longitude: -46.6563,
            },
            formatted_address: "Avenida Paulista, 1000, Bela Vista, São Paulo".to_string(),
            components: AddressComponents {
                neighborhood: Some("Bela Vista".to_string()),
                city: Some("São Paulo".to_string()),
                state: Some("SP".to_string()),
                postal_code: Some("01310-100".to_string()),
                country: "Brasil".to_string(),
            },
            confidence: 0.8,
        }
    }

    fn pipeline_with(
        geocoder: Arc<MockGeocoder>,
        demographics_fail: bool,
        search_fail: bool,
        cache: Arc<Cache>,
    ) -> Pipeline {
        Pipeline::new(
            geocoder,
            Arc::new(MockDemographics::new(demographics_fail)),
            Arc::new(MockSearch {
                fail: search_fail,
                hits: 3,
            }),
            cache,
            Arc::new(RandomSource::seeded(42)),
            PipelineOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_short_address_rejected_before_any_network_call() {
        let geocoder = Arc::new(MockGeocoder::found(paulista()));
        let pipeline = pipeline_with(geocoder.clone(), false, false, Arc::new(Cache::disabled()));

        for input in ["", "   ", "Rua", "  ab  "] {
            let result = pipeline.analyze(input).await;
            assert!(matches!(result, Err(AnalysisError::InvalidInput(_))), "{:?}", input);
        }

        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unresolvable_address_is_not_found() {
        let pipeline = pipeline_with(
            Arc::new(MockGeocoder::not_found()),
            false,
            false,
            Arc::new(Cache::disabled()),
        );

        let result = pipeline.analyze("Rua Inexistente 123").await;
        assert!(matches!(result, Err(AnalysisError::AddressNotFound)));
    }

    #[tokio::test]
    async fn test_unreachable_geocoder_is_upstream_error() {
        let pipeline = pipeline_with(
            Arc::new(MockGeocoder::unreachable()),
            false,
            false,
            Arc::new(Cache::disabled()),
        );

        let result = pipeline.analyze("Avenida Paulista 1000").await;
        assert!(matches!(result, Err(AnalysisError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_full_report_shape_for_resolved_address() {
        let pipeline = pipeline_with(
            Arc::new(MockGeocoder::found(paulista())),
            false,
            false,
            Arc::new(Cache::disabled()),
        );

        let report = pipeline
            .analyze("Avenida Paulista 1000, São Paulo")
            .await
            .unwrap();

        assert_eq!(report.bairro, "Bela Vista");
        assert_eq!(report.cidade, "São Paulo");
        assert_eq!(report.estado, "SP");
        assert_eq!(report.coordenadas.latitude, -23.5613);
        assert_eq!(report.coordenadas.longitude, -46.6563);

        for narrative in [
            &report.narratives.safety,
            &report.narratives.transport,
            &report.narratives.education,
            &report.narratives.health,
            &report.narratives.commerce,
            &report.narratives.environment,
        ] {
            assert!(!narrative.is_empty());
        }
        assert!(!report.analise_final.is_empty());
        assert!(report.dados_brutos.demographics.is_some());
    }

    #[tokio::test]
    async fn test_every_provider_down_still_yields_wellformed_report() {
        let pipeline = pipeline_with(
            Arc::new(MockGeocoder::found(paulista())),
            true,
            true,
            Arc::new(Cache::disabled()),
        );

        let report = pipeline
            .analyze("Avenida Paulista 1000, São Paulo")
            .await
            .unwrap();

        // Degraded but valid: neutral transit, empty POI, no demographics.
        assert!(report.dados_brutos.demographics.is_none());
        assert_eq!(report.dados_brutos.transit, TransitData::unavailable());
        assert_eq!(report.dados_brutos.infrastructure, PoiData::default());
        for narrative in [
            &report.narratives.safety,
            &report.narratives.transport,
            &report.narratives.education,
            &report.narratives.health,
            &report.narratives.commerce,
            &report.narratives.environment,
        ] {
            assert!(!narrative.is_empty());
        }
        assert!(!report.analise_final.is_empty());
    }

    #[tokio::test]
    async fn test_missing_components_skip_demographics() {
        let mut location = paulista();
        location.components.city = None;
        location.components.state = None;
        location.components.neighborhood = None;

        let pipeline = pipeline_with(
            Arc::new(MockGeocoder::found(location)),
            false,
            false,
            Arc::new(Cache::disabled()),
        );

        let report = pipeline.analyze("Estrada do Meio km 4").await.unwrap();
        assert!(report.dados_brutos.demographics.is_none());
        assert_eq!(report.bairro, UNIDENTIFIED_M);
        assert_eq!(report.cidade, UNIDENTIFIED_F);
        assert_eq!(report.estado, UNIDENTIFIED_M);
    }

    #[tokio::test]
    async fn test_geocode_results_are_memoized() {
        let geocoder = Arc::new(MockGeocoder::found(paulista()));
        let cache = Arc::new(Cache::with_store(
            Arc::new(MemoryStore::new()),
            Duration::from_secs(60),
        ));
        let pipeline = pipeline_with(geocoder.clone(), false, false, cache);

        pipeline.geocode("Avenida Paulista 1000").await.unwrap();
        pipeline.geocode("Avenida Paulista 1000").await.unwrap();
        // Same address, different surrounding whitespace and case.
        pipeline.geocode("  avenida paulista 1000  ").await.unwrap();

        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_demographics_lookups_are_memoized() {
        let demographics = Arc::new(MockDemographics::new(false));
        let cache = Arc::new(Cache::with_store(
            Arc::new(MemoryStore::new()),
            Duration::from_secs(60),
        ));
        let pipeline = Pipeline::new(
            Arc::new(MockGeocoder::found(paulista())),
            demographics.clone(),
            Arc::new(MockSearch {
                fail: false,
                hits: 3,
            }),
            cache,
            Arc::new(RandomSource::seeded(42)),
            PipelineOptions::default(),
        );

        pipeline.analyze("Avenida Paulista 1000").await.unwrap();
        let report = pipeline.analyze("Avenida Paulista 1000").await.unwrap();

        assert!(report.dados_brutos.demographics.is_some());
        assert_eq!(demographics.calls.load(Ordering::SeqCst), 1);
    }

    /// Search stub that answers every query, slowly.
    struct SlowSearch {
        delay: Duration,
    }

    #[async_trait]
    impl SpatialSearch for SlowSearch {
        async fn search(
            &self,
            center: Coordinates,
            _radius_m: u32,
            _selector: &str,
        ) -> anyhow::Result<Vec<Feature>> {
            tokio::time::sleep(self.delay).await;
            Ok(vec![Feature {
                name: Some("Lugar".to_string()),
                latitude: center.latitude,
                longitude: center.longitude,
                tags: HashMap::new(),
            }])
        }
    }

    // The six sequential sub-queries may take longer in aggregate than any
    // single call's budget; categories that already answered must survive.
    #[tokio::test]
    async fn test_slow_but_healthy_poi_fanout_keeps_every_category() {
        let options = PipelineOptions {
            provider_timeout: Duration::from_millis(100),
            ..PipelineOptions::default()
        };
        let pipeline = Pipeline::new(
            Arc::new(MockGeocoder::found(paulista())),
            Arc::new(MockDemographics::new(false)),
            Arc::new(SlowSearch {
                delay: Duration::from_millis(30),
            }),
            Arc::new(Cache::disabled()),
            Arc::new(RandomSource::seeded(42)),
            options,
        );

        let report = pipeline
            .analyze("Avenida Paulista 1000, São Paulo")
            .await
            .unwrap();

        let infrastructure = &report.dados_brutos.infrastructure;
        for category in [
            &infrastructure.schools,
            &infrastructure.hospitals,
            &infrastructure.supermarkets,
            &infrastructure.pharmacies,
            &infrastructure.banks,
            &infrastructure.restaurants,
        ] {
            assert_eq!(category.count, 1);
        }
    }

    #[tokio::test]
    async fn test_summary_truncates_and_propagates_shape() {
        let pipeline = pipeline_with(
            Arc::new(MockGeocoder::found(paulista())),
            false,
            false,
            Arc::new(Cache::disabled()),
        );

        let summary = pipeline
            .summarize("Avenida Paulista 1000, São Paulo")
            .await
            .unwrap();

        assert_eq!(summary.bairro, "Bela Vista");
        assert!(summary.resumo.seguranca.ends_with("..."));
        assert!(summary.resumo.seguranca.chars().count() <= SUMMARY_CHARS + 3);
        assert!(summary.resumo.transporte.chars().count() <= SUMMARY_CHARS + 3);
        assert_eq!(summary.resumo.infraestrutura, "Região com 3 escolas próximas");
    }

    #[tokio::test]
    async fn test_summary_propagates_errors_unchanged() {
        let pipeline = pipeline_with(
            Arc::new(MockGeocoder::not_found()),
            false,
            false,
            Arc::new(Cache::disabled()),
        );

        let result = pipeline.summarize("Rua Inexistente 999").await;
        assert!(matches!(result, Err(AnalysisError::AddressNotFound)));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "ã".repeat(150);
        let truncated = truncate_chars(&text, 100);
        assert_eq!(truncated.chars().count(), 103);
        assert!(truncated.ends_with("..."));
    }
}
