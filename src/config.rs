//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `urbanlens.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Cache backend settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Upstream provider settings.
    #[serde(default)]
    pub providers: ProviderConfig,

    /// Request-rate limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Include internal error detail in responses.
    #[serde(default)]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// Cache backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Default TTL for cached entries, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub default_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            default_ttl_seconds: default_cache_ttl(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://localhost:6379/0".to_string()
}

fn default_cache_ttl() -> u64 {
    3600
}

/// Upstream provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Nominatim-compatible geocoding endpoint.
    #[serde(default = "default_nominatim_base")]
    pub nominatim_base: String,

    /// Overpass-compatible spatial search endpoint.
    #[serde(default = "default_overpass_base")]
    pub overpass_base: String,

    /// IBGE locality API endpoint.
    #[serde(default = "default_ibge_base")]
    pub ibge_base: String,

    /// User-Agent header sent to OpenStreetMap services, per usage policy.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-call timeout for provider requests, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Minimum interval between spatial search requests, in milliseconds.
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// Search radius for transit features, in meters.
    #[serde(default = "default_transit_radius")]
    pub transit_radius_m: u32,

    /// Search radius for points of interest, in meters.
    #[serde(default = "default_poi_radius")]
    pub poi_radius_m: u32,

    /// TTL for cached geocoding results, in seconds.
    #[serde(default = "default_geocode_ttl")]
    pub geocode_ttl_seconds: u64,

    /// TTL for cached simulated safety records, in seconds.
    #[serde(default = "default_safety_ttl")]
    pub safety_ttl_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            nominatim_base: default_nominatim_base(),
            overpass_base: default_overpass_base(),
            ibge_base: default_ibge_base(),
            user_agent: default_user_agent(),
            request_timeout_seconds: default_request_timeout(),
            request_delay_ms: default_request_delay(),
            transit_radius_m: default_transit_radius(),
            poi_radius_m: default_poi_radius(),
            geocode_ttl_seconds: default_geocode_ttl(),
            safety_ttl_seconds: default_safety_ttl(),
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn geocode_ttl(&self) -> Duration {
        Duration::from_secs(self.geocode_ttl_seconds)
    }

    pub fn safety_ttl(&self) -> Duration {
        Duration::from_secs(self.safety_ttl_seconds)
    }
}

fn default_nominatim_base() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_overpass_base() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_ibge_base() -> String {
    "https://servicodados.ibge.gov.br/api/v1".to_string()
}

fn default_user_agent() -> String {
    "UrbanLens/1.0 (contato@urbanlens.dev)".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_request_delay() -> u64 {
    100
}

fn default_transit_radius() -> u32 {
    1000
}

fn default_poi_radius() -> u32 {
    1500
}

fn default_geocode_ttl() -> u64 {
    86400 // geocoding is stable, cache for a day
}

fn default_safety_ttl() -> u64 {
    3600 // synthetic, but should feel sticky within a session
}

/// Request-rate limits, per endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Requests per window for the full analysis endpoint.
    #[serde(default = "default_analyze_max")]
    pub analyze_max_requests: usize,

    /// Window for the full analysis endpoint, in seconds.
    #[serde(default = "default_limit_window")]
    pub analyze_window_seconds: u64,

    /// Requests per window for the summary endpoint.
    #[serde(default = "default_summary_max")]
    pub summary_max_requests: usize,

    /// Window for the summary endpoint, in seconds.
    #[serde(default = "default_limit_window")]
    pub summary_window_seconds: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            analyze_max_requests: default_analyze_max(),
            analyze_window_seconds: default_limit_window(),
            summary_max_requests: default_summary_max(),
            summary_window_seconds: default_limit_window(),
        }
    }
}

fn default_analyze_max() -> usize {
    10
}

fn default_summary_max() -> usize {
    20
}

fn default_limit_window() -> u64 {
    60
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but
    /// can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new("urbanlens.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings; optional
    /// arguments only override when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref host) = args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if args.debug {
            self.server.debug = true;
        }
        if let Some(ref redis_url) = args.redis_url {
            self.cache.redis_url = redis_url.clone();
        }
        if let Some(timeout) = args.request_timeout {
            self.providers.request_timeout_seconds = timeout;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
