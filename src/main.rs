//! UrbanLens - neighborhood analysis for Brazilian street addresses
//!
//! Geocodes an address and compiles a report covering safety, transit,
//! education, health, commerce, and environment, rendered as Portuguese
//! narrative text alongside the raw provider records. Runs as an HTTP
//! service by default, or analyzes a single address with --address.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bind failure, config error, analysis failure)

mod analysis;
mod cache;
mod cli;
mod config;
mod error;
mod limiter;
mod models;
mod narrative;
mod providers;
mod randomness;
mod server;

use analysis::Pipeline;
use anyhow::{Context, Result};
use cache::Cache;
use cli::Args;
use config::Config;
use randomness::RandomSource;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("UrbanLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Startup failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default urbanlens.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new("urbanlens.toml");

    if path.exists() {
        eprintln!("urbanlens.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write urbanlens.toml")?;

    println!("Created urbanlens.toml with default settings.");
    println!("Edit it to customize providers, cache, and rate limits.");
    Ok(())
}

/// Initialize logging based on verbosity settings. RUST_LOG overrides the
/// CLI-derived level when set.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

async fn run(args: Args) -> Result<()> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let rng = Arc::new(match args.seed {
        Some(seed) => {
            info!("Using seeded random source: {}", seed);
            RandomSource::seeded(seed)
        }
        None => RandomSource::from_entropy(),
    });

    // Cache is best-effort: an unreachable Redis degrades to pass-through.
    let cache = Arc::new(
        Cache::connect(
            &config.cache.redis_url,
            Duration::from_secs(config.cache.default_ttl_seconds),
        )
        .await,
    );
    if !cache.enabled() {
        warn!("running without cache, every request hits the upstream providers");
    }

    let pipeline = Arc::new(Pipeline::from_config(&config, cache.clone(), rng)?);

    // One-shot mode: analyze a single address, print JSON, exit.
    if let Some(ref address) = args.address {
        let report = pipeline
            .analyze(address)
            .await
            .with_context(|| format!("Failed to analyze address: {}", address))?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let state = server::AppState::new(pipeline, cache, &config);
    server::serve(&config, state).await
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from urbanlens.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
