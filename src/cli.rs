//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// UrbanLens - neighborhood analysis for Brazilian street addresses
///
/// Geocodes an address and compiles a report on safety, transit,
/// education, health, commerce, and environment, with generated
/// Portuguese narratives. Runs as an HTTP service or a one-shot CLI.
///
/// Examples:
///   urbanlens
///   urbanlens --port 8080 --debug
///   urbanlens --address "Avenida Paulista, 1000, São Paulo"
///   urbanlens --redis-url redis://cache:6379/0
///   urbanlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for urbanlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to bind the HTTP server to
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to bind the HTTP server to
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Enable debug mode (error responses include upstream detail)
    #[arg(short, long)]
    pub debug: bool,

    /// Redis connection URL for the response cache
    ///
    /// The service runs without caching if Redis is unreachable.
    #[arg(long, value_name = "URL", env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub request_timeout: Option<u64>,

    /// Analyze a single address and print the report as JSON, then exit
    ///
    /// Skips the HTTP server entirely.
    #[arg(short, long, value_name = "ADDRESS")]
    pub address: Option<String>,

    /// Seed for the narrative/simulation random source
    ///
    /// Makes phrasing choices and simulated figures reproducible.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default urbanlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.request_timeout {
            if timeout == 0 {
                return Err("Request timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref url) = self.redis_url {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err("Redis URL must start with 'redis://' or 'rediss://'".to_string());
            }
        }

        if let Some(ref address) = self.address {
            if address.trim().is_empty() {
                return Err("Address must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || self.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
