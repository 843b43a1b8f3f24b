//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Longest accepted cache TTL, one year.
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where cached chapter listings are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheBackend {
    /// The `query_cache` table, shared by every server process.
    Postgres,
    /// A map inside this process.
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(CacheBackend::Postgres),
            "memory" => Ok(CacheBackend::Memory),
            other => Err(format!("'{}' is not a cache backend (postgres, memory)", other)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub log_level: Level,
    pub cache_backend: CacheBackend,
    pub cache_ttl: Duration,
    pub rate_limit_per_minute: u32,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address = parse_var("BIND_ADDRESS", "0.0.0.0:3000")?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;
        let database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", "5")?;

        let log_level = parse_var("RUST_LOG", "INFO")?;

        // --- Load Cache and Traffic Settings ---
        let cache_backend = parse_var("CACHE_BACKEND", "postgres")?;
        let cache_ttl = cache_ttl(parse_var("CACHE_TTL_SECS", "3600")?)?;
        let rate_limit_per_minute = parse_var("RATE_LIMIT_PER_MINUTE", "30")?;
        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());

        Ok(Self {
            bind_address,
            database_url,
            database_max_connections,
            log_level,
            cache_backend,
            cache_ttl,
            rate_limit_per_minute,
            cors_origin,
        })
    }
}

/// Bounds the cache TTL so expiry timestamps can always be computed.
fn cache_ttl(secs: u64) -> Result<Duration, ConfigError> {
    if (1..=MAX_CACHE_TTL_SECS).contains(&secs) {
        Ok(Duration::from_secs(secs))
    } else {
        Err(ConfigError::InvalidValue(
            "CACHE_TTL_SECS".to_string(),
            format!("{} is outside 1..={}", secs, MAX_CACHE_TTL_SECS),
        ))
    }
}

/// Reads `name`, falling back to `default` when unset, and parses it.
fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("'{}': {}", raw, e)))
}
