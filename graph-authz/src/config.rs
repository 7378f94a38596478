//! Configuration for the authorization engine
//!
//! Every field has a default so the engine runs without any environment.
//! `from_env` overrides defaults from `GRAPH_AUTHZ_*` variables.

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const ENV_PREFIX: &str = "GRAPH_AUTHZ_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthzConfig {
    /// Total-count cache configuration
    pub cache: CacheConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Page size used when callers do not pass one
    pub default_page_size: i64,

    /// Policy document loaded at startup
    pub policy_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    pub cleanup_interval_seconds: u64,
    pub max_entries: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            default_page_size: 10,
            policy_path: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            cleanup_interval_seconds: 6 * 60 * 60,
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "graph_authz=info".to_string(),
            json: false,
        }
    }
}

impl AuthzConfig {
    /// Build a configuration from `GRAPH_AUTHZ_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let mut config = Self::default();

        // === Cache ===
        if let Some(value) = var("CACHE_TTL_SECONDS") {
            config.cache.ttl_seconds = parse_var("CACHE_TTL_SECONDS", &value)?;
        }
        if let Some(value) = var("CACHE_CLEANUP_INTERVAL_SECONDS") {
            config.cache.cleanup_interval_seconds =
                parse_var("CACHE_CLEANUP_INTERVAL_SECONDS", &value)?;
        }
        if let Some(value) = var("CACHE_MAX_ENTRIES") {
            config.cache.max_entries = parse_var("CACHE_MAX_ENTRIES", &value)?;
        }

        // === Logging ===
        if let Some(level) = var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(value) = var("LOG_JSON") {
            config.logging.json = parse_var("LOG_JSON", &value)?;
        }

        // === Queries ===
        if let Some(value) = var("DEFAULT_PAGE_SIZE") {
            config.default_page_size = parse_var("DEFAULT_PAGE_SIZE", &value)?;
        }
        config.policy_path = var("POLICY_PATH").map(PathBuf::from);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_page_size <= 0 {
            return Err(AuthzError::Configuration(format!(
                "{}DEFAULT_PAGE_SIZE must be greater than 0",
                ENV_PREFIX
            )));
        }
        if self.cache.ttl_seconds == 0 {
            return Err(AuthzError::Configuration(format!(
                "{}CACHE_TTL_SECONDS must be greater than 0",
                ENV_PREFIX
            )));
        }
        if self.cache.cleanup_interval_seconds == 0 {
            return Err(AuthzError::Configuration(format!(
                "{}CACHE_CLEANUP_INTERVAL_SECONDS must be greater than 0",
                ENV_PREFIX
            )));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        AuthzError::Configuration(format!("Invalid value for {}{}: {}", ENV_PREFIX, name, value))
    })
}
