//! Runtime configuration
//!
//! Defaults, then `SHOPFRONT_*` environment variables, then command-line flags.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{CacheManager, MemoryCache, TieredCache};
use crate::catalog::{ApiClient, ApiError, CatalogService, CatalogSettings};
use crate::cli::Cli;
use crate::logging::LOG_ENV;
use crate::storage::JsonStore;

pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be true or false, got '{value}'")]
    InvalidBool { var: &'static str, value: String },

    #[error("No data directory available; set SHOPFRONT_DATA_DIR or pass --data-dir")]
    NoDataDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Storefront API root
    pub api_url: String,
    /// Per-request HTTP timeout
    pub timeout: Duration,
    pub products_ttl: Duration,
    pub product_ttl: Duration,
    /// Overrides the platform cache directory
    pub cache_dir: Option<PathBuf>,
    /// Overrides the platform data directory (cart, logs)
    pub data_dir: Option<PathBuf>,
    /// Serve only cached and bundled data
    pub offline: bool,
    /// Log filter directive
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let catalog = CatalogSettings::default();
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            products_ttl: catalog.products_ttl,
            product_ttl: catalog.product_ttl,
            cache_dir: None,
            data_dir: None,
            offline: false,
            log_level: None,
        }
    }
}

impl Config {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("SHOPFRONT_API_URL") {
            config.api_url = url;
        }
        if let Some(dir) = get("SHOPFRONT_CACHE_DIR") {
            config.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = get("SHOPFRONT_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(value) = get("SHOPFRONT_OFFLINE") {
            config.offline = parse_bool("SHOPFRONT_OFFLINE", &value)?;
        }
        if let Some(value) = get("SHOPFRONT_TIMEOUT_SECS") {
            config.timeout = parse_secs("SHOPFRONT_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = get("SHOPFRONT_PRODUCTS_TTL_SECS") {
            config.products_ttl = parse_secs("SHOPFRONT_PRODUCTS_TTL_SECS", &value)?;
        }
        if let Some(value) = get("SHOPFRONT_PRODUCT_TTL_SECS") {
            config.product_ttl = parse_secs("SHOPFRONT_PRODUCT_TTL_SECS", &value)?;
        }
        if let Some(level) = get(LOG_ENV) {
            config.log_level = Some(level);
        }
        Ok(config)
    }

    /// Applies command-line flags on top of the current values
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.api_url {
            self.api_url = url.clone();
        }
        if let Some(dir) = &cli.cache_dir {
            self.cache_dir = Some(dir.clone());
        }
        if let Some(dir) = &cli.data_dir {
            self.data_dir = Some(dir.clone());
        }
        if cli.offline {
            self.offline = true;
        }
        if let Some(level) = &cli.log_level {
            self.log_level = Some(level.clone());
        }
    }

    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            products_ttl: self.products_ttl,
            product_ttl: self.product_ttl,
            offline: self.offline,
        }
    }

    /// Durable cache tier; `None` when no cache directory can be determined
    pub fn cache_manager(&self) -> Option<CacheManager> {
        match &self.cache_dir {
            Some(dir) => Some(CacheManager::with_dir(dir.clone())),
            None => CacheManager::new(),
        }
    }

    /// Store holding the cart
    pub fn data_store(&self) -> Result<JsonStore, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(JsonStore::new(dir.clone())),
            None => JsonStore::default_location().ok_or(ConfigError::NoDataDir),
        }
    }

    /// Where the terminal storefront writes its log files
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.data_store().ok().map(|store| store.dir().join("logs"))
    }

    /// Builds the catalog service with both cache tiers
    pub fn build_catalog(&self) -> Result<CatalogService, ApiError> {
        let client = ApiClient::new(&self.api_url, self.timeout)?;
        let disk = self.cache_manager();
        if disk.is_none() {
            tracing::warn!("No cache directory available, caching in memory only");
        }
        let cache = TieredCache::new(MemoryCache::default(), disk);
        Ok(CatalogService::new(client, cache, self.catalog_settings()))
    }
}

fn parse_secs(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
}
