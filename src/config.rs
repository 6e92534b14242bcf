use anyhow::{Context, Result};
use log::debug;
use std::env;
use std::time::Duration;

use crate::http::RetryPolicy;

pub const DEFAULT_API_URL: &str = "https://api.gbif.org/v1/";
pub const DEFAULT_MAPS_URL: &str = "https://api.gbif.org/v2/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by every resource module created from one [`crate::Gbif`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the v1 API (occurrence, species, registry, vocabulary...).
    pub api_url: String,
    /// Base URL of the v2 API, which serves map tiles.
    pub maps_url: String,
    /// Per-request network timeout.
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
    /// Response caching; `None` disables it.
    pub cache: Option<CacheConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            maps_url: DEFAULT_MAPS_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("gbif-client/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryPolicy::default(),
            cache: None,
        }
    }
}

impl ClientConfig {
    /// Reads overrides from `GBIF_API_URL`, `GBIF_MAPS_URL`, `GBIF_TIMEOUT_SECS`
    /// and `GBIF_CACHE_TTL_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("GBIF_API_URL") {
            debug!("Using API URL from GBIF_API_URL: {}", url);
            config.api_url = url;
        }
        if let Some(url) = lookup("GBIF_MAPS_URL") {
            config.maps_url = url;
        }
        if let Some(secs) = lookup("GBIF_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("Invalid GBIF_TIMEOUT_SECS: {}", secs))?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = lookup("GBIF_CACHE_TTL_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("Invalid GBIF_CACHE_TTL_SECS: {}", secs))?;
            config.cache = Some(CacheConfig {
                ttl: Duration::from_secs(secs),
                ..CacheConfig::default()
            });
        }

        Ok(config)
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_maps_url(mut self, url: impl Into<String>) -> Self {
        self.maps_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_capacity: 10_000,
        }
    }
}

/// Joins a base URL and path segments with single slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
