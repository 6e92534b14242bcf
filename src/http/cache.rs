//! Response caching as a transport decorator.

use async_trait::async_trait;
use log::debug;
use moka::future::Cache;
use reqwest::Method;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::CacheConfig;

use super::transport::{HttpRequest, HttpResponse, RequestBody, Transport, TransportError};

/// Cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
}

/// URL plus the ordered, unencoded query pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    url: String,
    query: Vec<(String, String)>,
}

/// Wraps another [`Transport`] and serves repeated anonymous GETs from memory.
///
/// Only successful responses are stored. Requests carrying credentials or
/// any custom header are always forwarded.
pub struct CachingTransport<T> {
    inner: T,
    cache: Cache<CacheKey, HttpResponse>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T: Transport> CachingTransport<T> {
    pub fn new(inner: T, config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .build();

        Self {
            inner,
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn cache_key(request: &HttpRequest) -> Option<CacheKey> {
        if request.method != Method::GET
            || request.basic_auth.is_some()
            || !request.headers.is_empty()
            || request.body != RequestBody::Empty
        {
            return None;
        }

        Some(CacheKey {
            url: request.url.clone(),
            query: request.query.clone(),
        })
    }
}

#[async_trait]
impl<T: Transport> Transport for CachingTransport<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let Some(key) = Self::cache_key(&request) else {
            return self.inner.execute(request).await;
        };

        if let Some(response) = self.cache.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit: {} {:?}", key.url, key.query);
            return Ok(response);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let response = self.inner.execute(request).await?;
        if response.is_success() {
            self.cache.insert(key, response.clone()).await;
        }
        Ok(response)
    }
}
