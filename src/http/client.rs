//! Request client: every outbound call to the API goes through here.

use anyhow::Result as AnyResult;
use bytes::Bytes;
use log::debug;
use reqwest::{Client, StatusCode, header::HeaderMap};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::auth::{self, BasicAuth, OAuthConfig};
use crate::config::{ClientConfig, join_url};

use super::cache::{CacheStats, CachingTransport};
use super::error::RequestError;
use super::params::Params;
use super::retry::RetryPolicy;
use super::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};

/// HTTP client that classifies failures and retries transient ones.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct RequestClient {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    cache: Option<Arc<CachingTransport<ReqwestTransport>>>,
}

impl RequestClient {
    /// Creates a client wrapping the given reqwest Client.
    pub fn new(client: Client, retry: RetryPolicy) -> Self {
        Self::with_transport(Arc::new(ReqwestTransport::new(client)), retry)
    }

    pub fn with_transport(transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self {
            transport,
            retry,
            cache: None,
        }
    }

    /// Builds the reqwest client from `config`, adding the response cache
    /// when one is configured.
    pub fn from_config(config: &ClientConfig) -> AnyResult<Self> {
        let transport = ReqwestTransport::from_config(config)?;
        match &config.cache {
            Some(cache_config) => {
                debug!(
                    "Response cache enabled (ttl {:?}, capacity {})",
                    cache_config.ttl, cache_config.max_capacity
                );
                let cache = Arc::new(CachingTransport::new(transport, cache_config));
                Ok(Self {
                    transport: cache.clone(),
                    retry: config.retry,
                    cache: Some(cache),
                })
            }
            None => Ok(Self::with_transport(Arc::new(transport), config.retry)),
        }
    }

    /// Counters of the response cache, if caching is enabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// GET and decode the JSON body.
    #[tracing::instrument(skip(self, headers))]
    pub async fn fetch(&self, url: &str, headers: Option<&HeaderMap>) -> Result<Value, RequestError> {
        self.retry
            .run("GET JSON", || async move {
                let response = self.send(HttpRequest::get(url).with_headers(headers)).await?;
                decode_json(check_status(response)?)
            })
            .await
    }

    /// GET with a query string and decode the JSON body.
    #[tracing::instrument(skip(self, headers))]
    pub async fn fetch_with_params(
        &self,
        url: &str,
        params: &Params,
        headers: Option<&HeaderMap>,
    ) -> Result<Value, RequestError> {
        self.retry
            .run("GET JSON with params", || async move {
                let request = HttpRequest::get(url)
                    .with_params(params)
                    .with_headers(headers);
                decode_json(check_status(self.send(request).await?)?)
            })
            .await
    }

    /// GET returning the undecoded body.
    #[tracing::instrument(skip(self, headers))]
    pub async fn fetch_raw(&self, url: &str, headers: Option<&HeaderMap>) -> Result<Bytes, RequestError> {
        self.retry
            .run("GET raw", || async move {
                let response = self.send(HttpRequest::get(url).with_headers(headers)).await?;
                Ok(check_status(response)?.body)
            })
            .await
    }

    /// GET with a query string returning the undecoded body.
    #[tracing::instrument(skip(self, headers))]
    pub async fn fetch_raw_with_params(
        &self,
        url: &str,
        params: &Params,
        headers: Option<&HeaderMap>,
    ) -> Result<Bytes, RequestError> {
        self.retry
            .run("GET raw with params", || async move {
                let request = HttpRequest::get(url)
                    .with_params(params)
                    .with_headers(headers);
                Ok(check_status(self.send(request).await?)?.body)
            })
            .await
    }

    /// POST a JSON body.
    ///
    /// With `auth` the call uses HTTP Basic and ignores `headers`; otherwise
    /// `headers` must carry the bearer token when one is required.
    #[tracing::instrument(skip(self, body, auth, headers))]
    pub async fn submit_json(
        &self,
        url: &str,
        body: &Value,
        auth: Option<&BasicAuth>,
        headers: Option<&HeaderMap>,
    ) -> Result<Value, RequestError> {
        self.retry
            .run("POST JSON", || async move {
                let request = authorize(HttpRequest::post(url), auth, headers).with_json(body.clone());
                decode_json(check_write_status(self.send(request).await?)?)
            })
            .await
    }

    /// PUT a JSON body. Same contract as [`RequestClient::submit_json`].
    #[tracing::instrument(skip(self, body, auth, headers))]
    pub async fn submit_json_put(
        &self,
        url: &str,
        body: &Value,
        auth: Option<&BasicAuth>,
        headers: Option<&HeaderMap>,
    ) -> Result<Value, RequestError> {
        self.retry
            .run("PUT JSON", || async move {
                let request = authorize(HttpRequest::put(url), auth, headers).with_json(body.clone());
                decode_json(check_write_status(self.send(request).await?)?)
            })
            .await
    }

    /// DELETE, returning the raw status code.
    ///
    /// Not retried. 401 and 403 become [`RequestError::Unauthorized`] and
    /// [`RequestError::Forbidden`]; every other status is returned as-is so
    /// callers can tell 204 from 404.
    #[tracing::instrument(skip(self, auth, headers))]
    pub async fn remove_with_auth(
        &self,
        url: &str,
        auth: Option<&BasicAuth>,
        headers: Option<&HeaderMap>,
        params: Option<&Params>,
    ) -> Result<u16, RequestError> {
        let mut request = authorize(HttpRequest::delete(url), auth, headers);
        if let Some(params) = params {
            request = request.with_params(params);
        }

        let response = self.send(request).await?;
        match response.status {
            StatusCode::UNAUTHORIZED => Err(RequestError::Unauthorized),
            StatusCode::FORBIDDEN => Err(RequestError::Forbidden),
            status => Ok(status.as_u16()),
        }
    }

    /// GET `base_url + endpoint + resource` as JSON; when a successful
    /// response is not JSON, fetch it again raw and return `{"Error": <text>}`.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_or_fallback_to_raw(
        &self,
        base_url: &str,
        endpoint: &str,
        resource: &str,
    ) -> Result<Value, RequestError> {
        let url = format!("{}{}", join_url(base_url, endpoint), resource);
        let url = url.as_str();

        let response = self
            .retry
            .run("GET JSON", || async move {
                check_status(self.send(HttpRequest::get(url)).await?)
            })
            .await?;

        match serde_json::from_slice::<Value>(&response.body) {
            Ok(value) => Ok(value),
            Err(e) => {
                debug!("Response from {} is not JSON ({}), fetching raw content", url, e);
                let raw = self.fetch_raw(url, None).await?;
                let text = std::str::from_utf8(&raw).map_err(|e| {
                    RequestError::Unexpected(format!("Response body is not valid UTF-8: {}", e))
                })?;
                Ok(json!({ "Error": text }))
            }
        }
    }

    /// OAuth2 client-credentials exchange. Fails instead of returning a
    /// failure value, and is never retried.
    pub async fn obtain_oauth_headers(
        &self,
        client_id: &str,
        client_secret: &str,
        token_url: &str,
    ) -> AnyResult<HeaderMap> {
        let config = OAuthConfig::new(client_id, client_secret, token_url)?;
        auth::obtain_oauth_headers(self, &config).await
    }

    /// One attempt, no status classification.
    pub(crate) async fn send_once(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        self.send(request).await
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        self.transport.execute(request).await.map_err(|e| match e {
            TransportError::Timeout => RequestError::Timeout,
            TransportError::Request(detail) => RequestError::Transport(detail),
        })
    }
}

fn authorize(request: HttpRequest, auth: Option<&BasicAuth>, headers: Option<&HeaderMap>) -> HttpRequest {
    match auth {
        Some(auth) => request.with_basic_auth(Some(auth)),
        None => request.with_headers(headers),
    }
}

fn check_status(response: HttpResponse) -> Result<HttpResponse, RequestError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(RequestError::http(response.status, &response.url, &response.body))
    }
}

/// Authenticated writes report 401/403 with fixed messages.
fn check_write_status(response: HttpResponse) -> Result<HttpResponse, RequestError> {
    match response.status {
        StatusCode::UNAUTHORIZED => Err(RequestError::Unauthorized),
        StatusCode::FORBIDDEN => Err(RequestError::Forbidden),
        _ => check_status(response),
    }
}

/// An empty 2xx body decodes to `null`; anything else must be JSON.
fn decode_json(response: HttpResponse) -> Result<Value, RequestError> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&response.body)
        .map_err(|e| RequestError::Unexpected(format!("Failed to parse JSON response: {}", e)))
}
