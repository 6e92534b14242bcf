//! The seam between the request client and the network.

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqwest::{Client, Method, StatusCode, header::HeaderMap};
use serde_json::Value;
use std::sync::Arc;

use crate::auth::BasicAuth;
use crate::config::ClientConfig;

use super::params::Params;

/// Body attached to an outbound request.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// Everything needed to issue one HTTP call. Built fresh per call.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub basic_auth: Option<BasicAuth>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            basic_auth: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn with_params(mut self, params: &Params) -> Self {
        self.query.extend(params.to_query());
        self
    }

    pub fn with_headers(mut self, headers: Option<&HeaderMap>) -> Self {
        if let Some(headers) = headers {
            self.headers.extend(headers.clone());
        }
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn with_form(mut self, form: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(form);
        self
    }

    pub fn with_basic_auth(mut self, auth: Option<&BasicAuth>) -> Self {
        self.basic_auth = auth.cloned();
        self
    }
}

/// A buffered response. Any status is returned as-is; classification is the caller's job.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub url: String,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Failure below the HTTP layer.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    Timeout,
    Request(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Timeout => f.write_str("operation timed out"),
            TransportError::Request(detail) => f.write_str(detail),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(error.to_string())
        }
    }
}

/// Executes a single HTTP request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request).await
    }
}

/// [`Transport`] backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the underlying client with the configured timeout and user agent.
    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Form(form) => builder.form(&form),
        };

        if let Some(auth) = request.basic_auth {
            builder = builder.basic_auth(auth.username, Some(auth.password));
        }

        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        let body = response.bytes().await?;

        Ok(HttpResponse { status, url, body })
    }
}
