//! One HTTP attempt, classified.
//!
//! A [`Transport`] performs exactly one try and reports it as an
//! [`AttemptOutcome`]; retrying is the executor's job. The reqwest-backed
//! [`ReqwestTransport`] owns the connection pool and bounds concurrent
//! connections with a semaphore.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_CHARSET};
use reqwest::Method;
use tokio::sync::Semaphore;

use crate::config::ClientConfig;
use crate::endpoint::Endpoint;
use crate::error::{ApiError, Result};
use crate::normalize::DocumentFormat;

/// Everything needed to perform one logical request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub endpoint: Endpoint,
    pub params: Vec<(String, String)>,
    pub headers: HeaderMap,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Requested (and declared) payload format.
    pub format: DocumentFormat,
}

impl HttpRequest {
    pub fn get(endpoint: Endpoint, format: DocumentFormat, timeout: Duration) -> Self {
        Self {
            method: Method::GET,
            endpoint,
            params: Vec::new(),
            headers: HeaderMap::new(),
            timeout,
            format,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn with_params(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.params.extend(params);
        self
    }

    /// Extra header. Rejected before any network call when not valid HTTP.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ApiError::validation("header name", name, "a valid HTTP header name"))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| ApiError::validation(name, value, "a valid HTTP header value"))?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn url(&self) -> String {
        self.endpoint.url()
    }
}

/// What kind of transport-level failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Refused, reset, unreachable host, DNS failure.
    Connect,
    Timeout,
    Other,
}

/// A transient failure: no definitive answer from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFault {
    pub kind: FaultKind,
    pub message: String,
}

impl TransportFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Connect, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Timeout, message)
    }
}

impl fmt::Display for TransportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FaultKind::Connect => "connection error",
            FaultKind::Timeout => "timeout",
            FaultKind::Other => "transport error",
        };
        write!(f, "{}: {}", kind, self.message)
    }
}

impl From<&reqwest::Error> for TransportFault {
    fn from(error: &reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            FaultKind::Timeout
        } else if error.is_connect() {
            FaultKind::Connect
        } else {
            FaultKind::Other
        };
        Self::new(kind, error_chain(error))
    }
}

/// Result of a single try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(String),
    TransientFailure(TransportFault),
    PermanentFailure { status: u16, body: String },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Performs a single HTTP attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> AttemptOutcome;

    fn name(&self) -> &str;
}

/// Transport over a pooled `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    connections: Arc<Semaphore>,
}

impl ReqwestTransport {
    /// Build the pool: keep-alive slots, user agent and charset from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT_CHARSET, HeaderValue::from_static("utf-8"));

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(default_headers)
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()
            .map_err(|e| ApiError::validation("client config", &e.to_string(), "a buildable HTTP client"))?;

        Ok(Self::with_client(client, config.max_connections))
    }

    /// Wrap an existing client, allowing at most `max_connections` in flight.
    pub fn with_client(client: reqwest::Client, max_connections: usize) -> Self {
        Self {
            client,
            connections: Arc::new(Semaphore::new(max_connections.max(1))),
        }
    }

    /// Connections that could be opened right now.
    pub fn available_connections(&self) -> usize {
        self.connections.available_permits()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> AttemptOutcome {
        let _permit = match self.connections.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                return AttemptOutcome::TransientFailure(TransportFault::new(
                    FaultKind::Other,
                    "connection pool closed",
                ))
            }
        };

        let response = self
            .client
            .request(request.method.clone(), request.url())
            .query(&request.params)
            .header(ACCEPT, request.format.mime())
            .headers(request.headers.clone())
            .timeout(request.timeout)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => return AttemptOutcome::TransientFailure(TransportFault::from(&e)),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return AttemptOutcome::TransientFailure(TransportFault::from(&e)),
        };

        if status.is_success() {
            AttemptOutcome::Success(body)
        } else {
            AttemptOutcome::PermanentFailure {
                status: status.as_u16(),
                body,
            }
        }
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
