//! Remote service facades
//!
//! Thin clients for the backends Relay fronts. None of them contain business
//! logic: each call is one HTTP exchange run through [`resilience::Resilience`]
//! and classified into a [`RemoteResult`].
//!
//! - [`object_store`]: document CRUD, distinct-value and filter queries
//! - [`blob_store`]: raw byte nodes (archived import payloads, files)
//! - [`rules`]: rule-set evaluation
//! - [`indexer`]: search index writes and queries

pub mod blob_store;
pub mod indexer;
pub mod object_store;
pub mod resilience;
pub mod rules;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::config::{BackendEndpoint, ResilienceConfig};
use resilience::{CircuitState, Resilience};

pub use blob_store::{ArchivalReference, BlobStore, HttpBlobStore};
pub use indexer::{HttpIndexer, Indexer};
pub use object_store::{HttpObjectStore, ObjectStore};
pub use rules::{HttpRulesEngine, RulesEngine};

/// Longest remote error body kept in a `RemoteError::Status` detail
const MAX_DETAIL_CHARS: usize = 512;

/// Successful remote answer: the 2xx status plus the decoded body
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse<T> {
    pub status: u16,
    pub body: T,
}

impl<T> RemoteResponse<T> {
    pub fn new(status: u16, body: T) -> Self {
        Self { status, body }
    }

    pub fn ok(body: T) -> Self {
        Self::new(200, body)
    }

    pub fn created(body: T) -> Self {
        Self::new(201, body)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RemoteResponse<U> {
        RemoteResponse {
            status: self.status,
            body: f(self.body),
        }
    }
}

/// Every way a remote call can fail.
///
/// An open circuit breaker is one of the variants, so callers handle "the call
/// failed" in one place whatever the cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("{service} returned {status}: {detail}")]
    Status {
        service: String,
        status: u16,
        detail: String,
    },

    #[error("{service} is unavailable: circuit breaker is open")]
    CircuitOpen { service: String },

    #[error("{service} transport error: {message}")]
    Transport { service: String, message: String },

    #[error("{service} returned an unreadable response: {message}")]
    Decode { service: String, message: String },
}

impl RemoteError {
    /// Remote status code, when the backend answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn service(&self) -> &str {
        match self {
            RemoteError::Status { service, .. }
            | RemoteError::CircuitOpen { service }
            | RemoteError::Transport { service, .. }
            | RemoteError::Decode { service, .. } => service,
        }
    }

    /// Transport faults and 5xx are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Transport { .. } => true,
            RemoteError::Status { status, .. } => *status >= 500,
            RemoteError::CircuitOpen { .. } | RemoteError::Decode { .. } => false,
        }
    }

    /// Only backend-health failures count toward opening the breaker
    pub fn trips_breaker(&self) -> bool {
        match self {
            RemoteError::Transport { .. } => true,
            RemoteError::Status { status, .. } => *status >= 500,
            RemoteError::CircuitOpen { .. } | RemoteError::Decode { .. } => false,
        }
    }
}

pub type RemoteResult<T> = Result<RemoteResponse<T>, RemoteError>;

/// Shared HTTP plumbing for the facades: base URL, auth, timeout, resilience
#[derive(Debug, Clone)]
pub struct HttpBackend {
    service: String,
    client: Client,
    base_url: String,
    api_key: Option<String>,
    resilience: Arc<Resilience>,
}

impl HttpBackend {
    pub fn new(
        service: impl Into<String>,
        endpoint: &BackendEndpoint,
        resilience: &ResilienceConfig,
    ) -> anyhow::Result<Self> {
        let service = service.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(resilience.timeout_secs))
            .build()?;

        Ok(Self {
            resilience: Arc::new(Resilience::from_config(service.clone(), resilience)),
            service,
            client,
            base_url: endpoint.url.trim_end_matches('/').to_string(),
            api_key: endpoint.api_key.clone(),
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.resilience.breaker().state()
    }

    /// Join percent-encoded path segments onto the base URL
    pub fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    /// Run one exchange through the resilience policy and return the raw body.
    ///
    /// `build` is invoked once per attempt so retries resend the full request.
    pub async fn send<F>(&self, build: F) -> RemoteResult<Vec<u8>>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let build = &build;
        let client = &self.client;
        let api_key = self.api_key.as_deref();
        let service = self.service.as_str();

        self.resilience
            .call(move || async move {
                let mut request = build(client);
                if let Some(key) = api_key {
                    request = request.bearer_auth(key);
                }

                let response = request.send().await.map_err(|e| RemoteError::Transport {
                    service: service.to_string(),
                    message: e.to_string(),
                })?;

                let status = response.status();
                let body = response.bytes().await.map_err(|e| RemoteError::Transport {
                    service: service.to_string(),
                    message: e.to_string(),
                })?;

                if status.is_success() {
                    Ok(RemoteResponse::new(status.as_u16(), body.to_vec()))
                } else {
                    Err(RemoteError::Status {
                        service: service.to_string(),
                        status: status.as_u16(),
                        detail: error_detail(&body),
                    })
                }
            })
            .await
    }

    /// Like [`send`](Self::send), decoding the body as JSON (empty body -> `null`)
    pub async fn send_json<F>(&self, build: F) -> RemoteResult<Value>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = self.send(build).await?;
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(response.map(|_| Value::Null));
        }
        let value = serde_json::from_slice(&response.body).map_err(|e| self.decode_error(e))?;
        Ok(RemoteResponse::new(response.status, value))
    }

    /// Decode a JSON body into a typed value
    pub fn decode<T: DeserializeOwned>(&self, response: RemoteResponse<Value>) -> RemoteResult<T> {
        let status = response.status;
        let body = serde_json::from_value(response.body).map_err(|e| self.decode_error(e))?;
        Ok(RemoteResponse::new(status, body))
    }

    pub fn decode_error(&self, err: impl std::fmt::Display) -> RemoteError {
        RemoteError::Decode {
            service: self.service.clone(),
            message: err.to_string(),
        }
    }
}

/// Pull a readable message out of an error body
fn error_detail(body: &[u8]) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
        for key in ["message", "error", "detail"] {
            match map.get(key) {
                Some(Value::String(message)) => return truncate(message),
                Some(Value::Object(inner)) => {
                    if let Some(Value::String(message)) = inner.get("message") {
                        return truncate(message);
                    }
                },
                _ => {},
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        "no response body".to_string()
    } else {
        truncate(text)
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_DETAIL_CHARS {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(MAX_DETAIL_CHARS).collect();
        cut.push_str("...");
        cut
    }
}
