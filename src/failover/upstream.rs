//! The outbound HTTP seam: one POST to one endpoint.
//!
//! `Upstream` is a trait so the selector can be driven by scripted backends in
//! tests; `HttpUpstream` is the reqwest implementation used in production.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::TryStreamExt;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::config::TimeoutConfig;
use crate::failover::endpoint::Endpoint;
use crate::resilience::with_deadline;

/// The caller's payload, forwarded verbatim to whichever endpoint succeeds.
///
/// Both fields are opaque JSON: only their presence is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub model: Value,
    pub prompt: Value,
}

impl RequestEnvelope {
    pub fn new(model: impl Into<Value>, prompt: impl Into<Value>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
        }
    }
}

/// Lazy producer of upstream body chunks.
pub type UpstreamBody = BoxStream<'static, Result<Bytes, io::Error>>;

/// An upstream response whose body has not been read yet.
///
/// Dropping it releases the underlying connection.
pub struct UpstreamResponse {
    pub status: u16,
    /// Passed on to the caller byte for byte.
    pub content_type: Option<HeaderValue>,
    pub body: UpstreamBody,
}

impl fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Why a single attempt produced no response at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// Nothing accepted the connection. Retrying the same address is pointless.
    #[error("Error connecting to {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// Connected, but the exchange broke before a response arrived.
    #[error("Error connecting to {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("Timed out waiting for {url} after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
}

impl AttemptError {
    /// Whether the same endpoint may be tried again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AttemptError::Unreachable { .. })
    }
}

#[async_trait]
pub trait Upstream: Send + Sync {
    /// POST `envelope` as JSON to `endpoint` and return once headers arrive.
    ///
    /// Any status is returned as a response; only transport failures are errors.
    async fn post(
        &self,
        endpoint: &Endpoint,
        envelope: &RequestEnvelope,
    ) -> Result<UpstreamResponse, AttemptError>;
}

/// `Upstream` over a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    response_timeout: Duration,
}

impl HttpUpstream {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect())
            .no_proxy()
            .build()?;
        Ok(Self {
            client,
            response_timeout: timeouts.response(),
        })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn post(
        &self,
        endpoint: &Endpoint,
        envelope: &RequestEnvelope,
    ) -> Result<UpstreamResponse, AttemptError> {
        let url = endpoint.to_string();
        let request = self
            .client
            .post(endpoint.url().clone())
            .header(CONTENT_TYPE, "application/json")
            .json(envelope);

        let response = match with_deadline(self.response_timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_connect() => {
                return Err(AttemptError::Unreachable {
                    url,
                    reason: error_chain(&e),
                })
            }
            Ok(Err(e)) if e.is_timeout() => {
                return Err(AttemptError::Timeout {
                    url,
                    timeout: self.response_timeout,
                })
            }
            Ok(Err(e)) => {
                return Err(AttemptError::Transport {
                    url,
                    reason: error_chain(&e),
                })
            }
            Err(elapsed) => {
                return Err(AttemptError::Timeout {
                    url,
                    timeout: elapsed.0,
                })
            }
        };

        let content_type = response.headers().get(CONTENT_TYPE).cloned();

        Ok(UpstreamResponse {
            status: response.status().as_u16(),
            content_type,
            body: Box::pin(response.bytes_stream().map_err(io::Error::other)),
        })
    }
}

/// Render an error with its sources, e.g. "error sending request: connection refused".
fn error_chain(e: &dyn StdError) -> String {
    let mut rendered = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] io::Error);

    #[test]
    fn error_chain_includes_sources() {
        let e = Outer(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"));
        assert_eq!(error_chain(&e), "outer: connection refused");
    }

    #[test]
    fn envelope_serializes_model_and_prompt() {
        let envelope = RequestEnvelope::new("llama3", "why is the sky blue?");
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "model": "llama3", "prompt": "why is the sky blue?" })
        );
    }

    #[test]
    fn envelope_keeps_non_string_values() {
        let envelope = RequestEnvelope::new("llama3", serde_json::json!(["a", "b"]));
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"model":"llama3","prompt":["a","b"]}"#);
    }

    #[test]
    fn unreachable_is_not_retried() {
        let unreachable = AttemptError::Unreachable {
            url: "http://a".into(),
            reason: "refused".into(),
        };
        let reset = AttemptError::Transport {
            url: "http://a".into(),
            reason: "reset".into(),
        };
        assert!(!unreachable.is_retryable());
        assert!(reset.is_retryable());
    }
}
