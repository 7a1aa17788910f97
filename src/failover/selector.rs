//! Endpoint Failover Selector.
//!
//! Walks the candidate list strictly in order and hands back the first
//! endpoint that answers 200. Each endpoint gets its own retry budget; a
//! response that is not used is dropped, which closes it.

use std::sync::Arc;

use crate::failover::endpoint::Endpoint;
use crate::failover::state::{FailoverError, Failure, Next, Selection};
use crate::failover::upstream::{RequestEnvelope, Upstream, UpstreamResponse};
use crate::observability::Telemetry;
use crate::resilience::RetryPolicy;

/// The endpoint that won and its still-unread response.
#[derive(Debug)]
pub struct Selected {
    pub endpoint_index: usize,
    pub endpoint: Endpoint,
    pub response: UpstreamResponse,
}

pub struct FailoverSelector {
    endpoints: Arc<[Endpoint]>,
    policy: RetryPolicy,
    upstream: Arc<dyn Upstream>,
    telemetry: Telemetry,
}

impl FailoverSelector {
    pub fn new(
        endpoints: Vec<Endpoint>,
        policy: RetryPolicy,
        upstream: Arc<dyn Upstream>,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            endpoints: endpoints.into(),
            policy,
            upstream,
            telemetry,
        }
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Find a live endpoint for `envelope`.
    pub async fn select(&self, envelope: &RequestEnvelope) -> Result<Selected, FailoverError> {
        let mut selection = Selection::new(self.endpoints.len(), self.policy.clone());
        let mut next = selection.start();

        loop {
            let (index, attempt, delay) = match next {
                Next::Attempt {
                    endpoint,
                    attempt,
                    delay,
                } => (endpoint, attempt, delay),
                Next::Exhausted(error) => {
                    tracing::error!(error = %error, "All backend endpoints failed");
                    return Err(error);
                }
            };

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let endpoint = &self.endpoints[index];
            tracing::info!(endpoint = %endpoint, attempt, "Trying backend endpoint");

            let failure = match self.upstream.post(endpoint, envelope).await {
                Ok(response) if response.status == 200 => {
                    self.telemetry.upstream_attempt(endpoint.url().as_str(), "success");
                    selection.succeeded();
                    tracing::info!(endpoint = %endpoint, attempt, "Connected to backend endpoint");
                    return Ok(Selected {
                        endpoint_index: index,
                        endpoint: endpoint.clone(),
                        response,
                    });
                }
                Ok(response) => {
                    let reason = format!("Status code {} from {}", response.status, endpoint);
                    if self.policy.is_retryable_status(response.status) {
                        Failure::Retryable(reason)
                    } else {
                        Failure::Rejected(reason)
                    }
                }
                Err(e) if e.is_retryable() => Failure::Retryable(e.to_string()),
                Err(e) => Failure::Unreachable(e.to_string()),
            };

            self.telemetry.upstream_attempt(endpoint.url().as_str(), outcome_label(&failure));
            tracing::warn!(endpoint = %endpoint, attempt, error = failure.reason(), "Backend attempt failed");
            next = selection.failed(failure);
        }
    }
}

fn outcome_label(failure: &Failure) -> &'static str {
    match failure {
        Failure::Retryable(_) => "retryable",
        Failure::Unreachable(_) => "unreachable",
        Failure::Rejected(_) => "rejected",
    }
}
