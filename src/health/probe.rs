//! Single-shot health probe against the backend.

use std::time::Duration;
use thiserror::Error;

use crate::config::HealthCheckConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HealthError {
    #[error("Backend returned status code {0}")]
    Status(u16),

    #[error("{0}")]
    Request(String),
}

/// Probes `url` with GET under a timeout.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: reqwest::Client,
    url: String,
}

impl HealthProbe {
    pub fn new(config: &HealthCheckConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .no_proxy()
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn check(&self) -> Result<(), HealthError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| HealthError::Request(e.to_string()))?;

        match response.status().as_u16() {
            200 => Ok(()),
            status => Err(HealthError::Status(status)),
        }
    }
}
