//! Candidate endpoints.

use std::fmt;
use thiserror::Error;
use url::Url;

use crate::config::EndpointConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("unsupported scheme {0:?}")]
    Scheme(String),

    #[error("invalid URL {url:?}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// One candidate backend address. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    pub fn from_config(config: &EndpointConfig) -> Result<Self, EndpointError> {
        let scheme = config.scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(EndpointError::Scheme(config.scheme.clone()));
        }

        // IPv6 literals need brackets inside an authority.
        let host = if config.host.contains(':') && !config.host.starts_with('[') {
            format!("[{}]", config.host)
        } else {
            config.host.clone()
        };
        let path = if config.path.starts_with('/') {
            config.path.clone()
        } else {
            format!("/{}", config.path)
        };

        let raw = format!("{scheme}://{host}:{}{path}", config.port);
        let url = Url::parse(&raw).map_err(|source| EndpointError::Url { url: raw, source })?;
        Ok(Self { url })
    }

    /// Build every endpoint of a candidate list, preserving order.
    pub fn list(configs: &[EndpointConfig]) -> Result<Vec<Self>, EndpointError> {
        configs.iter().map(Self::from_config).collect()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}
