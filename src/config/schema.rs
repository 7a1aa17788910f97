//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Raw TCP relay (listener and fixed upstream).
    pub tcp: TcpRelayConfig,

    /// HTTP streaming gateway and its candidate endpoints.
    pub gateway: GatewayConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration applied per candidate endpoint.
    pub retries: RetryConfig,

    /// Backend health probe settings.
    pub health: HealthCheckConfig,

    /// Readiness wait performed before serving.
    pub startup: StartupConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Raw TCP relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TcpRelayConfig {
    /// Run the TCP relay.
    pub enabled: bool,

    /// Listen address (e.g., "0.0.0.0:11435").
    pub bind_address: String,

    /// The single upstream every session dials (e.g., "localhost:11434").
    pub upstream_address: String,

    /// Read size of each Byte Relay iteration.
    pub chunk_size: usize,

    /// Maximum concurrent sessions (backpressure on accept).
    pub max_connections: usize,
}

impl Default for TcpRelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:11435".to_string(),
            upstream_address: "localhost:11434".to_string(),
            chunk_size: 4096,
            max_connections: 10_000,
        }
    }
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Run the HTTP gateway.
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:5001").
    pub bind_address: String,

    /// Candidate endpoints, tried strictly in this order.
    pub endpoints: Vec<EndpointConfig>,

    /// Maximum size of each chunk relayed to the caller.
    pub chunk_size: usize,

    /// Maximum inbound request body in bytes.
    pub max_body_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:5001".to_string(),
            endpoints: ["localhost", "127.0.0.1", "0.0.0.0"]
                .into_iter()
                .map(EndpointConfig::generate_on)
                .collect(),
            chunk_size: 8192,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// One candidate backend address.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct EndpointConfig {
    /// URL scheme, "http" unless stated.
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Host name or IP literal.
    pub host: String,

    /// TCP port.
    #[serde(default = "default_backend_port")]
    pub port: u16,

    /// Request path on the backend.
    #[serde(default = "default_generate_path")]
    pub path: String,
}

impl EndpointConfig {
    /// The default generate route of a backend on `host`.
    pub fn generate_on(host: &str) -> Self {
        Self {
            scheme: default_scheme(),
            host: host.to_string(),
            port: default_backend_port(),
            path: default_generate_path(),
        }
    }
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_backend_port() -> u16 {
    11434
}

fn default_generate_path() -> String {
    "/api/generate".to_string()
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for an endpoint to produce response headers, in seconds.
    pub response_secs: u64,

    /// How long shutdown waits for in-flight sessions to drain, in seconds.
    pub shutdown_grace_secs: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn response(&self) -> Duration {
        Duration::from_secs(self.response_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 30,
            response_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per endpoint, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Add up to 10% random jitter to each delay.
    pub jitter: bool,

    /// Upstream status codes that are retried against the same endpoint.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8000,
            jitter: false,
            retryable_statuses: vec![500, 502, 503, 504],
        }
    }
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// URL probed with GET.
    pub url: String,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434/api/tags".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Startup readiness configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Poll the backend until it answers before serving the gateway.
    pub wait_for_backend: bool,

    /// Number of probes before giving up.
    pub max_attempts: u32,

    /// Seconds between probes.
    pub interval_secs: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            wait_for_backend: true,
            max_attempts: 30,
            interval_secs: 2,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human readable or JSON lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
