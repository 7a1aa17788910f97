//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_sessions_total` (counter): finished TCP sessions by outcome
//! - `relay_sessions_active` (gauge): sessions currently relaying
//! - `relay_bytes_total` (counter): bytes copied, by direction
//! - `relay_accept_errors_total` (counter): failed accepts
//! - `gateway_upstream_attempts_total` (counter): attempts by endpoint, outcome
//! - `gateway_requests_total` (counter): gateway requests by outcome
//! - `gateway_stream_chunks_total` (counter): chunks relayed to callers
//! - `gateway_stream_errors_total` (counter): upstream bodies that failed mid-stream
//! - `gateway_upstream_handles_active` (gauge): open upstream responses

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::fmt;
use std::net::SocketAddr;

/// Direction of a Byte Relay within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToUpstream,
    UpstreamToClient,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ClientToUpstream => "client_to_upstream",
            Direction::UpstreamToClient => "upstream_to_client",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Reporting capability handed to every relay component.
///
/// Holds no state of its own; with metrics disabled every method is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct Telemetry {
    metrics: bool,
}

impl Telemetry {
    pub fn new(metrics_enabled: bool) -> Self {
        Self {
            metrics: metrics_enabled,
        }
    }

    /// Telemetry that records nothing.
    pub fn disabled() -> Self {
        Self { metrics: false }
    }

    pub fn session_opened(&self) {
        if self.metrics {
            gauge!("relay_sessions_active").increment(1.0);
        }
    }

    pub fn session_closed(&self, outcome: &'static str) {
        if self.metrics {
            gauge!("relay_sessions_active").decrement(1.0);
            counter!("relay_sessions_total", "outcome" => outcome).increment(1);
        }
    }

    pub fn session_rejected(&self) {
        if self.metrics {
            counter!("relay_sessions_total", "outcome" => "dial_failed").increment(1);
        }
    }

    pub fn bytes_relayed(&self, direction: Direction, bytes: usize) {
        if self.metrics {
            counter!("relay_bytes_total", "direction" => direction.as_str()).increment(bytes as u64);
        }
    }

    pub fn accept_error(&self) {
        if self.metrics {
            counter!("relay_accept_errors_total").increment(1);
        }
    }

    pub fn upstream_attempt(&self, endpoint: &str, outcome: &'static str) {
        if self.metrics {
            counter!(
                "gateway_upstream_attempts_total",
                "endpoint" => endpoint.to_string(),
                "outcome" => outcome
            )
            .increment(1);
        }
    }

    pub fn request_finished(&self, outcome: &'static str) {
        if self.metrics {
            counter!("gateway_requests_total", "outcome" => outcome).increment(1);
        }
    }

    pub fn stream_chunk(&self) {
        if self.metrics {
            counter!("gateway_stream_chunks_total").increment(1);
        }
    }

    pub fn stream_error(&self) {
        if self.metrics {
            counter!("gateway_stream_errors_total").increment(1);
        }
    }

    pub fn handle_acquired(&self) {
        if self.metrics {
            gauge!("gateway_upstream_handles_active").increment(1.0);
        }
    }

    pub fn handle_released(&self) {
        if self.metrics {
            gauge!("gateway_upstream_handles_active").decrement(1.0);
        }
    }
}
