//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, endpoint URLs and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::failover::Endpoint;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: expected host:port, got {value:?}")]
    InvalidHostPort { field: &'static str, value: String },

    #[error("gateway.endpoints: at least one endpoint is required")]
    NoEndpoints,

    #[error("gateway.endpoints[{index}]: {reason}")]
    InvalidEndpoint { index: usize, reason: String },

    #[error("health.url: {0}")]
    InvalidHealthUrl(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.tcp.enabled {
        check_socket_addr(&mut errors, "tcp.bind_address", &config.tcp.bind_address);
        check_host_port(&mut errors, "tcp.upstream_address", &config.tcp.upstream_address);
    }
    check_positive(&mut errors, "tcp.chunk_size", config.tcp.chunk_size as u64);
    check_positive(&mut errors, "tcp.max_connections", config.tcp.max_connections as u64);

    if config.gateway.enabled {
        check_socket_addr(&mut errors, "gateway.bind_address", &config.gateway.bind_address);
        if config.gateway.endpoints.is_empty() {
            errors.push(ValidationError::NoEndpoints);
        }
    }
    for (index, endpoint) in config.gateway.endpoints.iter().enumerate() {
        if let Err(e) = Endpoint::from_config(endpoint) {
            errors.push(ValidationError::InvalidEndpoint {
                index,
                reason: e.to_string(),
            });
        }
    }
    check_positive(&mut errors, "gateway.chunk_size", config.gateway.chunk_size as u64);

    check_positive(&mut errors, "retries.max_attempts", u64::from(config.retries.max_attempts));
    check_positive(&mut errors, "timeouts.connect_secs", config.timeouts.connect_secs);
    check_positive(&mut errors, "timeouts.response_secs", config.timeouts.response_secs);

    if let Err(e) = url::Url::parse(&config.health.url) {
        errors.push(ValidationError::InvalidHealthUrl(e.to_string()));
    }
    check_positive(&mut errors, "health.timeout_secs", config.health.timeout_secs);

    if config.startup.wait_for_backend {
        check_positive(&mut errors, "startup.max_attempts", u64::from(config.startup.max_attempts));
    }

    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

// Host names are allowed here, so only the shape is checked; resolution
// happens when a session dials.
fn check_host_port(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let valid = value
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
    if !valid {
        errors.push(ValidationError::InvalidHostPort {
            field,
            value: value.to_string(),
        });
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero { field });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&RelayConfig::default()), Ok(()));
    }

    #[test]
    fn gateway_without_endpoints_is_rejected() {
        let mut config = RelayConfig::default();
        config.gateway.endpoints.clear();
        assert_eq!(validate_config(&config), Err(vec![ValidationError::NoEndpoints]));

        config.gateway.enabled = false;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn bad_addresses_are_collected() {
        let mut config = RelayConfig::default();
        config.tcp.bind_address = "not-an-address".into();
        config.tcp.upstream_address = "localhost".into();
        config.gateway.endpoints.push(EndpointConfig {
            scheme: "http".into(),
            host: "".into(),
            port: 80,
            path: "/".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], ValidationError::InvalidAddress { field: "tcp.bind_address", .. }));
        assert!(matches!(errors[1], ValidationError::InvalidHostPort { .. }));
        assert!(matches!(errors[2], ValidationError::InvalidEndpoint { index: 3, .. }));
    }

    #[test]
    fn upstream_may_be_a_host_name() {
        let mut config = RelayConfig::default();
        config.tcp.upstream_address = "ollama.internal:11434".into();
        assert_eq!(validate_config(&config), Ok(()));
    }
}
