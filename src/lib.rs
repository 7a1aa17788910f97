//! Ollama Relay Library
//!
//! Two front doors to one Ollama backend: a protocol-agnostic TCP byte relay
//! and an HTTP gateway that fails over across candidate endpoints and streams
//! the chosen response back.

pub mod config;
pub mod failover;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::RelayConfig;
pub use failover::{FailoverSelector, RequestEnvelope};
pub use http::{Gateway, GatewayServer};
pub use lifecycle::Shutdown;
pub use net::Acceptor;
