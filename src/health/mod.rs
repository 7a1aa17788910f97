//! Backend health probing.
//!
//! # Data Flow
//! ```text
//! GET /health or startup readiness wait
//!     → probe.rs (independent GET against the backend's tags route)
//!     → healthy / unhealthy with reason
//! ```
//!
//! # Design Decisions
//! - The probe never touches relay or failover state
//! - Any non-200 answer is unhealthy

pub mod probe;

pub use probe::{HealthError, HealthProbe};
