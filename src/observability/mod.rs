//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay components hold a `Telemetry` value and report through it:
//!     → logging.rs (subscriber setup for structured tracing events)
//!     → metrics.rs (counters and gauges behind the `metrics` facade)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - `Telemetry` is stateless and `Copy`; components receive it, never look it up
//! - Metrics are cheap when no recorder is installed
//! - Request ID flows through the gateway for correlation

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::{init_metrics, Direction, Telemetry};
