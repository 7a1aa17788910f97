//! Endpoint failover subsystem.
//!
//! # Data Flow
//! ```text
//! RequestEnvelope
//!     → selector.rs (walk candidates in order)
//!         → upstream.rs (POST to one endpoint, bounded by timeouts)
//!         → state.rs (retry same endpoint / advance / fail)
//!     → Selected { endpoint, response } handed to the stream relay
//! ```
//!
//! # Design Decisions
//! - Ordered failover, first success wins; never best-of
//! - Retry budget is per endpoint and bounded
//! - The state machine is pure so budgets are testable without sockets

pub mod endpoint;
pub mod selector;
pub mod state;
pub mod upstream;

pub use endpoint::{Endpoint, EndpointError};
pub use selector::{FailoverSelector, Selected};
pub use state::{FailoverError, Failure, Next, Phase, Selection};
pub use upstream::{AttemptError, HttpUpstream, RequestEnvelope, Upstream, UpstreamBody, UpstreamResponse};
