//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt against a candidate endpoint:
//!     → timeouts.rs (bound connect and time-to-headers)
//!     → On failure: retries.rs (classify, decide whether to retry)
//!     → backoff.rs (delay before the next attempt on the same endpoint)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream attempt has a deadline
//! - Retries are bounded per endpoint; nothing retries forever
//! - Retry decisions are pure so they can be tested without I/O

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use backoff::calculate_backoff;
pub use retries::RetryPolicy;
pub use timeouts::{with_deadline, DeadlineExceeded};
