//! Failover state machine, free of I/O.
//!
//! # States
//! ```text
//! SELECTING ── endpoint answered 200 ──────────────▶ STREAMING ──▶ DONE
//!     │
//!     ├── retryable failure, budget left ──▶ SELECTING (same endpoint, after backoff)
//!     ├── failure, more candidates ───────▶ SELECTING (next endpoint)
//!     └── failure, list exhausted ────────▶ FAILED
//! ```
//!
//! `Selection` owns the SELECTING → STREAMING | FAILED part. The STREAMING →
//! DONE edge belongs to the body relay, which holds the response handle.

use std::time::Duration;
use thiserror::Error;

use crate::resilience::RetryPolicy;

/// Phase of one forwarded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// About to make (or making) attempt `attempt` (1-based) on `endpoint`.
    Selecting { endpoint: usize, attempt: u32 },
    Streaming { endpoint: usize },
    Done,
    Failed,
}

/// Terminal selection failure, reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailoverError {
    #[error("No backend endpoints configured")]
    NoEndpoints,

    #[error("Failed to connect to backend. Last error: {last_error}")]
    Exhausted { attempted: usize, last_error: String },
}

/// How an attempt failed, as far as the state machine cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Transient status, timeout, or broken exchange. Retried on the same endpoint.
    Retryable(String),
    /// Connection refused. Advance without retrying.
    Unreachable(String),
    /// Non-retryable status. Advance without retrying.
    Rejected(String),
}

impl Failure {
    pub fn reason(&self) -> &str {
        match self {
            Failure::Retryable(reason) | Failure::Unreachable(reason) | Failure::Rejected(reason) => {
                reason
            }
        }
    }
}

/// What the driver must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    Attempt {
        endpoint: usize,
        attempt: u32,
        delay: Duration,
    },
    Exhausted(FailoverError),
}

/// Ordered, first-success-wins selection over `endpoint_count` candidates.
#[derive(Debug, Clone)]
pub struct Selection {
    endpoint_count: usize,
    policy: RetryPolicy,
    phase: Phase,
    last_error: Option<String>,
}

impl Selection {
    pub fn new(endpoint_count: usize, policy: RetryPolicy) -> Self {
        let phase = if endpoint_count == 0 {
            Phase::Failed
        } else {
            Phase::Selecting {
                endpoint: 0,
                attempt: 1,
            }
        };
        Self {
            endpoint_count,
            policy,
            phase,
            last_error: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The first action.
    pub fn start(&self) -> Next {
        match self.phase {
            Phase::Selecting { endpoint, attempt } => Next::Attempt {
                endpoint,
                attempt,
                delay: Duration::ZERO,
            },
            _ => Next::Exhausted(self.error()),
        }
    }

    /// The current attempt returned 200. Returns the winning endpoint index.
    ///
    /// Outside SELECTING this changes nothing and returns `None`.
    pub fn succeeded(&mut self) -> Option<usize> {
        match self.phase {
            Phase::Selecting { endpoint, .. } => {
                self.phase = Phase::Streaming { endpoint };
                Some(endpoint)
            }
            _ => None,
        }
    }

    /// The current attempt failed.
    pub fn failed(&mut self, failure: Failure) -> Next {
        let Phase::Selecting { endpoint, attempt } = self.phase else {
            return Next::Exhausted(self.error());
        };
        self.last_error = Some(failure.reason().to_string());

        if matches!(failure, Failure::Retryable(_)) && self.policy.allows_retry_after(attempt) {
            let attempt = attempt + 1;
            self.phase = Phase::Selecting { endpoint, attempt };
            return Next::Attempt {
                endpoint,
                attempt,
                delay: self.policy.delay_before(attempt),
            };
        }

        let endpoint = endpoint + 1;
        if endpoint < self.endpoint_count {
            self.phase = Phase::Selecting {
                endpoint,
                attempt: 1,
            };
            Next::Attempt {
                endpoint,
                attempt: 1,
                delay: Duration::ZERO,
            }
        } else {
            self.phase = Phase::Failed;
            Next::Exhausted(self.error())
        }
    }

    fn error(&self) -> FailoverError {
        match &self.last_error {
            None if self.endpoint_count == 0 => FailoverError::NoEndpoints,
            last_error => FailoverError::Exhausted {
                attempted: self.endpoint_count,
                last_error: last_error.clone().unwrap_or_default(),
            },
        }
    }
}
