//! Timeout enforcement.
//!
//! Upstream attempts are bounded until response headers arrive. The streamed
//! body is not covered: a generation may legitimately run for minutes.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// The wrapped operation did not finish in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timed out after {0:?}")]
pub struct DeadlineExceeded(pub Duration);

/// Run `fut` with a deadline.
pub async fn with_deadline<F, T>(limit: Duration, fut: F) -> Result<T, DeadlineExceeded>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DeadlineExceeded(limit))
}
