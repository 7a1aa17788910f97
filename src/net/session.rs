//! Forward Session: one accepted client proxied to the fixed upstream.
//!
//! # Lifecycle
//! ```text
//! accepted → dial upstream ─┬─ failure → close client, SessionError
//!                           └─ success → two Byte Relays (spawned)
//!                                        → both returned → finished
//! ```
//!
//! Each relay closes both connections when it stops, so the two always end
//! together. There is no stop flag between them.

use std::net::SocketAddr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpStream;

use crate::config::{TcpRelayConfig, TimeoutConfig};
use crate::net::connection::SessionId;
use crate::net::relay::{self, RelayOutcome};
use crate::observability::{Direction, Telemetry};
use crate::resilience::with_deadline;

/// Failure to establish a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to dial upstream {upstream}: {source}")]
    Dial {
        upstream: String,
        #[source]
        source: std::io::Error,
    },

    #[error("dialing upstream {upstream} timed out after {timeout:?}")]
    DialTimeout { upstream: String, timeout: Duration },
}

/// Immutable per-session settings, shared by every session of an acceptor.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub upstream_address: String,
    pub chunk_size: usize,
    pub connect_timeout: Duration,
}

impl SessionSettings {
    pub fn from_config(tcp: &TcpRelayConfig, timeouts: &TimeoutConfig) -> Self {
        Self {
            upstream_address: tcp.upstream_address.clone(),
            chunk_size: tcp.chunk_size,
            connect_timeout: timeouts.connect(),
        }
    }
}

/// Totals reported when a session finishes.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: SessionId,
    pub client_to_upstream: u64,
    pub upstream_to_client: u64,
    /// Both directions ended on EOF rather than an I/O error.
    pub clean: bool,
    pub duration: Duration,
}

/// A freshly accepted client connection awaiting its upstream.
#[derive(Debug)]
pub struct ForwardSession {
    id: SessionId,
    client: TcpStream,
    peer_addr: SocketAddr,
}

impl ForwardSession {
    pub fn new(id: SessionId, client: TcpStream, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            client,
            peer_addr,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Dial the upstream and relay until both directions have finished.
    pub async fn run(
        self,
        settings: &SessionSettings,
        telemetry: Telemetry,
    ) -> Result<SessionSummary, SessionError> {
        let started = Instant::now();
        let upstream = match dial(settings).await {
            Ok(stream) => stream,
            Err(e) => {
                relay::close(&self.client);
                telemetry.session_rejected();
                tracing::warn!(
                    session_id = %self.id,
                    peer_addr = %self.peer_addr,
                    error = %e,
                    "Session could not be established"
                );
                return Err(e);
            }
        };

        tracing::debug!(
            session_id = %self.id,
            peer_addr = %self.peer_addr,
            upstream = %settings.upstream_address,
            "Session established"
        );
        telemetry.session_opened();

        let (client_read, client_write) = self.client.into_split();
        let (upstream_read, upstream_write) = upstream.into_split();

        let outbound = tokio::spawn(relay::relay(
            client_read,
            upstream_write,
            Direction::ClientToUpstream,
            settings.chunk_size,
            telemetry,
        ));
        let inbound = tokio::spawn(relay::relay(
            upstream_read,
            client_write,
            Direction::UpstreamToClient,
            settings.chunk_size,
            telemetry,
        ));

        let (outbound, inbound) = tokio::join!(outbound, inbound);
        let outbound = settle(self.id, outbound);
        let inbound = settle(self.id, inbound);

        let summary = SessionSummary {
            id: self.id,
            client_to_upstream: outbound.as_ref().map_or(0, |o| o.bytes),
            upstream_to_client: inbound.as_ref().map_or(0, |o| o.bytes),
            clean: [&outbound, &inbound]
                .iter()
                .all(|o| o.as_ref().is_some_and(|o| o.end.is_eof())),
            duration: started.elapsed(),
        };

        telemetry.session_closed(if summary.clean { "completed" } else { "errored" });
        tracing::debug!(
            session_id = %summary.id,
            peer_addr = %self.peer_addr,
            client_to_upstream = summary.client_to_upstream,
            upstream_to_client = summary.upstream_to_client,
            duration_ms = summary.duration.as_millis() as u64,
            "Session finished"
        );

        Ok(summary)
    }
}

async fn dial(settings: &SessionSettings) -> Result<TcpStream, SessionError> {
    let upstream = &settings.upstream_address;
    match with_deadline(settings.connect_timeout, TcpStream::connect(upstream.as_str())).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(SessionError::Dial {
            upstream: upstream.clone(),
            source,
        }),
        Err(elapsed) => Err(SessionError::DialTimeout {
            upstream: upstream.clone(),
            timeout: elapsed.0,
        }),
    }
}

fn settle(
    id: SessionId,
    joined: Result<RelayOutcome, tokio::task::JoinError>,
) -> Option<RelayOutcome> {
    match joined {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            tracing::error!(session_id = %id, error = %e, "Relay task failed");
            None
        }
    }
}
