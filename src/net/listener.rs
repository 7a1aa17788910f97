//! Connection Acceptor for the raw TCP relay.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections, one Forward Session each
//! - Enforce max_connections limit via semaphore
//! - Survive accept errors; stop only on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};

use crate::config::{TcpRelayConfig, TimeoutConfig};
use crate::net::connection::SessionTracker;
use crate::net::session::{ForwardSession, SessionSettings};
use crate::observability::Telemetry;

/// Pause after a failed accept, so fd exhaustion does not spin the loop.
const ACCEPT_ERROR_PAUSE: Duration = Duration::from_millis(50);

/// Error type for acceptor setup.
#[derive(Debug, Error)]
pub enum AcceptorError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Listens for clients and spawns a Forward Session per connection.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections wait in the backlog until a session finishes.
pub struct Acceptor {
    listener: TcpListener,
    settings: Arc<SessionSettings>,
    connection_limit: Arc<Semaphore>,
    tracker: SessionTracker,
    telemetry: Telemetry,
}

impl Acceptor {
    /// Bind to the configured address with connection limits.
    pub async fn bind(
        config: &TcpRelayConfig,
        timeouts: &TimeoutConfig,
        telemetry: Telemetry,
    ) -> Result<Self, AcceptorError> {
        let listener = TcpListener::bind(&config.bind_address)
            .await
            .map_err(|source| AcceptorError::Bind {
                address: config.bind_address.clone(),
                source,
            })?;

        let acceptor = Self::from_listener(
            listener,
            SessionSettings::from_config(config, timeouts),
            config.max_connections,
            telemetry,
        );

        tracing::info!(
            address = %config.bind_address,
            upstream = %config.upstream_address,
            max_connections = config.max_connections,
            "TCP relay bound"
        );
        Ok(acceptor)
    }

    /// Wrap an already bound listener.
    pub fn from_listener(
        listener: TcpListener,
        settings: SessionSettings,
        max_connections: usize,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            listener,
            settings: Arc::new(settings),
            connection_limit: Arc::new(Semaphore::new(max_connections.max(1))),
            tracker: SessionTracker::new(),
            telemetry,
        }
    }

    /// Get the local address this acceptor is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Handle for observing live sessions, e.g. to drain on shutdown.
    pub fn tracker(&self) -> SessionTracker {
        self.tracker.clone()
    }

    /// Accept until `shutdown` fires, then close the listening socket.
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            // Acquire permit first (backpressure)
            let permit = tokio::select! {
                permit = self.connection_limit.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown.recv() => break,
            };

            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                _ = shutdown.recv() => break,
            };

            let (stream, peer_addr) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    self.telemetry.accept_error();
                    tokio::time::sleep(ACCEPT_ERROR_PAUSE).await;
                    continue;
                }
            };

            let guard = self.tracker.track();
            tracing::debug!(
                session_id = %guard.id(),
                peer_addr = %peer_addr,
                available_permits = self.connection_limit.available_permits(),
                "Connection accepted"
            );

            let settings = Arc::clone(&self.settings);
            let telemetry = self.telemetry;
            tokio::spawn(async move {
                let session = ForwardSession::new(guard.id(), stream, peer_addr);
                // Errors are logged by the session; nothing propagates past here.
                let _ = session.run(&settings, telemetry).await;
                drop(permit);
                drop(guard);
            });
        }

        let address = self.listener.local_addr().ok();
        drop(self.listener);
        tracing::info!(
            address = ?address,
            active_sessions = self.tracker.active_count(),
            "TCP relay stopped accepting"
        );
    }
}
