//! HTTP gateway setup.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, CORS, body limit)
//! - Validate inbound payloads before the core sees them
//! - Run failover and stream the chosen upstream back
//! - Serve until the shutdown signal

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::failover::{
    Endpoint, EndpointError, FailoverError, FailoverSelector, HttpUpstream, RequestEnvelope,
    Upstream,
};
use crate::health::HealthProbe;
use crate::http::request::{parse_envelope, request_id, UuidRequestId};
use crate::http::response::{error_response, HealthBody, MISSING_FIELDS};
use crate::http::stream::StreamedReply;
use crate::observability::Telemetry;
use crate::resilience::RetryPolicy;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// The forwarding core behind `POST /api/generate`.
pub struct Gateway {
    selector: FailoverSelector,
    chunk_size: usize,
    telemetry: Telemetry,
}

impl Gateway {
    pub fn new(selector: FailoverSelector, chunk_size: usize, telemetry: Telemetry) -> Self {
        Self {
            selector,
            chunk_size,
            telemetry,
        }
    }

    /// Build the gateway with a reqwest upstream from configuration.
    pub fn from_config(config: &RelayConfig, telemetry: Telemetry) -> Result<Self, GatewayError> {
        let upstream: Arc<dyn Upstream> = Arc::new(HttpUpstream::new(&config.timeouts)?);
        Self::with_upstream(config, upstream, telemetry)
    }

    /// Build the gateway over any `Upstream`.
    pub fn with_upstream(
        config: &RelayConfig,
        upstream: Arc<dyn Upstream>,
        telemetry: Telemetry,
    ) -> Result<Self, GatewayError> {
        let endpoints = Endpoint::list(&config.gateway.endpoints)?;
        let selector = FailoverSelector::new(
            endpoints,
            RetryPolicy::from(&config.retries),
            upstream,
            telemetry,
        );
        Ok(Self::new(selector, config.gateway.chunk_size, telemetry))
    }

    /// Forward one validated request: select an endpoint, then stream it back.
    pub async fn submit(&self, envelope: RequestEnvelope) -> Result<StreamedReply, FailoverError> {
        let selected = self.selector.select(&envelope).await?;
        Ok(StreamedReply::new(selected, self.chunk_size, self.telemetry))
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub health: Arc<HealthProbe>,
    pub telemetry: Telemetry,
}

/// HTTP server for the streaming gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    /// Create a new server around a prepared gateway.
    pub fn new(config: &RelayConfig, gateway: Gateway, health: HealthProbe, telemetry: Telemetry) -> Self {
        let state = AppState {
            gateway: Arc::new(gateway),
            health: Arc::new(health),
            telemetry,
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request),
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(RequestBodyLimitLayer::new(config.gateway.max_body_size))
            .layer(CorsLayer::permissive());

        // `max_body_size` is the only limit; axum's own 2 MiB default would cap it.
        Router::new()
            .route("/api/generate", post(generate_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(middleware)
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP gateway starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP gateway stopped");
        Ok(())
    }
}

/// `POST /api/generate`: validate, fail over, stream.
async fn generate_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let Some(envelope) = parse_envelope(&body) else {
        tracing::warn!("Rejected request without model and prompt");
        state.telemetry.request_finished("invalid");
        return error_response(StatusCode::BAD_REQUEST, MISSING_FIELDS);
    };

    tracing::info!(model = %envelope.model, "Received generate request");

    match state.gateway.submit(envelope).await {
        Ok(reply) => {
            state.telemetry.request_finished("streamed");
            reply.into_response()
        }
        Err(e) => {
            state.telemetry.request_finished("failed");
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

/// `GET /health`: independent probe of the backend.
async fn health_handler(State(state): State<AppState>) -> HealthBody {
    match state.health.check().await {
        Ok(()) => HealthBody::healthy(),
        Err(e) => {
            tracing::warn!(url = %state.health.url(), error = %e, "Health check failed");
            HealthBody::unhealthy(e.to_string())
        }
    }
}
