//! Ollama Relay (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!   TCP client ──▶ net::Acceptor ──▶ ForwardSession ──relay×2──▶ fixed upstream
//!
//!   HTTP caller ──▶ http::GatewayServer ──▶ FailoverSelector ──▶ endpoint 1..N
//!        ◀────────── StreamedReply ◀──────── first endpoint answering 200
//!
//!   Cross-cutting: config, observability, resilience, lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use ollama_relay::config::load_config;
use ollama_relay::health::HealthProbe;
use ollama_relay::http::{Gateway, GatewayServer};
use ollama_relay::lifecycle::{shutdown_signal, wait_for_backend, Shutdown};
use ollama_relay::net::Acceptor;
use ollama_relay::observability::{init_logging, init_metrics, Telemetry};

#[derive(Parser)]
#[command(name = "ollama-relay")]
#[command(about = "TCP relay and streaming failover gateway for Ollama", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run only the raw TCP relay.
    #[arg(long, conflicts_with = "gateway_only")]
    tcp_only: bool,

    /// Run only the HTTP gateway.
    #[arg(long)]
    gateway_only: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if cli.tcp_only {
        config.gateway.enabled = false;
    }
    if cli.gateway_only {
        config.tcp.enabled = false;
    }

    init_logging(&config.observability);
    tracing::info!("ollama-relay v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }
    let telemetry = Telemetry::new(config.observability.metrics_enabled);

    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();
    let mut tracker = None;

    if config.tcp.enabled {
        let acceptor = Acceptor::bind(&config.tcp, &config.timeouts, telemetry).await?;
        tracker = Some(acceptor.tracker());
        tasks.push(tokio::spawn(acceptor.run(shutdown.subscribe())));
    }

    if config.gateway.enabled {
        let health = HealthProbe::new(&config.health)?;
        if config.startup.wait_for_backend {
            wait_for_backend(&health, &config.startup).await?;
        }

        let gateway = Gateway::from_config(&config, telemetry)?;
        let listener = TcpListener::bind(&config.gateway.bind_address).await?;
        tracing::info!(
            address = %config.gateway.bind_address,
            endpoints = config.gateway.endpoints.len(),
            "HTTP gateway bound"
        );

        let server = GatewayServer::new(&config, gateway, health, telemetry);
        let receiver = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = server.run(listener, receiver).await {
                tracing::error!(error = %e, "HTTP gateway failed");
            }
        }));
    }

    if tasks.is_empty() {
        tracing::warn!("Both the TCP relay and the HTTP gateway are disabled");
        return Ok(());
    }

    shutdown_signal().await;
    tracing::info!("Shutting down");
    shutdown.trigger();

    // The gateway waits for open streams; do not let one pin the process.
    let grace = config.timeouts.shutdown_grace();
    for task in tasks {
        if tokio::time::timeout(grace, task).await.is_err() {
            tracing::warn!(grace_secs = grace.as_secs(), "Listener did not stop within grace period");
        }
    }

    if let Some(tracker) = tracker {
        if !tracker.wait_for_drain(grace).await {
            tracing::warn!(
                active_sessions = tracker.active_count(),
                grace_secs = grace.as_secs(),
                "Sessions still open after grace period"
            );
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
