//! Shared utilities for integration and load testing.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use ollama_relay::config::{EndpointConfig, RelayConfig};
use ollama_relay::health::HealthProbe;
use ollama_relay::http::{Gateway, GatewayServer};
use ollama_relay::net::{Acceptor, SessionSettings, SessionTracker};
use ollama_relay::observability::Telemetry;

/// A loopback address nothing listens on.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Read one HTTP/1.1 request and return its body.
async fn read_request(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Some(String::from_utf8_lossy(&buf[header_end..]).into_owned())
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        504 => "504 Gateway Timeout",
        _ => "500 Internal Server Error",
    }
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the request body and returns the status and the body chunks,
/// which are written with a short pause between them.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, Vec<String>)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                let (status, chunks) = f(request).await;
                let length: usize = chunks.iter().map(String::len).sum();
                let head = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/x-ndjson\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status_text(status),
                    length
                );
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                for chunk in chunks {
                    if socket.write_all(chunk.as_bytes()).await.is_err() {
                        return;
                    }
                    let _ = socket.flush().await;
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a mock backend that always answers `status` with `body`.
pub async fn start_mock_backend(status: u16, body: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| async move { (status, vec![body.to_string()]) }).await
}

/// Start a raw TCP upstream that answers every `PING` with `PONG` until EOF.
pub async fn start_ping_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4];
                while socket.read_exact(&mut buf).await.is_ok() {
                    if &buf == b"PING" && socket.write_all(b"PONG").await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    addr
}

/// An endpoint entry pointing at a loopback mock backend.
pub fn endpoint_for(addr: SocketAddr) -> EndpointConfig {
    EndpointConfig {
        scheme: "http".into(),
        host: addr.ip().to_string(),
        port: addr.port(),
        path: "/api/generate".into(),
    }
}

/// Gateway config over `endpoints` with millisecond backoff.
pub fn gateway_config(endpoints: Vec<EndpointConfig>) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.gateway.endpoints = endpoints;
    config.retries.base_delay_ms = 10;
    config.timeouts.connect_secs = 2;
    config.timeouts.response_secs = 5;
    config.health.timeout_secs = 2;
    config
}

/// Serve the gateway on an ephemeral port until `shutdown` fires.
pub async fn spawn_gateway(config: &RelayConfig, shutdown: broadcast::Receiver<()>) -> SocketAddr {
    let gateway = Gateway::from_config(config, Telemetry::disabled()).unwrap();
    let health = HealthProbe::new(&config.health).unwrap();
    let server = GatewayServer::new(config, gateway, health, Telemetry::disabled());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener, shutdown).await;
    });
    addr
}

/// A TCP relay on an ephemeral port in front of `upstream`.
pub struct RunningRelay {
    pub addr: SocketAddr,
    pub tracker: SessionTracker,
    pub task: tokio::task::JoinHandle<()>,
}

pub async fn spawn_relay(
    upstream: SocketAddr,
    max_connections: usize,
    shutdown: broadcast::Receiver<()>,
) -> RunningRelay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let settings = SessionSettings {
        upstream_address: upstream.to_string(),
        chunk_size: 4096,
        connect_timeout: Duration::from_secs(2),
    };
    let acceptor = Acceptor::from_listener(listener, settings, max_connections, Telemetry::disabled());
    let addr = acceptor.local_addr().unwrap();
    let tracker = acceptor.tracker();
    let task = tokio::spawn(acceptor.run(shutdown));
    RunningRelay { addr, tracker, task }
}

/// Poll `condition` every 10ms until it holds or `limit` passes.
pub async fn eventually(limit: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
