//! End-to-end behavior of the raw TCP relay.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use ollama_relay::lifecycle::Shutdown;

mod common;

const BOUND: Duration = Duration::from_secs(3);

async fn ping(stream: &mut TcpStream) {
    stream.write_all(b"PING").await.unwrap();
    let mut buf = [0u8; 4];
    tokio::time::timeout(BOUND, stream.read_exact(&mut buf))
        .await
        .expect("no reply through relay")
        .unwrap();
    assert_eq!(&buf, b"PONG");
}

/// Read until the peer closes or resets; panics if that takes longer than `BOUND`.
async fn expect_closed(stream: &mut TcpStream) {
    let mut buf = [0u8; 64];
    let result = tokio::time::timeout(BOUND, async {
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => continue,
            }
        }
    })
    .await;
    assert!(result.is_ok(), "connection was left half-open");
}

#[tokio::test]
async fn bytes_round_trip_through_relay() {
    let upstream = common::start_ping_upstream().await;
    let shutdown = Shutdown::new();
    let relay = common::spawn_relay(upstream, 16, shutdown.subscribe()).await;

    let mut client = TcpStream::connect(relay.addr).await.unwrap();
    ping(&mut client).await;
    ping(&mut client).await;

    drop(client);
    assert!(common::eventually(BOUND, || relay.tracker.active_count() == 0).await);
    shutdown.trigger();
}

#[tokio::test]
async fn client_close_reaches_upstream() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream = listener.local_addr().unwrap();
    let (eof_tx, eof_rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let _ = socket.read_to_end(&mut received).await;
        let _ = eof_tx.send(received);
    });

    let shutdown = Shutdown::new();
    let relay = common::spawn_relay(upstream, 16, shutdown.subscribe()).await;

    let mut client = TcpStream::connect(relay.addr).await.unwrap();
    client.write_all(b"payload").await.unwrap();
    drop(client);

    let received = tokio::time::timeout(BOUND, eof_rx)
        .await
        .expect("upstream never saw EOF")
        .unwrap();
    assert_eq!(received, b"payload");
    assert!(common::eventually(BOUND, || relay.tracker.active_count() == 0).await);
    shutdown.trigger();
}

#[tokio::test]
async fn upstream_reset_closes_client() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4];
        let _ = socket.read_exact(&mut buf).await;
        // Zero linger turns the close into an RST.
        socket2::SockRef::from(&socket)
            .set_linger(Some(Duration::ZERO))
            .unwrap();
        drop(socket);
    });

    let shutdown = Shutdown::new();
    let relay = common::spawn_relay(upstream, 16, shutdown.subscribe()).await;

    let mut client = TcpStream::connect(relay.addr).await.unwrap();
    client.write_all(b"PING").await.unwrap();
    expect_closed(&mut client).await;

    assert!(common::eventually(BOUND, || relay.tracker.active_count() == 0).await);
    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_upstream_closes_client() {
    let upstream = common::refused_addr().await;
    let shutdown = Shutdown::new();
    let relay = common::spawn_relay(upstream, 16, shutdown.subscribe()).await;

    let mut client = TcpStream::connect(relay.addr).await.unwrap();
    expect_closed(&mut client).await;

    // The acceptor keeps serving after a failed session.
    let mut second = TcpStream::connect(relay.addr).await.unwrap();
    expect_closed(&mut second).await;
    shutdown.trigger();
}

#[tokio::test]
async fn shutdown_stops_accepting_but_sessions_continue() {
    let upstream = common::start_ping_upstream().await;
    let shutdown = Shutdown::new();
    let relay = common::spawn_relay(upstream, 16, shutdown.subscribe()).await;

    let mut client = TcpStream::connect(relay.addr).await.unwrap();
    ping(&mut client).await;

    shutdown.trigger();
    tokio::time::timeout(BOUND, relay.task)
        .await
        .expect("acceptor did not stop")
        .unwrap();

    assert!(TcpStream::connect(relay.addr).await.is_err());
    ping(&mut client).await;
    assert_eq!(relay.tracker.active_count(), 1);

    drop(client);
    assert!(relay.tracker.wait_for_drain(BOUND).await);
}

#[tokio::test]
async fn connection_limit_queues_extra_clients() {
    let upstream = common::start_ping_upstream().await;
    let shutdown = Shutdown::new();
    let relay = common::spawn_relay(upstream, 1, shutdown.subscribe()).await;

    let mut first = TcpStream::connect(relay.addr).await.unwrap();
    ping(&mut first).await;

    // Completes the TCP handshake via the backlog, but is not served yet.
    let mut second = TcpStream::connect(relay.addr).await.unwrap();
    second.write_all(b"PING").await.unwrap();
    let mut buf = [0u8; 4];
    assert!(
        tokio::time::timeout(Duration::from_millis(200), second.read_exact(&mut buf))
            .await
            .is_err()
    );

    drop(first);
    tokio::time::timeout(BOUND, second.read_exact(&mut buf))
        .await
        .expect("queued client was never served")
        .unwrap();
    assert_eq!(&buf, b"PONG");
    shutdown.trigger();
}

#[tokio::test]
async fn concurrent_sessions_are_independent() {
    let upstream = common::start_ping_upstream().await;
    let shutdown = Shutdown::new();
    let relay = common::spawn_relay(upstream, 256, shutdown.subscribe()).await;

    let concurrency = 32;
    let rounds = 20;
    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let addr = relay.addr;
        tasks.push(tokio::spawn(async move {
            let mut client = TcpStream::connect(addr).await.unwrap();
            for _ in 0..rounds {
                ping(&mut client).await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(common::eventually(BOUND, || relay.tracker.active_count() == 0).await);
    shutdown.trigger();
}
