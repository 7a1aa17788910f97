//! Byte Relay: one direction of a Forward Session.
//!
//! Copies bytes from a source connection to a destination connection until
//! the source reaches EOF or either side fails, then closes BOTH connections.
//! Closing both is what stops the partner relay running the reverse
//! direction: its pending read sees EOF and its next write fails.

use socket2::SockRef;
use std::io;
use std::net::Shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::observability::{Direction, Telemetry};

/// Read size used by the TCP relay unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Why a relay stopped.
#[derive(Debug)]
pub enum RelayEnd {
    /// The source sent EOF.
    Eof,
    ReadFailed(io::Error),
    WriteFailed(io::Error),
}

impl RelayEnd {
    pub fn is_eof(&self) -> bool {
        matches!(self, RelayEnd::Eof)
    }
}

/// Result of one finished relay.
#[derive(Debug)]
pub struct RelayOutcome {
    pub direction: Direction,
    pub bytes: u64,
    pub end: RelayEnd,
}

/// Relay `source` into `destination` in chunks of at most `chunk_size` bytes.
///
/// Never retries. Both underlying sockets are shut down before returning,
/// whatever the reason for stopping.
pub async fn relay(
    mut source: OwnedReadHalf,
    mut destination: OwnedWriteHalf,
    direction: Direction,
    chunk_size: usize,
    telemetry: Telemetry,
) -> RelayOutcome {
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut bytes = 0u64;

    let end = loop {
        let n = match source.read(&mut buffer).await {
            Ok(0) => break RelayEnd::Eof,
            Ok(n) => n,
            Err(e) => break RelayEnd::ReadFailed(e),
        };

        if let Err(e) = destination.write_all(&buffer[..n]).await {
            break RelayEnd::WriteFailed(e);
        }
        bytes += n as u64;
        telemetry.bytes_relayed(direction, n);
    };

    close(source.as_ref());
    close(destination.as_ref());

    match &end {
        RelayEnd::Eof => {
            tracing::debug!(direction = %direction, bytes, "Relay reached EOF");
        }
        RelayEnd::ReadFailed(e) | RelayEnd::WriteFailed(e) if is_teardown(e) => {
            tracing::debug!(direction = %direction, bytes, error = %e, "Relay torn down");
        }
        RelayEnd::ReadFailed(e) | RelayEnd::WriteFailed(e) => {
            tracing::warn!(direction = %direction, bytes, error = %e, "Relay I/O error");
        }
    }

    RelayOutcome {
        direction,
        bytes,
        end,
    }
}

/// Shut down both directions of `stream`. Idempotent.
pub fn close(stream: &TcpStream) {
    if let Err(e) = SockRef::from(stream).shutdown(Shutdown::Both) {
        // Already shut down, or the peer reset the connection first.
        if e.kind() != io::ErrorKind::NotConnected {
            tracing::trace!(error = %e, "Socket shutdown failed");
        }
    }
}

// Errors that follow from the other side (or the partner relay) closing.
fn is_teardown(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
    )
}
