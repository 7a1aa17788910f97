//! Streaming Response Relay.
//!
//! Turns the selected upstream response into the caller's response: same
//! content-type, body relayed chunk by chunk without buffering it whole.
//!
//! # Design Decisions
//! - Chunks are re-cut to at most `chunk_size` bytes; `Bytes::split_to` keeps it zero-copy
//! - A mid-stream upstream error becomes the final body chunk; status is already sent
//! - The upstream handle is released when the stream ends or is dropped by a
//!   disconnecting caller, whichever comes first

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::io;

use crate::failover::{Phase, Selected, UpstreamBody};
use crate::observability::Telemetry;

/// Largest chunk handed to the caller unless configured otherwise.
pub const DEFAULT_STREAM_CHUNK_SIZE: usize = 8192;

/// Body stream relayed to the caller.
pub type RelayStream = BoxStream<'static, Result<Bytes, io::Error>>;

/// A successful `submit`: the upstream content-type and the relayed body.
pub struct StreamedReply {
    pub content_type: Option<HeaderValue>,
    pub body: RelayStream,
}

impl StreamedReply {
    pub fn new(selected: Selected, chunk_size: usize, telemetry: Telemetry) -> Self {
        let content_type = selected.response.content_type;
        let endpoint = selected.endpoint.to_string();
        let body = relay_body(
            selected.endpoint_index,
            endpoint,
            selected.response.body,
            chunk_size,
            telemetry,
        );
        Self { content_type, body }
    }
}

impl IntoResponse for StreamedReply {
    fn into_response(self) -> Response {
        let mut builder = Response::builder().status(StatusCode::OK);
        if let Some(content_type) = self.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder
            .body(Body::from_stream(self.body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

/// Owns the upstream body for the STREAMING phase.
struct Streaming {
    body: UpstreamBody,
    pending: Bytes,
    phase: Phase,
    chunk_size: usize,
    endpoint: String,
    telemetry: Telemetry,
}

impl Drop for Streaming {
    fn drop(&mut self) {
        self.telemetry.handle_released();
        if self.phase == Phase::Done {
            tracing::debug!(endpoint = %self.endpoint, "Upstream response released");
        } else {
            tracing::info!(endpoint = %self.endpoint, "Caller went away, upstream response released");
        }
    }
}

/// Relay `body` as chunks of at most `chunk_size` bytes, in upstream order.
pub fn relay_body(
    endpoint_index: usize,
    endpoint: String,
    body: UpstreamBody,
    chunk_size: usize,
    telemetry: Telemetry,
) -> RelayStream {
    telemetry.handle_acquired();
    let state = Streaming {
        body,
        pending: Bytes::new(),
        phase: Phase::Streaming {
            endpoint: endpoint_index,
        },
        chunk_size: chunk_size.max(1),
        endpoint,
        telemetry,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if !state.pending.is_empty() {
                let n = state.pending.len().min(state.chunk_size);
                let chunk = state.pending.split_to(n);
                state.telemetry.stream_chunk();
                return Some((Ok::<_, io::Error>(chunk), state));
            }
            if state.phase == Phase::Done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => state.pending = bytes,
                Some(Err(e)) => {
                    tracing::error!(endpoint = %state.endpoint, error = %e, "Error during streaming");
                    state.telemetry.stream_error();
                    state.pending = Bytes::from(e.to_string());
                    state.phase = Phase::Done;
                }
                None => state.phase = Phase::Done,
            }
        }
    })
    .boxed()
}
