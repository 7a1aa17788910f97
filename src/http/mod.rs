//! HTTP streaming gateway.
//!
//! # Data Flow
//! ```text
//! POST /api/generate
//!     → server.rs (Axum setup, request ID, body limit)
//!     → request.rs (parse and validate model + prompt)
//!     → failover selector (first endpoint answering 200)
//!     → stream.rs (relay the chosen body chunk by chunk)
//!     → Send to client
//!
//! GET /health
//!     → health probe → response.rs (health body)
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod stream;

pub use request::{parse_envelope, UuidRequestId, X_REQUEST_ID};
pub use response::{error_response, ErrorBody, HealthBody, MISSING_FIELDS};
pub use server::{AppState, Gateway, GatewayError, GatewayServer};
pub use stream::{relay_body, RelayStream, StreamedReply, DEFAULT_STREAM_CHUNK_SIZE};
