//! Request handling.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) for every inbound request
//! - Turn a JSON body into a `RequestEnvelope`, or reject it
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The envelope is opaque beyond the two required fields

use axum::http::{HeaderValue, Request};
use serde_json::Value;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::failover::RequestEnvelope;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates a fresh UUID v4 for requests that arrive without an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(id))
    }
}

/// Read the request ID set by the request-id layer.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Extract `model` and `prompt` from a JSON body.
///
/// Returns `None` when the body is not a JSON object or either field is
/// missing. Present values are kept as they arrived, whatever their type.
pub fn parse_envelope(body: &[u8]) -> Option<RequestEnvelope> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let model = value.get("model")?.clone();
    let prompt = value.get("prompt")?.clone();
    Some(RequestEnvelope::new(model, prompt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_required_fields_and_ignores_extras() {
        let envelope =
            parse_envelope(br#"{"model":"llama3","prompt":"hi","stream":false}"#).unwrap();
        assert_eq!(envelope, RequestEnvelope::new("llama3", "hi"));
    }

    #[test]
    fn rejects_missing_or_malformed_input() {
        assert_eq!(parse_envelope(br#"{"model":"llama3"}"#), None);
        assert_eq!(parse_envelope(br#"{"prompt":"hi"}"#), None);
        assert_eq!(parse_envelope(b"[1,2]"), None);
        assert_eq!(parse_envelope(b"not json"), None);
        assert_eq!(parse_envelope(b""), None);
    }

    #[test]
    fn present_fields_of_any_type_are_accepted() {
        let envelope = parse_envelope(br#"{"model":3,"prompt":["a","b"]}"#).unwrap();
        assert_eq!(envelope, RequestEnvelope::new(3, serde_json::json!(["a", "b"])));

        let envelope = parse_envelope(br#"{"model":"llama3","prompt":null}"#).unwrap();
        assert_eq!(envelope.prompt, Value::Null);
    }

    #[test]
    fn generated_ids_are_unique_uuids() {
        let request = Request::new(());
        let mut make = UuidRequestId;
        let a = make.make_request_id(&request).unwrap();
        let b = make.make_request_id(&request).unwrap();
        assert_ne!(a.header_value(), b.header_value());
        assert!(Uuid::parse_str(a.header_value().to_str().unwrap()).is_ok());
    }
}
