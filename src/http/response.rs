//! Response shaping for the gateway's own (non-relayed) responses.
//!
//! # Design Decisions
//! - Every error is a JSON object with a single `error` string
//! - Relayed upstream bodies never pass through here; see stream.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Message returned when `model` or `prompt` is missing.
pub const MISSING_FIELDS: &str =
    "Please provide both 'model' and 'prompt' in the request body.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// JSON error response with the given status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HealthBody {
    Healthy {
        status: String,
        ollama_status: String,
    },
    Unhealthy {
        status: String,
        error: String,
    },
}

impl HealthBody {
    pub fn healthy() -> Self {
        HealthBody::Healthy {
            status: "healthy".to_string(),
            ollama_status: "up".to_string(),
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        HealthBody::Unhealthy {
            status: "unhealthy".to_string(),
            error: error.into(),
        }
    }
}

impl IntoResponse for HealthBody {
    fn into_response(self) -> Response {
        let status = match self {
            HealthBody::Healthy { .. } => StatusCode::OK,
            HealthBody::Unhealthy { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(self)).into_response()
    }
}
