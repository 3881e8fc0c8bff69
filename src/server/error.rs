//! Error responses for the HTTP API
//!
//! Clients only ever see a fixed message and a kind; the underlying error
//! is logged server side.

use crate::error::Error;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

pub(crate) const UPSTREAM_DETAIL: &str =
    "The assistant could not reach the language model provider. Please try again later.";
const INTERNAL_DETAIL: &str = "The assistant failed to answer the query.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Embedding or chat-completion provider failure
    UpstreamUnavailable,
    /// Any other failure while answering
    Internal,
    /// The request body could not be decoded
    InvalidRequest { status: StatusCode, detail: String },
}

impl ApiError {
    /// Classify a failed chat turn, logging the raw error
    pub fn from_chat_error(err: &Error) -> Self {
        error!(error = %err, "Chat turn failed");
        if err.is_upstream() {
            ApiError::UpstreamUnavailable
        } else {
            ApiError::Internal
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::UpstreamUnavailable => "upstream_unavailable",
            ApiError::Internal => "internal",
            ApiError::InvalidRequest { .. } => "invalid_request",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UpstreamUnavailable | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidRequest { status, .. } => *status,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            ApiError::UpstreamUnavailable => UPSTREAM_DETAIL,
            ApiError::Internal => INTERNAL_DETAIL,
            ApiError::InvalidRequest { detail, .. } => detail,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection, "Rejected request body");
        ApiError::InvalidRequest {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "detail": self.detail(),
            "kind": self.kind(),
        });
        (self.status(), Json(body)).into_response()
    }
}
