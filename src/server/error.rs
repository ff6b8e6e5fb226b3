use axum::{
    Json,
    http::StatusCode,
    response::{ IntoResponse, Response },
};
use serde_json::{ json, Value as JsonValue };
use thiserror::Error;

use super::truncate_chars;
use crate::llm::UpstreamError;

const DETAILS_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Empty request body")]
    EmptyBody,
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error("API Key not configured on server")]
    MissingCredential,
    #[error("Too many requests")]
    RateLimited,
    #[error("Invalid response from Gemini API")]
    InvalidUpstream { body: String },
    #[error("Gemini API failed with status {status}")]
    UpstreamStatus { status: StatusCode, details: JsonValue },
    #[error("Upstream transport failure: {0}")]
    Transport(#[source] reqwest::Error),
}

impl From<UpstreamError> for ProxyError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::InvalidResponse { body } => ProxyError::InvalidUpstream { body },
            UpstreamError::Transport(e) => ProxyError::Transport(e),
        }
    }
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::EmptyBody | ProxyError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::MissingCredential | ProxyError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::InvalidUpstream { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamStatus { status, .. } => *status,
        }
    }

    fn body(&self) -> JsonValue {
        match self {
            ProxyError::EmptyBody => json!({ "error": "Empty request body" }),
            ProxyError::InvalidBody(_) => json!({ "error": "Invalid request body" }),
            ProxyError::MissingCredential => json!({ "error": "API Key not configured on server" }),
            ProxyError::RateLimited => json!({ "error": "Too many requests" }),
            ProxyError::InvalidUpstream { body } => json!({
                "error": "Invalid response from Gemini API",
                "details": truncate_chars(body, DETAILS_LIMIT),
            }),
            ProxyError::UpstreamStatus { details, .. } => json!({
                "error": "Gemini API failed",
                "details": details,
            }),
            ProxyError::Transport(e) => internal_error_body(
                if e.is_timeout() { "Upstream request timed out" } else { "Could not reach upstream service" }
            ),
        }
    }
}

pub fn internal_error_body(message: &str) -> JsonValue {
    json!({ "error": "Internal Server Error", "message": message })
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
