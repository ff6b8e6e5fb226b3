use crate::llm::{ ApiKey, GenerativeBackend };
use crate::llm::gemini::build_contents;
use crate::models::chat::ChatRequest;
use super::error::{ internal_error_body, ProxyError };
use super::truncate_chars;

use std::any::Any;
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use axum::{
    Json,
    Router,
    body::Bytes,
    extract::{ Request, State },
    http::{ StatusCode, HeaderValue, header },
    middleware::{ self, Next },
    response::{ Html, IntoResponse, Response },
    routing::{ get, post },
};
use chrono::Utc;
use governor::{ RateLimiter, Quota, state::{ InMemoryState, NotKeyed }, clock::DefaultClock };
use serde::Serialize;
use serde_json::Value as JsonValue;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{ Any as AnyOrigin, CorsLayer };
use tower_http::services::{ ServeDir, ServeFile };
use tower_http::set_header::SetResponseHeaderLayer;
use uuid::Uuid;
use log::{ info, warn, error };

const LOG_BODY_LIMIT: usize = 100;
const LOG_UPSTREAM_LIMIT: usize = 500;

type ChatLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
struct DebugEnvResponse {
    has_key: bool,
    model: String,
    port: u16,
}

/// Read-only per-process state shared by every request.
#[derive(Clone)]
pub struct AppState {
    backend: Arc<dyn GenerativeBackend>,
    api_key: Option<ApiKey>,
    limiter: Option<Arc<ChatLimiter>>,
    port: u16,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        api_key: Option<ApiKey>,
        chat_rate_per_minute: u32,
        port: u16,
    ) -> Self {
        let limiter = NonZeroU32::new(chat_rate_per_minute)
            .map(|n| Arc::new(RateLimiter::direct(Quota::per_minute(n))));
        Self { backend, api_key, limiter, port }
    }
}

pub fn router(state: AppState, static_dir: &str) -> Router {
    let index = Path::new(static_dir).join("index.html");
    let site = ServeDir::new(static_dir).fallback(ServeFile::new(index));

    let routes = Router::new()
        .route("/health", get(health_handler))
        .route("/server-test", get(server_test_handler))
        .route("/debug-env", get(debug_env_handler))
        .route("/api/chat", post(chat_handler))
        .fallback_service(site);

    with_layers(routes).with_state(state)
}

/// Panic handling sits inside the header layers so a 500 from a panic still
/// carries the security headers.
fn with_layers(routes: Router<AppState>) -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    routes
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(log_request))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(cors)
}

async fn log_request(req: Request, next: Next) -> Response {
    info!("{} {}", req.method(), req.uri());
    next.run(req).await
}

fn panic_response(_err: Box<dyn Any + Send + 'static>) -> Response {
    error!("Request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(internal_error_body("Unexpected server failure")))
        .into_response()
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        message: "Server is running",
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn server_test_handler() -> Html<&'static str> {
    Html("<h1>Server is alive and responding!</h1>")
}

async fn debug_env_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(DebugEnvResponse {
        has_key: state.api_key.is_some(),
        model: state.backend.model().to_string(),
        port: state.port,
    })
}

async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();
    info!(
        "[{}] Chat request received: {}",
        request_id,
        truncate_chars(&String::from_utf8_lossy(&body), LOG_BODY_LIMIT)
    );

    match relay_chat(&state, &body).await {
        Ok(payload) => Json(payload).into_response(),
        Err(e) => {
            match &e {
                ProxyError::EmptyBody | ProxyError::InvalidBody(_) | ProxyError::RateLimited => {
                    warn!("[{}] Rejected chat request: {}", request_id, e);
                }
                ProxyError::MissingCredential => {
                    error!("[{}] Missing GEMINI_API_KEY, cannot forward chat request", request_id);
                }
                ProxyError::InvalidUpstream { body } => {
                    error!(
                        "[{}] Non-JSON response received from Gemini: {}",
                        request_id,
                        truncate_chars(body, LOG_UPSTREAM_LIMIT)
                    );
                }
                ProxyError::UpstreamStatus { status, details } => {
                    error!("[{}] Gemini API error {}: {}", request_id, status, details);
                }
                ProxyError::Transport(source) => {
                    error!("[{}] Server Error: {}", request_id, source);
                }
            }
            e.into_response()
        }
    }
}

async fn relay_chat(state: &AppState, body: &[u8]) -> Result<JsonValue, ProxyError> {
    let req = parse_chat_request(body)?;

    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            return Err(ProxyError::RateLimited);
        }
    }

    let api_key = state.api_key.as_ref().ok_or(ProxyError::MissingCredential)?;
    let contents = build_contents(&req.history, &req.user_message, &req.system_prompt);
    let reply = state.backend.generate(api_key, contents).await?;

    if !reply.status.is_success() {
        return Err(ProxyError::UpstreamStatus {
            status: reply.status,
            details: reply.body,
        });
    }
    Ok(reply.body)
}

fn parse_chat_request(body: &[u8]) -> Result<ChatRequest, ProxyError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ProxyError::EmptyBody);
    }
    let value: JsonValue = serde_json::from_slice(body)
        .map_err(|e| ProxyError::InvalidBody(e.to_string()))?;
    match &value {
        JsonValue::Null => return Err(ProxyError::EmptyBody),
        JsonValue::Object(map) if map.is_empty() => return Err(ProxyError::EmptyBody),
        _ => {}
    }
    serde_json::from_value(value).map_err(|e| ProxyError::InvalidBody(e.to_string()))
}
