pub mod gemini;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;
use thiserror::Error;

use self::gemini::Content;

/// Server-held upstream credential. Only `expose` reveals the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Blank keys count as "not configured".
    pub fn from_option(raw: Option<String>) -> Option<Self> {
        raw.map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .map(ApiKey)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 1000,
        }
    }
}

/// Whatever JSON the upstream answered with, plus its status.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: JsonValue,
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream returned a non-JSON response")]
    InvalidResponse { body: String },
    #[error("failed to reach upstream: {0}")]
    Transport(#[source] reqwest::Error),
}

impl UpstreamError {
    /// Strips the request URL so nothing credential-shaped ends up in messages.
    pub fn transport(err: reqwest::Error) -> Self {
        UpstreamError::Transport(err.without_url())
    }
}

#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(
        &self,
        api_key: &ApiKey,
        contents: Vec<Content>,
    ) -> Result<UpstreamReply, UpstreamError>;

    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_keys_are_not_configured() {
        assert!(ApiKey::from_option(None).is_none());
        assert!(ApiKey::from_option(Some("   ".into())).is_none());
        let key = ApiKey::from_option(Some(" abc ".into())).unwrap();
        assert_eq!(key.expose(), "abc");
    }

    #[test]
    fn debug_never_prints_the_key() {
        let key = ApiKey::from_option(Some("super-secret".into())).unwrap();
        assert!(!format!("{:?}", key).contains("super-secret"));
    }

    #[test]
    fn generation_config_uses_upstream_field_names() {
        let json = serde_json::to_value(GenerationConfig::default()).unwrap();
        assert_eq!(json["maxOutputTokens"], 1000);
        assert!((json["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }
}
