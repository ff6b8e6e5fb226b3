use async_trait::async_trait;
use axum::http::StatusCode;
use log::{ info, warn };
use reqwest::{ Client as HttpClient, header::CONTENT_TYPE };
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use std::time::Duration;

use super::{ ApiKey, GenerationConfig, GenerativeBackend, UpstreamError, UpstreamReply };
use crate::models::chat::{ Message, Role };

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

impl From<Role> for TurnRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => TurnRole::User,
            Role::Assistant => TurnRole::Model,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Content {
    pub role: TurnRole,
    pub parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Part {
    pub text: String,
}

impl Content {
    fn text(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

/// The slice of a `generateContent` response the chat widget reads.
#[derive(Deserialize, Debug, Default)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
pub struct CandidatePart {
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, or `None` when there is nothing to show.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

/// Upstream has no system-role slot on this endpoint, so the prompt rides
/// inline on the final user turn.
pub fn build_contents(history: &[Message], user_message: &str, system_prompt: &str) -> Vec<Content> {
    let mut contents: Vec<Content> = history
        .iter()
        .map(|msg| Content::text(msg.role.into(), msg.text.clone()))
        .collect();

    contents.push(
        Content::text(TurnRole::User, format!("(Context: {}) {}", system_prompt, user_message))
    );
    contents
}

pub struct GeminiBackend {
    http: HttpClient,
    base_url: String,
    model: String,
    generation: GenerationConfig,
}

impl GeminiBackend {
    pub fn new(
        base_url: Option<String>,
        model: Option<String>,
        generation: GenerationConfig,
        timeout: Duration
    ) -> Result<Self, reqwest::Error> {
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            generation,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate(
        &self,
        api_key: &ApiKey,
        contents: Vec<Content>
    ) -> Result<UpstreamReply, UpstreamError> {
        info!("GeminiBackend::generate() → model={} turns={}", self.model, contents.len());

        let payload = GenerateRequest {
            contents,
            generation_config: self.generation.clone(),
        };

        let resp = self.http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key.expose())
            .json(&payload)
            .send().await
            .map_err(UpstreamError::transport)?;

        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);

        let text = resp.text().await.map_err(UpstreamError::transport)?;
        if !is_json {
            return Err(UpstreamError::InvalidResponse { body: text });
        }

        match serde_json::from_str::<JsonValue>(&text) {
            Ok(body) => Ok(UpstreamReply { status, body }),
            Err(e) => {
                warn!("Upstream claimed JSON but body did not parse: {}", e);
                Err(UpstreamError::InvalidResponse { body: text })
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn history_roles_map_to_upstream_labels() {
        let history = vec![Message::user("who are you?"), Message::assistant("a bot")];
        let contents = build_contents(&history, "hi", "p");

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0].role, TurnRole::User);
        assert_eq!(contents[1].role, TurnRole::Model);
        assert_eq!(contents[2].role, TurnRole::User);
        assert_eq!(contents[2].parts[0].text, "(Context: p) hi");
    }

    #[test]
    fn request_serializes_in_upstream_shape() {
        let payload = GenerateRequest {
            contents: build_contents(&[Message::assistant("hey")], "hi", "p"),
            generation_config: GenerationConfig::default(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["contents"][0]["role"], "model");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hey");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1000);
    }

    #[test]
    fn extracts_first_candidate_text() {
        let resp: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "hello" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        })).unwrap();
        assert_eq!(resp.text().as_deref(), Some("hello"));
    }

    #[test]
    fn missing_candidates_yield_no_text() {
        let empty: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.text().is_none());

        let blocked: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        })).unwrap();
        assert!(blocked.text().is_none());
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let backend = GeminiBackend::new(
            Some("http://localhost:9999/v1beta/".into()),
            Some("gemini-test".into()),
            GenerationConfig::default(),
            Duration::from_secs(1)
        ).unwrap();
        assert_eq!(backend.endpoint(), "http://localhost:9999/v1beta/models/gemini-test:generateContent");
        assert_eq!(backend.model(), "gemini-test");
    }
}
