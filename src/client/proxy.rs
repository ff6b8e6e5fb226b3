use async_trait::async_trait;
use log::{ error, warn };
use reqwest::{ Client as HttpClient, StatusCode };
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::llm::gemini::GenerateResponse;
use crate::models::chat::Message;

const CONFIG_ISSUE_REPLY: &str =
    "⚙️ Server configuration issue: the assistant's API key might be missing or incorrect.";
const RATE_LIMITED_REPLY: &str =
    "🚀 I'm a bit overwhelmed with requests right now! Please wait a minute and try asking again.";
const UPSTREAM_DOWN_REPLY: &str =
    "🛰️ I'm having trouble connecting to my AI brain. It might be temporarily down.";
const NETWORK_REPLY: &str =
    "🚨 Network Error: I'm having trouble reaching the server! Please check your connection and try again.";
const EMPTY_REPLY: &str = "🤔 I received an empty response. Could you try rephrasing your question?";
const GENERIC_REPLY: &str =
    "🌪️ Something went wrong on my end. The AI might be busy, so please try again in a moment!";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("could not build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("could not reach the chat server: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("chat server answered {0}")]
    Status(StatusCode),
    #[error("chat server sent an unreadable payload: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("chat server reply contained no text")]
    EmptyReply,
}

/// Turns any failure into something fit to show as an assistant message.
pub fn friendly_message(err: &ClientError) -> &'static str {
    match err {
        ClientError::Status(StatusCode::INTERNAL_SERVER_ERROR) => CONFIG_ISSUE_REPLY,
        ClientError::Status(StatusCode::TOO_MANY_REQUESTS) => RATE_LIMITED_REPLY,
        ClientError::Status(StatusCode::BAD_GATEWAY) => UPSTREAM_DOWN_REPLY,
        ClientError::Transport(_) => NETWORK_REPLY,
        ClientError::EmptyReply => EMPTY_REPLY,
        ClientError::Status(_) | ClientError::Decode(_) | ClientError::InvalidUrl(_) | ClientError::Build(_) => {
            GENERIC_REPLY
        }
    }
}

/// One outbound call per turn. Always resolves to text to display.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, history: &[Message], user_message: &str) -> String;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutgoingChat<'a> {
    history: &'a [Message],
    user_message: &'a str,
    system_prompt: &'a str,
}

pub struct ProxyClient {
    http: HttpClient,
    endpoint: Url,
    system_prompt: String,
}

impl ProxyClient {
    pub fn new(
        server_url: &str,
        system_prompt: impl Into<String>,
        timeout: Duration
    ) -> Result<Self, ClientError> {
        let mut base = Url::parse(server_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join("api/chat")?;
        let http = HttpClient::builder().timeout(timeout).build().map_err(ClientError::Build)?;

        Ok(Self {
            http,
            endpoint,
            system_prompt: system_prompt.into(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn request(&self, history: &[Message], user_message: &str) -> Result<String, ClientError> {
        let body = OutgoingChat {
            history,
            user_message,
            system_prompt: &self.system_prompt,
        };

        let resp = self.http
            .post(self.endpoint.clone())
            .json(&body)
            .send().await
            .map_err(ClientError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let details = resp.text().await.unwrap_or_default();
            warn!("Server Error Response: {} {}", status, details);
            return Err(ClientError::Status(status));
        }

        let payload: GenerateResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() { ClientError::Transport(e) } else { ClientError::Decode(e) }
        })?;
        payload.text().ok_or(ClientError::EmptyReply)
    }
}

#[async_trait]
impl ChatTransport for ProxyClient {
    async fn send_message(&self, history: &[Message], user_message: &str) -> String {
        match self.request(history, user_message).await {
            Ok(text) => text,
            Err(e) => {
                error!("Chat proxy error: {}", e);
                friendly_message(&e).to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_path() {
        let timeout = Duration::from_secs(1);
        let root = ProxyClient::new("http://localhost:3000", "p", timeout).unwrap();
        assert_eq!(root.endpoint().as_str(), "http://localhost:3000/api/chat");

        let nested = ProxyClient::new("https://example.test/site", "p", timeout).unwrap();
        assert_eq!(nested.endpoint().as_str(), "https://example.test/site/api/chat");
    }

    #[test]
    fn rejects_unparseable_server_url() {
        let result = ProxyClient::new("not a url", "p", Duration::from_secs(1));
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn statuses_map_to_distinct_replies() {
        let config = friendly_message(&ClientError::Status(StatusCode::INTERNAL_SERVER_ERROR));
        let busy = friendly_message(&ClientError::Status(StatusCode::TOO_MANY_REQUESTS));
        let gateway = friendly_message(&ClientError::Status(StatusCode::BAD_GATEWAY));
        let other = friendly_message(&ClientError::Status(StatusCode::NOT_FOUND));

        assert_eq!(config, CONFIG_ISSUE_REPLY);
        assert_eq!(busy, RATE_LIMITED_REPLY);
        assert_eq!(gateway, UPSTREAM_DOWN_REPLY);
        assert_eq!(other, GENERIC_REPLY);
        assert_eq!(friendly_message(&ClientError::EmptyReply), EMPTY_REPLY);
    }

    #[tokio::test]
    async fn unreachable_server_still_yields_a_reply() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{}", addr);
        let client = ProxyClient::new(&url, "p", Duration::from_secs(2)).unwrap();
        let reply = client.send_message(&[], "hi").await;
        assert_eq!(reply, NETWORK_REPLY);
    }
}
