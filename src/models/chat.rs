use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "ai")]
    Assistant,
}

/// A single turn of the conversation. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// Body of `POST /api/chat`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub history: Vec<Message>,
    pub user_message: String,
    #[serde(default)]
    pub system_prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_ai_role_reads_as_assistant() {
        let msg: Message = serde_json::from_value(json!({
            "role": "ai",
            "text": "hi there",
            "timestamp": "2025-01-02T03:04:05.678Z"
        })).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(serde_json::to_value(msg.role).unwrap(), json!("assistant"));
    }

    #[test]
    fn chat_request_uses_camel_case_and_defaults() {
        let req: ChatRequest = serde_json::from_value(json!({ "userMessage": "hi" })).unwrap();
        assert_eq!(req.user_message, "hi");
        assert!(req.history.is_empty());
        assert!(req.system_prompt.is_empty());

        let untimed: ChatRequest = serde_json::from_value(json!({
            "history": [{ "role": "user", "text": "hello" }],
            "userMessage": "hi"
        })).unwrap();
        assert_eq!(untimed.history[0].text, "hello");

        let body = serde_json::to_value(&req).unwrap();
        assert!(body.get("systemPrompt").is_some());
        assert!(body.get("userMessage").is_some());
    }
}
