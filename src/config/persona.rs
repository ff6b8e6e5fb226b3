use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;
use log::{ info, warn };

const DEFAULT_SYSTEM_PROMPT: &str = "You are the friendly assistant on a personal portfolio website. \
Answer questions about the site owner's projects, skills and background in a warm, upbeat tone. \
Keep responses short (under 3 sentences).";
const DEFAULT_GREETING: &str = "Hi! I'm the AI buddy on this site. Ask me anything!";

#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("Persona file IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Persona JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Persona field '{0}' must not be empty")]
    EmptyField(String),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct QuickReply {
    pub label: String,
    pub message: String,
}

/// Client-side prompt bundle: what gets sent as the system prompt, what the
/// assistant says first, and the canned questions offered to the user.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Persona {
    pub system_prompt: String,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default)]
    pub quick_replies: Vec<QuickReply>,
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            greeting: default_greeting(),
            quick_replies: vec![
                QuickReply { label: "Projects?".into(), message: "What projects have you built?".into() },
                QuickReply { label: "Fun Fact!".into(), message: "Tell me a fun fact!".into() },
            ],
        }
    }
}

impl Persona {
    fn validate(&self) -> Result<(), PersonaError> {
        if self.system_prompt.trim().is_empty() {
            return Err(PersonaError::EmptyField("system_prompt".to_string()));
        }
        for (idx, reply) in self.quick_replies.iter().enumerate() {
            if reply.message.trim().is_empty() {
                return Err(PersonaError::EmptyField(format!("quick_replies[{}].message", idx)));
            }
        }
        Ok(())
    }
}

pub fn load_persona<P: AsRef<Path>>(path: P) -> Result<Persona, PersonaError> {
    let json_str = fs::read_to_string(path)?;
    let persona: Persona = serde_json::from_str(&json_str)?;
    persona.validate()?;
    Ok(persona)
}

/// Falls back to the built-in persona when the file is absent or unusable.
pub fn load_persona_or_default(path: &str) -> Persona {
    match load_persona(path) {
        Ok(persona) => {
            info!("Loaded persona from {}", path);
            persona
        }
        Err(PersonaError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            info!("No persona file at {}, using the built-in persona", path);
            Persona::default()
        }
        Err(e) => {
            warn!("Ignoring persona file {}: {}", path, e);
            Persona::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_persona_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.json");
        fs::write(&path, r#"{ "system_prompt": "Be nice." }"#).unwrap();

        let persona = load_persona(&path).unwrap();
        assert_eq!(persona.system_prompt, "Be nice.");
        assert_eq!(persona.greeting, DEFAULT_GREETING);
        assert!(persona.quick_replies.is_empty());
    }

    #[test]
    fn rejects_blank_quick_reply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.json");
        fs::write(
            &path,
            r#"{ "system_prompt": "x", "quick_replies": [{ "label": "a", "message": " " }] }"#
        ).unwrap();

        assert!(matches!(load_persona(&path), Err(PersonaError::EmptyField(_))));
    }

    #[test]
    fn missing_file_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert_eq!(load_persona_or_default(path.to_str().unwrap()), Persona::default());
    }

    #[test]
    fn shipped_persona_file_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/json/persona.json");
        let persona = load_persona(path).unwrap();
        assert!(!persona.quick_replies.is_empty());
    }
}
