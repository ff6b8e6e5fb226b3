use crate::models::chat::Message;
use std::fs;
use std::io::ErrorKind;
use std::path::{ Path, PathBuf };
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history file IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The conversation as seen by one client, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatSession {
    history: Vec<Message>,
}

impl ChatSession {
    pub fn new(history: Vec<Message>) -> Self {
        Self { history }
    }

    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.history
    }

    /// At most `limit` of the latest messages, oldest first.
    pub fn recent(&self, limit: usize) -> &[Message] {
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Client-local persistence of the whole history under a single key.
pub trait HistoryStore: Send + Sync {
    fn load(&self) -> Result<Vec<Message>, StoreError>;
    fn save(&self, messages: &[Message]) -> Result<(), StoreError>;
}

pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&self) -> Result<Vec<Message>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, messages: &[Message]) -> Result<(), StoreError> {
        let json = serde_json::to_string(messages)?;
        // Readers see either the previous history or the new one, never a partial file.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Keeps history for the lifetime of the process only.
#[derive(Default)]
pub struct MemoryHistoryStore {
    messages: Mutex<Vec<Message>>,
}

impl MemoryHistoryStore {
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self { messages: Mutex::new(messages) }
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<Vec<Message>, StoreError> {
        // A writer that panicked still left a whole Vec behind.
        let stored = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        Ok(stored.clone())
    }

    fn save(&self, messages: &[Message]) -> Result<(), StoreError> {
        let mut stored = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        *stored = messages.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_keeps_the_latest_entries_in_order() {
        let mut session = ChatSession::default();
        for i in 0..15 {
            session.push(Message::user(format!("m{}", i)));
        }
        let recent = session.recent(10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].text, "m5");
        assert_eq!(recent[9].text, "m14");
        assert_eq!(session.recent(100).len(), 15);
    }

    #[test]
    fn file_store_round_trips_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistoryStore::new(dir.path().join("history.json"));
        let history = vec![
            Message::assistant("Hi! Ask me anything."),
            Message::user("What is your dream?"),
            Message::assistant("To build rockets 🚀"),
        ];

        store.save(&history).unwrap();
        assert_eq!(store.load().unwrap(), history);
    }

    #[test]
    fn missing_file_is_an_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistoryStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(FileHistoryStore::new(&path).load(), Err(StoreError::Json(_))));
    }

    #[test]
    fn memory_store_survives_a_poisoned_lock() {
        let store = std::sync::Arc::new(MemoryHistoryStore::with_messages(vec![Message::user("before")]));
        let holder = store.clone();
        let poisoned = std::thread::spawn(move || {
            let _guard = holder.messages.lock().unwrap();
            panic!("writer crashed");
        }).join();
        assert!(poisoned.is_err());
        assert!(store.messages.is_poisoned());

        assert_eq!(store.load().unwrap()[0].text, "before");
        let history = vec![Message::user("after"), Message::assistant("still here")];
        store.save(&history).unwrap();
        assert_eq!(store.load().unwrap(), history);
    }

    #[test]
    fn reads_history_written_with_legacy_roles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(
            &path,
            r#"[{"role":"ai","text":"Hi!","timestamp":"2025-06-01T10:00:00.000Z"},
               {"role":"user","text":"hello","timestamp":"2025-06-01T10:00:05.000Z"}]"#
        ).unwrap();

        let history = FileHistoryStore::new(&path).load().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, crate::models::chat::Role::Assistant);
    }
}
