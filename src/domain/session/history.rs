use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::domain::llm::Message;

/// Process-lifetime store of per-session chat history.
///
/// Sessions are created on first append and never removed.
#[derive(Debug, Default)]
pub struct SessionHistoryStore {
    sessions: RwLock<HashMap<String, Vec<Message>>>,
}

impl SessionHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded for a session, oldest first
    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn append(&self, session_id: &str, message: Message) {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .push(message);
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
