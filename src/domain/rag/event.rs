use serde::{Deserialize, Serialize};

/// A document an answer was drawn from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub file: String,
    pub snippet: String,
}

/// Event emitted by the streaming pipeline.
///
/// Serialized as `{"type": "...", "content": ...}`; `done` carries no content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum ChatEvent {
    Token(String),
    Sources(Vec<SourceCitation>),
    Error(String),
    Done,
}

impl ChatEvent {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// A complete, non-streamed answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<SourceCitation>,
}
