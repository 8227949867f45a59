//! Chat request and response bodies

use serde::{Deserialize, Serialize};

use crate::domain::rag::ChatMetadata;

pub use crate::domain::rag::{ChatResponse, SourceCitation};

/// Body of `POST /api/chat` and `POST /api/chat/stream`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub metadata: ChatMetadata,
}

impl ChatRequest {
    /// The question, rejecting empty or whitespace-only input
    pub fn validated_question(&self) -> Option<&str> {
        (!self.question.trim().is_empty()).then_some(self.question.as_str())
    }
}
