//! Domain layer - Core business logic and entities

pub mod embedding;
pub mod error;
pub mod evaluation;
pub mod ingestion;
pub mod llm;
pub mod prompt;
pub mod rag;
pub mod session;
pub mod tracking;
pub mod vector_store;

pub use embedding::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
pub use error::DomainError;
pub use llm::{
    FinishReason, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, LlmStream, Message,
    MessageRole, StreamChunk, ToolCall, ToolDefinition, Usage,
};
pub use prompt::{ChatPromptTemplate, PromptCommit, PromptHub, PromptModel, PromptRef};
pub use rag::{ChatEvent, ChatMetadata, ChatResponse, SourceCitation};
pub use session::SessionHistoryStore;
pub use tracking::TrackingClient;
pub use vector_store::{Document, DocumentMetadata, VectorStore};
