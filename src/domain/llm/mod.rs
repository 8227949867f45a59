//! LLM provider domain models and traits

mod message;
mod provider;
mod request;
mod response;
mod tool;

pub use message::{Message, MessageRole};
pub use provider::{LlmProvider, LlmStream};
pub use request::{JsonSchemaFormat, LlmRequest, LlmRequestBuilder, ResponseFormat};
pub use response::{FinishReason, LlmResponse, StreamChunk, Usage};
pub use tool::{ToolCall, ToolDefinition};

#[cfg(test)]
pub use provider::mock::MockLlmProvider;
