//! The built-in NovaPay documentation QA prompt

use super::{ChatPromptTemplate, PromptCommit, PromptModel};
use crate::domain::llm::MessageRole;

pub const DEFAULT_PROMPT_NAME: &str = "novapay-qa-prompt";

pub const DEFAULT_PROMPT_DESCRIPTION: &str = "NovaPay internal docs QA prompt - answers strictly from provided context with source citations.";

pub const SYSTEM_TEMPLATE: &str = "You are NovaPay's internal documentation assistant. Answer questions using ONLY the provided context.

Rules:
- Always cite which document(s) your answer comes from by referencing the source filename
- If the context doesn't contain enough information, say \"I don't have documentation on that topic\" - do NOT make up information
- if there is conflicting information on some of the numbers, give both of the numbers and let the user decide for themselves and flag it.


Context: {context}

Question: {question}";

/// System template followed by an optional `history` placeholder
pub fn default_prompt() -> ChatPromptTemplate {
    ChatPromptTemplate::new()
        .with_message(MessageRole::System, SYSTEM_TEMPLATE)
        .with_placeholder("history", true)
}

/// The default prompt bundled with its model settings
pub fn default_prompt_commit(model: &str) -> PromptCommit {
    PromptCommit::new(default_prompt())
        .with_model(PromptModel::new(model).with_temperature(0.0))
        .with_description(DEFAULT_PROMPT_DESCRIPTION)
}
