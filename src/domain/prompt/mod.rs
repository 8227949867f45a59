//! Prompt management domain - chat prompt templates and the prompt hub

mod commit;
mod defaults;
mod hub;
mod template;

pub use commit::{PromptCommit, PromptModel, PromptRef, LATEST_TAG};
pub use defaults::{
    default_prompt, default_prompt_commit, DEFAULT_PROMPT_DESCRIPTION, DEFAULT_PROMPT_NAME,
    SYSTEM_TEMPLATE,
};
pub use hub::{PromptHub, PushOutcome};
pub use template::{ChatPromptTemplate, PromptMessage, PromptTemplate, PromptValues, TemplateError};

#[cfg(test)]
pub use hub::MockPromptHub;
