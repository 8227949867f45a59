//! Prompt hub trait

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::{PromptCommit, PromptRef};
use crate::domain::DomainError;

/// Result of pushing a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Created,
    /// The hub already holds an identical latest commit
    Unchanged,
}

/// Registry of versioned prompts addressed by `name:tag`
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PromptHub: Send + Sync {
    /// Fetch the commit a reference points at, including model settings
    async fn pull(&self, reference: &PromptRef) -> Result<PromptCommit, DomainError>;

    /// Store a new commit under `name` and point each tag at it
    async fn push(
        &self,
        name: &str,
        commit: PromptCommit,
        tags: Vec<String>,
    ) -> Result<PushOutcome, DomainError>;
}
