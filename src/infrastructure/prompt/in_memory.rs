//! In-memory prompt hub used when no tracking service is configured

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::prompt::{
    default_prompt_commit, PromptCommit, PromptHub, PromptRef, PushOutcome, DEFAULT_PROMPT_NAME,
    LATEST_TAG,
};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct PromptEntry {
    commits: Vec<PromptCommit>,
    /// Tag to index into `commits`
    tags: HashMap<String, usize>,
}

/// Process-local prompt registry
#[derive(Debug)]
pub struct InMemoryPromptHub {
    prompts: RwLock<HashMap<String, PromptEntry>>,
}

impl InMemoryPromptHub {
    pub fn new() -> Self {
        Self {
            prompts: RwLock::new(HashMap::new()),
        }
    }

    /// Hub holding the default QA prompt, tagged both `latest` and `tag`
    pub fn with_default_prompt(model: &str, tag: &str) -> Self {
        Self::with_default_prompt_as(DEFAULT_PROMPT_NAME, model, tag)
    }

    /// Like [`InMemoryPromptHub::with_default_prompt`], registered under `name`
    pub fn with_default_prompt_as(name: &str, model: &str, tag: &str) -> Self {
        let hub = Self::new();
        {
            let mut prompts = hub.prompts.write().unwrap_or_else(|e| e.into_inner());
            let mut entry = PromptEntry::default();
            entry.commits.push(default_prompt_commit(model));
            entry.tags.insert(LATEST_TAG.to_string(), 0);
            entry.tags.insert(tag.to_string(), 0);
            prompts.insert(name.to_string(), entry);
        }
        hub
    }
}

impl Default for InMemoryPromptHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PromptHub for InMemoryPromptHub {
    async fn pull(&self, reference: &PromptRef) -> Result<PromptCommit, DomainError> {
        let prompts = self
            .prompts
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        prompts
            .get(&reference.name)
            .and_then(|entry| {
                entry
                    .tags
                    .get(&reference.tag)
                    .and_then(|i| entry.commits.get(*i))
            })
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("Prompt '{}' not found", reference)))
    }

    async fn push(
        &self,
        name: &str,
        commit: PromptCommit,
        tags: Vec<String>,
    ) -> Result<PushOutcome, DomainError> {
        let mut prompts = self
            .prompts
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        let entry = prompts.entry(name.to_string()).or_default();
        let latest = entry.tags.get(LATEST_TAG).and_then(|i| entry.commits.get(*i));

        if latest == Some(&commit) {
            debug!(prompt = %name, "Prompt unchanged");
            return Ok(PushOutcome::Unchanged);
        }

        entry.commits.push(commit);
        let index = entry.commits.len() - 1;
        entry.tags.insert(LATEST_TAG.to_string(), index);
        for tag in tags {
            entry.tags.insert(tag, index);
        }

        debug!(prompt = %name, version = index + 1, "Prompt committed");
        Ok(PushOutcome::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MessageRole;
    use crate::domain::prompt::ChatPromptTemplate;

    #[tokio::test]
    async fn test_default_prompt_available_under_both_tags() {
        let hub = InMemoryPromptHub::with_default_prompt("gpt-4o-mini", "prod");

        let prod = hub
            .pull(&PromptRef::new(DEFAULT_PROMPT_NAME, "prod"))
            .await
            .unwrap();
        let latest = hub.pull(&PromptRef::latest(DEFAULT_PROMPT_NAME)).await.unwrap();

        assert_eq!(prod, latest);
        assert_eq!(prod.model_or("other").model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_pull_unknown_tag() {
        let hub = InMemoryPromptHub::with_default_prompt("gpt-4o-mini", "prod");
        let result = hub.pull(&PromptRef::new(DEFAULT_PROMPT_NAME, "staging")).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_push_identical_commit_is_unchanged() {
        let hub = InMemoryPromptHub::with_default_prompt("gpt-4o-mini", "prod");

        let outcome = hub
            .push(DEFAULT_PROMPT_NAME, default_prompt_commit("gpt-4o-mini"), vec![])
            .await
            .unwrap();
        assert_eq!(outcome, PushOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_push_moves_tags() {
        let hub = InMemoryPromptHub::new();
        let v1 = PromptCommit::new(
            ChatPromptTemplate::new().with_message(MessageRole::System, "v1 {question}"),
        );
        let v2 = PromptCommit::new(
            ChatPromptTemplate::new().with_message(MessageRole::System, "v2 {question}"),
        );

        hub.push("qa", v1.clone(), vec!["prod".to_string()]).await.unwrap();
        let outcome = hub.push("qa", v2.clone(), vec![]).await.unwrap();

        assert_eq!(outcome, PushOutcome::Created);
        assert_eq!(hub.pull(&PromptRef::latest("qa")).await.unwrap(), v2);
        assert_eq!(hub.pull(&PromptRef::new("qa", "prod")).await.unwrap(), v1);
    }

    #[tokio::test]
    async fn test_default_prompt_under_custom_name() {
        let hub = InMemoryPromptHub::with_default_prompt_as("team-qa", "gpt-4o-mini", "staging");
        assert!(hub.pull(&PromptRef::new("team-qa", "staging")).await.is_ok());
        assert!(hub.pull(&PromptRef::latest(DEFAULT_PROMPT_NAME)).await.is_err());
    }
}
