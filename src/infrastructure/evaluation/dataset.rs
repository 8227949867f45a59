//! Golden dataset generation and persistence

use std::path::Path;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::info;

use crate::domain::evaluation::{synthesis_prompt, GoldenExample};
use crate::domain::llm::{LlmProvider, LlmRequest};
use crate::domain::prompt::{PromptHub, PromptRef, PromptValues};
use crate::domain::rag::format_context;
use crate::domain::vector_store::VectorStore;
use crate::domain::DomainError;

/// Settings for building reference answers
#[derive(Debug, Clone)]
pub struct DatasetGeneratorConfig {
    /// Model used for sampling and synthesis, always at temperature 0
    pub model: String,
    pub prompt_name: String,
    pub retriever_k: usize,
    /// Independent answers sampled per question
    pub samples: usize,
}

/// Builds golden examples by sampling several answers per question and
/// synthesizing them into one reference answer
pub struct DatasetGenerator {
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn VectorStore>,
    hub: Arc<dyn PromptHub>,
    config: DatasetGeneratorConfig,
}

impl DatasetGenerator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStore>,
        hub: Arc<dyn PromptHub>,
        config: DatasetGeneratorConfig,
    ) -> Self {
        Self {
            llm,
            store,
            hub,
            config,
        }
    }

    pub async fn generate(&self, questions: &[&str]) -> Result<Vec<GoldenExample>, DomainError> {
        let commit = self
            .hub
            .pull(&PromptRef::latest(&self.config.prompt_name))
            .await?;

        let mut examples = Vec::with_capacity(questions.len());
        for (i, question) in questions.iter().enumerate() {
            info!(index = i + 1, total = questions.len(), question = %question, "Generating example");

            let documents = self
                .store
                .similarity_search(question, self.config.retriever_k)
                .await?;
            let context = format_context(&documents);

            let messages = commit.template.format_messages(
                &PromptValues::new()
                    .var("context", context.clone())
                    .var("question", *question)
                    .messages("history", Vec::new()),
            )?;

            // The commit's own model settings are ignored here
            let sample_requests = (0..self.config.samples).map(|_| {
                let request = LlmRequest::builder()
                    .messages(messages.clone())
                    .temperature(0.0)
                    .build();
                self.llm.chat(&self.config.model, request)
            });
            let samples: Vec<String> = try_join_all(sample_requests)
                .await?
                .into_iter()
                .map(|r| r.content().to_string())
                .collect();

            let synthesis = LlmRequest::builder()
                .user(synthesis_prompt(question, &samples)?)
                .temperature(0.0)
                .build();
            let reference = self.llm.chat(&self.config.model, synthesis).await?;

            examples.push(GoldenExample::new(*question, context, reference.content()));
        }

        Ok(examples)
    }
}

/// Write examples as a pretty-printed JSON array, creating parent directories
pub async fn write_examples(path: &Path, examples: &[GoldenExample]) -> Result<(), DomainError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            DomainError::storage(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    let json = serde_json::to_string_pretty(examples)
        .map_err(|e| DomainError::internal(format!("Failed to serialize examples: {}", e)))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to write {}: {}", path.display(), e)))
}

pub async fn read_examples(path: &Path) -> Result<Vec<GoldenExample>, DomainError> {
    let json = tokio::fs::read_to_string(path).await.map_err(|e| {
        DomainError::not_found(format!("Dataset file {} not readable: {}", path.display(), e))
    })?;

    serde_json::from_str(&json).map_err(|e| {
        DomainError::validation(format!("Invalid dataset file {}: {}", path.display(), e))
    })
}
