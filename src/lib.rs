//! NovaPay Docs Q&A
//!
//! Retrieval-augmented question answering over NovaPay's engineering docs:
//! - Streaming chat API with per-session history and source citations
//! - Markdown ingestion into a local vector store
//! - Prompt hub and tracking-service integration
//! - Golden dataset generation and LLM-as-judge experiments

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use domain::embedding::EmbeddingProvider;
use domain::llm::LlmProvider;
use domain::prompt::{PromptHub, PromptRef};
use domain::session::SessionHistoryStore;
use domain::tracking::{RunTracer, TrackingClient};
use domain::vector_store::VectorStore;
use infrastructure::embedding::OpenAiEmbeddingProvider;
use infrastructure::http_client::HttpClient;
use infrastructure::llm::OpenAiProvider;
use infrastructure::prompt::InMemoryPromptHub;
use infrastructure::rag::{RagConfig, RagPipeline};
use infrastructure::tracking::HttpTrackingClient;
use infrastructure::vector_store::LocalVectorStore;

/// Clients shared by the server and the CLI commands
#[derive(Clone)]
pub struct Services {
    pub llm: Arc<dyn LlmProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub store: Arc<LocalVectorStore>,
    pub hub: Arc<dyn PromptHub>,
    /// Present when a tracking API key is configured
    pub tracking: Option<Arc<dyn TrackingClient>>,
    /// Posts pipeline runs to `tracking.project`, alongside `tracking`
    pub tracer: Option<Arc<dyn RunTracer>>,
}

/// Build the OpenAI, vector store and tracking clients from configuration
pub fn build_services(config: &AppConfig) -> anyhow::Result<Services> {
    let api_key = config
        .llm
        .api_key
        .clone()
        .context("OPENAI_API_KEY is not set")?;
    let http = HttpClient::with_timeout(Duration::from_secs(config.llm.timeout_secs))?;

    let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::with_base_url(
        http.clone(),
        api_key.clone(),
        config.llm.base_url.clone(),
    ));
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OpenAiEmbeddingProvider::with_base_url(
        http.clone(),
        api_key,
        config.llm.base_url.clone(),
    ));

    let store = Arc::new(LocalVectorStore::new(
        config.vector_store.persist_dir.clone(),
        config.vector_store.collection.clone(),
        embedder.clone(),
        config.llm.embedding_model.clone(),
    ));

    let (hub, tracking, tracer): (
        Arc<dyn PromptHub>,
        Option<Arc<dyn TrackingClient>>,
        Option<Arc<dyn RunTracer>>,
    ) = match &config.tracking.api_key {
        Some(key) => {
            let client = Arc::new(
                HttpTrackingClient::new(http, key.clone(), config.tracking.api_url.clone())
                    .with_project(config.tracking.project.clone()),
            );
            info!(
                url = %config.tracking.api_url,
                project = %config.tracking.project,
                "Using tracking service prompt hub and run tracing"
            );
            let hub: Arc<dyn PromptHub> = client.clone();
            let tracking: Arc<dyn TrackingClient> = client.clone();
            let tracer: Arc<dyn RunTracer> = client;
            (hub, Some(tracking), Some(tracer))
        }
        None => {
            info!("No tracking API key configured, using the built-in prompt");
            (
                Arc::new(InMemoryPromptHub::with_default_prompt_as(
                    &config.prompt.name,
                    &config.llm.model,
                    &config.prompt.tag,
                )),
                None,
                None,
            )
        }
    };

    Ok(Services {
        llm,
        embedder,
        store,
        hub,
        tracking,
        tracer,
    })
}

/// The RAG pipeline configured from `config`
pub fn build_pipeline(config: &AppConfig, services: &Services) -> RagPipeline {
    let store: Arc<dyn VectorStore> = services.store.clone();

    let pipeline = RagPipeline::new(
        services.llm.clone(),
        store,
        services.hub.clone(),
        Arc::new(SessionHistoryStore::new()),
        RagConfig {
            model: config.llm.model.clone(),
            retriever_k: config.rag.retriever_k,
            prompt: PromptRef::new(&config.prompt.name, &config.prompt.tag),
        },
    );

    match &services.tracer {
        Some(tracer) => pipeline.with_tracer(tracer.clone()),
        None => pipeline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_services_requires_api_key() {
        let config = AppConfig::default();
        let err = build_services(&config).err().unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn test_local_prompt_hub_without_tracking_key() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-test".to_string());

        let services = build_services(&config).unwrap();
        assert!(services.tracking.is_none());
        assert!(services.tracer.is_none());

        let commit = services
            .hub
            .pull(&PromptRef::new(&config.prompt.name, &config.prompt.tag))
            .await
            .unwrap();
        assert_eq!(commit.model_or("x").model, "gpt-4o-mini");
    }

    #[test]
    fn test_tracking_client_with_key() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-test".to_string());
        config.tracking.api_key = Some("ls-test".to_string());

        let services = build_services(&config).unwrap();
        assert!(services.tracking.is_some());
        assert!(services.tracer.is_some());

        let pipeline = build_pipeline(&config, &services);
        assert_eq!(pipeline.store().collection(), "novapay_docs");
    }
}
