//! Ingest command - rebuilds the vector store from markdown docs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::Args;
use tracing::info;

use crate::build_services;
use crate::config::AppConfig;
use crate::domain::ingestion::ChunkingConfig;
use crate::infrastructure::ingestion::{IngestionPipeline, RecursiveChunker};
use crate::infrastructure::vector_store::LocalVectorStore;

#[derive(Args, Clone, Debug)]
pub struct IngestArgs {
    /// Docs directory, overriding `ingest.docs_dir`
    #[arg(long)]
    pub docs_dir: Option<PathBuf>,
}

pub async fn run(config: AppConfig, args: IngestArgs) -> anyhow::Result<()> {
    let services = build_services(&config)?;
    let docs_dir = args.docs_dir.unwrap_or(config.ingest.docs_dir);

    let store = LocalVectorStore::create(
        config.vector_store.persist_dir.clone(),
        config.vector_store.collection.clone(),
        services.embedder.clone(),
        config.llm.embedding_model.clone(),
    )
    .await?;

    let chunking = ChunkingConfig::new(config.rag.chunk_size, config.rag.chunk_overlap);
    let pipeline = IngestionPipeline::new(Arc::new(store), Arc::new(RecursiveChunker::new()), chunking);

    let report = pipeline.run(&docs_dir).await?;
    if report.verified != report.chunks {
        bail!(
            "Verification failed: stored {} vectors for {} chunks",
            report.verified,
            report.chunks
        );
    }

    info!(
        documents = report.documents,
        chunks = report.chunks,
        persist_dir = %config.vector_store.persist_dir.display(),
        "Done. Vector store is ready"
    );
    Ok(())
}
