//! Ingestion pipeline: load, chunk, embed and store documentation

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::loader::load_markdown_dir;
use crate::domain::ingestion::{ChunkingConfig, ChunkingStrategy, SourceDocument};
use crate::domain::vector_store::{Document, VectorStore};
use crate::domain::DomainError;

/// Counts reported after an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionReport {
    pub documents: usize,
    pub chunks: usize,
    /// Records in the collection after storing, read back from the store
    pub verified: usize,
}

/// Rebuilds a vector store collection from a docs directory
#[derive(Debug)]
pub struct IngestionPipeline {
    store: Arc<dyn VectorStore>,
    chunker: Arc<dyn ChunkingStrategy>,
    config: ChunkingConfig,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn VectorStore>,
        chunker: Arc<dyn ChunkingStrategy>,
        config: ChunkingConfig,
    ) -> Self {
        Self {
            store,
            chunker,
            config,
        }
    }

    /// Split source documents into chunk documents carrying the source metadata
    pub fn split(&self, sources: &[SourceDocument]) -> Result<Vec<Document>, DomainError> {
        let mut documents = Vec::new();

        for source in sources {
            for chunk in self.chunker.chunk(&source.content, &self.config)? {
                let metadata = source
                    .metadata()
                    .with_extra("chunk_index", chunk.metadata.chunk_index.into())
                    .with_extra("total_chunks", chunk.metadata.total_chunks.into());

                let id = format!("{}#{}", source.source, chunk.metadata.chunk_index);
                documents.push(Document::new(id, chunk.content).with_metadata(metadata));
            }
        }

        Ok(documents)
    }

    /// Replace the collection with the chunked contents of `docs_dir`
    pub async fn run(&self, docs_dir: &Path) -> Result<IngestionReport, DomainError> {
        info!(docs_dir = %docs_dir.display(), "Loading documents");
        let sources = load_markdown_dir(docs_dir).await?;
        info!(documents = sources.len(), "Loaded documents");

        let chunks = self.split(&sources)?;
        info!(
            chunks = chunks.len(),
            chunk_size = self.config.chunk_size,
            chunk_overlap = self.config.chunk_overlap,
            strategy = self.chunker.name(),
            "Split documents"
        );

        self.store.clear().await?;
        info!(collection = %self.store.collection(), "Cleared existing collection");

        let chunk_count = chunks.len();
        self.store.add_documents(chunks).await?;

        let verified = self.store.count().await?;
        info!(
            collection = %self.store.collection(),
            verified,
            "Ingestion complete"
        );

        Ok(IngestionReport {
            documents: sources.len(),
            chunks: chunk_count,
            verified,
        })
    }
}
