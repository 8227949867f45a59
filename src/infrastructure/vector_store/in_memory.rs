//! In-memory vector store for development and testing

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{embed_documents, rank_records};
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::vector_store::{Document, DocumentMetadata, StoredRecord, VectorStore};
use crate::domain::DomainError;

/// Vector store holding records in process memory only
#[derive(Debug)]
pub struct InMemoryVectorStore {
    collection: String,
    embedder: Arc<dyn EmbeddingProvider>,
    model: String,
    records: RwLock<Vec<StoredRecord>>,
}

impl InMemoryVectorStore {
    pub fn new(
        collection: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            embedder,
            model: model.into(),
            records: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>, DomainError> {
        let query = self.embedder.embed_query(&self.model, query).await?;
        let records = self.records.read().await;

        Ok(rank_records(&records, &query, k))
    }

    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize, DomainError> {
        let records = embed_documents(&self.embedder, &self.model, documents).await?;
        let count = records.len();

        self.records.write().await.extend(records);
        Ok(count)
    }

    async fn all_metadata(&self) -> Result<Vec<DocumentMetadata>, DomainError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .map(|r| r.document.metadata.clone())
            .collect())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.records.read().await.len())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.records.write().await.clear();
        Ok(())
    }
}
