//! Directory-backed vector store
//!
//! Each collection is one JSON file, `<dir>/<collection>.json`, holding every
//! record with its embedding. Searches are brute-force cosine similarity over
//! the cached records; the cache reloads when the file changes on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{embed_documents, rank_records};
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::vector_store::{Document, DocumentMetadata, StoredRecord, VectorStore};
use crate::domain::DomainError;

#[derive(Debug, Serialize, Deserialize)]
struct CollectionFile {
    collection: String,
    embedding_model: String,
    records: Vec<StoredRecord>,
}

#[derive(Debug)]
struct CachedCollection {
    modified: Option<SystemTime>,
    records: Arc<Vec<StoredRecord>>,
}

/// Vector store persisted under a local directory
#[derive(Debug)]
pub struct LocalVectorStore {
    dir: PathBuf,
    collection: String,
    embedder: Arc<dyn EmbeddingProvider>,
    model: String,
    cache: RwLock<Option<CachedCollection>>,
}

impl LocalVectorStore {
    /// Handle on a store; the directory is checked on each operation
    pub fn new(
        dir: impl Into<PathBuf>,
        collection: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            collection: collection.into(),
            embedder,
            model: model.into(),
            cache: RwLock::new(None),
        }
    }

    /// Like [`LocalVectorStore::new`], creating the directory if needed
    pub async fn create(
        dir: impl Into<PathBuf>,
        collection: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
        model: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let store = Self::new(dir, collection, embedder, model);
        tokio::fs::create_dir_all(&store.dir).await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to create vector store directory {}: {}",
                store.dir.display(),
                e
            ))
        })?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    fn collection_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.collection))
    }

    fn ensure_exists(&self) -> Result<(), DomainError> {
        if self.exists() {
            Ok(())
        } else {
            Err(DomainError::vector_store_not_found(self.dir.display()))
        }
    }

    async fn modified(path: &Path) -> Option<SystemTime> {
        tokio::fs::metadata(path).await.ok()?.modified().ok()
    }

    /// Current records, reloading from disk when the file changed
    async fn records(&self) -> Result<Arc<Vec<StoredRecord>>, DomainError> {
        self.ensure_exists()?;

        let path = self.collection_path();
        let modified = Self::modified(&path).await;

        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.modified == modified {
                return Ok(Arc::clone(&cached.records));
            }
        }

        let records = Arc::new(self.read_file(&path).await?);
        debug!(
            collection = %self.collection,
            records = records.len(),
            "Loaded vector store collection"
        );

        *self.cache.write().await = Some(CachedCollection {
            modified,
            records: Arc::clone(&records),
        });

        Ok(records)
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<StoredRecord>, DomainError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(DomainError::storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let file: CollectionFile = serde_json::from_slice(&bytes).map_err(|e| {
            DomainError::storage(format!("Corrupt collection file {}: {}", path.display(), e))
        })?;

        if file.embedding_model != self.model {
            warn!(
                collection = %self.collection,
                stored_model = %file.embedding_model,
                configured_model = %self.model,
                "Collection was embedded with a different model"
            );
        }

        Ok(file.records)
    }

    /// Write through a temporary file so readers never see a partial file
    async fn write_file(&self, records: Vec<StoredRecord>) -> Result<(), DomainError> {
        let path = self.collection_path();
        let tmp = path.with_extension("json.tmp");
        let file = CollectionFile {
            collection: self.collection.clone(),
            embedding_model: self.model.clone(),
            records,
        };

        let bytes = serde_json::to_vec(&file)
            .map_err(|e| DomainError::storage(format!("Failed to encode collection: {}", e)))?;

        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            DomainError::storage(format!("Failed to replace {}: {}", path.display(), e))
        })?;

        *self.cache.write().await = None;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>, DomainError> {
        let records = self.records().await?;
        let query = self.embedder.embed_query(&self.model, query).await?;

        Ok(rank_records(&records, &query, k))
    }

    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize, DomainError> {
        let existing = self.records().await?;
        let added = embed_documents(&self.embedder, &self.model, documents).await?;
        let count = added.len();

        let mut records = Vec::with_capacity(existing.len() + count);
        records.extend(existing.iter().cloned());
        records.extend(added);

        self.write_file(records).await?;
        Ok(count)
    }

    async fn all_metadata(&self) -> Result<Vec<DocumentMetadata>, DomainError> {
        Ok(self
            .records()
            .await?
            .iter()
            .map(|r| r.document.metadata.clone())
            .collect())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.records().await?.len())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.ensure_exists()?;

        let path = self.collection_path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(DomainError::storage(format!(
                    "Failed to remove {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        *self.cache.write().await = None;
        Ok(())
    }
}
