//! Vector store trait

use std::fmt::Debug;

use async_trait::async_trait;

use super::{Document, DocumentMetadata};
use crate::domain::DomainError;

/// A collection of embedded documents supporting nearest-neighbour search.
///
/// Implementations own their embedding function: callers pass raw text and
/// the store embeds queries and documents itself.
#[async_trait]
pub trait VectorStore: Send + Sync + Debug {
    /// Name of the backing collection
    fn collection(&self) -> &str;

    /// Return the `k` documents most similar to `query`, best first
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>, DomainError>;

    /// Embed and store documents, returning how many were added
    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize, DomainError>;

    /// Metadata of every stored document
    async fn all_metadata(&self) -> Result<Vec<DocumentMetadata>, DomainError>;

    /// Number of stored documents
    async fn count(&self) -> Result<usize, DomainError>;

    /// Remove every document from the collection
    async fn clear(&self) -> Result<(), DomainError>;
}
