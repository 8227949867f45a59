//! Vector store implementations

mod in_memory;
mod local;

pub use in_memory::InMemoryVectorStore;
pub use local::LocalVectorStore;

use std::sync::Arc;

use crate::domain::embedding::{cosine_similarity, EmbeddingProvider, EmbeddingRequest};
use crate::domain::vector_store::{Document, StoredRecord};
use crate::domain::DomainError;

/// Maximum number of texts sent in one embedding request
const EMBED_BATCH_SIZE: usize = 100;

/// Embed documents in batches, pairing each with its vector
async fn embed_documents(
    embedder: &Arc<dyn EmbeddingProvider>,
    model: &str,
    documents: Vec<Document>,
) -> Result<Vec<StoredRecord>, DomainError> {
    let mut records = Vec::with_capacity(documents.len());

    for batch in documents.chunks(EMBED_BATCH_SIZE) {
        let input = batch.iter().map(|d| d.content.clone()).collect();
        let vectors = embedder
            .embed(EmbeddingRequest::new(model, input))
            .await?
            .into_vectors();

        if vectors.len() != batch.len() {
            return Err(DomainError::provider(
                embedder.provider_name(),
                format!("Expected {} embeddings, got {}", batch.len(), vectors.len()),
            ));
        }

        records.extend(
            batch
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(document, embedding)| StoredRecord {
                    document,
                    embedding,
                }),
        );
    }

    Ok(records)
}

/// Top `k` documents by cosine similarity to `query`, best first
fn rank_records(records: &[StoredRecord], query: &[f32], k: usize) -> Vec<Document> {
    let mut scored: Vec<(f32, &StoredRecord)> = records
        .iter()
        .map(|r| (cosine_similarity(query, &r.embedding), r))
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    scored
        .into_iter()
        .take(k)
        .map(|(_, r)| r.document.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, embedding: Vec<f32>) -> StoredRecord {
        StoredRecord {
            document: Document::new(id, id),
            embedding,
        }
    }

    #[test]
    fn test_rank_records_orders_by_similarity() {
        let records = vec![
            record("orthogonal", vec![0.0, 1.0]),
            record("exact", vec![1.0, 0.0]),
            record("close", vec![0.9, 0.1]),
        ];

        let ranked = rank_records(&records, &[1.0, 0.0], 2);
        let ids: Vec<&str> = ranked.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "close"]);
    }

    #[test]
    fn test_rank_records_k_larger_than_collection() {
        let records = vec![record("a", vec![1.0])];
        assert_eq!(rank_records(&records, &[1.0], 4).len(), 1);
        assert!(rank_records(&[], &[1.0], 4).is_empty());
    }
}
