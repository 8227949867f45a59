//! Vector store domain - documents, metadata and similarity search

mod document;
mod store;

pub use document::{Document, DocumentMetadata, StoredRecord};
pub use store::VectorStore;
