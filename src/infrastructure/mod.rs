//! Infrastructure layer - External service implementations

pub mod embedding;
pub mod evaluation;
pub mod http_client;
pub mod ingestion;
pub mod llm;
pub mod logging;
pub mod prompt;
pub mod rag;
pub mod tracking;
pub mod vector_store;
