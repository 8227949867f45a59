//! Document ingestion infrastructure
//!
//! Markdown loading, recursive chunking and the pipeline that rebuilds the
//! vector store collection.

pub mod chunkers;
mod loader;
pub mod pipeline;

pub use chunkers::RecursiveChunker;
pub use loader::load_markdown_dir;
pub use pipeline::{IngestionPipeline, IngestionReport};
