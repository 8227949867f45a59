//! Document ingestion domain types
//!
//! - `ChunkingStrategy` splits document text into chunks
//! - `SourceDocument` derives source, category and title for a docs file

pub mod chunker;
pub mod source;

pub use chunker::{Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy, MARKDOWN_SEPARATORS};
pub use source::{derive_category, extract_title, SourceDocument, GENERAL_CATEGORY};
