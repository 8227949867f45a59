//! RAG orchestration

mod pipeline;

pub use pipeline::{RagConfig, RagPipeline, INTERNAL_ERROR_MESSAGE};
