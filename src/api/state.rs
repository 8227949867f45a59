//! Application state shared by the handlers

use std::sync::Arc;

use crate::infrastructure::rag::RagPipeline;

#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self { pipeline }
    }
}
