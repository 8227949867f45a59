//! Markdown docs loader

use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::domain::ingestion::SourceDocument;
use crate::domain::DomainError;

/// Load every `*.md` file under `docs_dir`, recursively, sorted by path
pub async fn load_markdown_dir(docs_dir: &Path) -> Result<Vec<SourceDocument>, DomainError> {
    if !docs_dir.is_dir() {
        return Err(DomainError::not_found(format!(
            "docs directory not found at {}",
            docs_dir.display()
        )));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(docs_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            DomainError::storage(format!("Failed to walk {}: {}", docs_dir.display(), e))
        })?;

        let is_markdown = entry.path().extension().is_some_and(|ext| ext == "md");
        if entry.file_type().is_file() && is_markdown {
            paths.push(entry.into_path());
        }
    }

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            DomainError::storage(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let relative = path.strip_prefix(docs_dir).map_err(|e| {
            DomainError::internal(format!("{} is outside the docs dir: {}", path.display(), e))
        })?;

        let document = SourceDocument::from_relative_path(relative, content);
        debug!(source = %document.source, category = %document.category, "Loaded document");
        documents.push(document);
    }

    Ok(documents)
}
