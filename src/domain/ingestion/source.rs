//! Metadata derived from a documentation file's location and content

use std::path::{Component, Path};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::vector_store::DocumentMetadata;

/// Category for files at the top of the docs directory
pub const GENERAL_CATEGORY: &str = "general";

static HEADING_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#\s+(.+)$").expect("valid heading pattern"));

/// A loaded documentation file with derived metadata
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    /// Path relative to the docs root, `/`-separated
    pub source: String,
    pub category: String,
    pub title: String,
    pub content: String,
}

impl SourceDocument {
    /// Build from a path relative to the docs root and the file content
    pub fn from_relative_path(relative: &Path, content: impl Into<String>) -> Self {
        let content = content.into();
        let components: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let source = components.join("/");
        let file_name = components.last().cloned().unwrap_or_default();

        Self {
            category: derive_category(&source),
            title: extract_title(&content, &file_name),
            source,
            content,
        }
    }

    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata::new()
            .with_source(&self.source)
            .with_category(&self.category)
            .with_title(&self.title)
    }
}

/// First path component of a nested source, `general` for top-level files
pub fn derive_category(source: &str) -> String {
    match source.split_once('/') {
        Some((first, _)) => first.to_string(),
        None => GENERAL_CATEGORY.to_string(),
    }
}

/// First `# ` heading, else the file name without `.md`, dashes as spaces,
/// in title case
pub fn extract_title(content: &str, file_name: &str) -> String {
    if let Some(captures) = HEADING_PATTERN.captures(content) {
        return captures[1].trim().to_string();
    }

    title_case(&file_name.replace(".md", "").replace('-', " "))
}

/// Uppercase letters that start a word, lowercase the rest
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;

    for c in text.chars() {
        if prev_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_alpha = c.is_alphabetic();
    }

    out
}
