//! Turning retrieved documents into prompt context and citations

use std::collections::HashSet;

use super::SourceCitation;
use crate::domain::vector_store::Document;

/// Maximum snippet length, in characters
pub const SNIPPET_CHARS: usize = 200;

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Render documents as numbered, source-labelled blocks
pub fn format_context(documents: &[Document]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| format!("[Document {}: {}]\n{}", i + 1, doc.source(), doc.content))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// One citation per distinct source file, in retrieval order
pub fn extract_sources(documents: &[Document]) -> Vec<SourceCitation> {
    let mut seen = HashSet::new();

    documents
        .iter()
        .filter(|doc| seen.insert(doc.source()))
        .map(|doc| SourceCitation {
            file: doc.source().to_string(),
            snippet: snippet(&doc.content),
        })
        .collect()
}

fn snippet(content: &str) -> String {
    let truncated: String = content.chars().take(SNIPPET_CHARS).collect();
    let mut snippet = truncated.trim().to_string();
    if content.chars().count() > SNIPPET_CHARS {
        snippet.push_str("...");
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vector_store::DocumentMetadata;

    fn doc(source: Option<&str>, content: &str) -> Document {
        let metadata = match source {
            Some(source) => DocumentMetadata::new().with_source(source),
            None => DocumentMetadata::new(),
        };
        Document::new(uuid::Uuid::new_v4().to_string(), content).with_metadata(metadata)
    }

    #[test]
    fn test_format_context() {
        let docs = vec![
            doc(Some("api/payments.md"), "Rate limit is 100 rps"),
            doc(None, "Orphan chunk"),
        ];

        assert_eq!(
            format_context(&docs),
            "[Document 1: api/payments.md]\nRate limit is 100 rps\n\n---\n\n[Document 2: unknown]\nOrphan chunk"
        );
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn test_sources_deduplicated_first_wins() {
        let docs = vec![
            doc(Some("a.md"), "first a"),
            doc(Some("b.md"), "first b"),
            doc(Some("a.md"), "second a"),
        ];

        let sources = extract_sources(&docs);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].file, "a.md");
        assert_eq!(sources[0].snippet, "first a");
        assert_eq!(sources[1].file, "b.md");
    }

    #[test]
    fn test_snippet_truncated_with_ellipsis() {
        let long = "x".repeat(250);
        let sources = extract_sources(&[doc(Some("long.md"), &long)]);
        assert_eq!(sources[0].snippet, format!("{}...", "x".repeat(200)));

        let exact = "y".repeat(200);
        let sources = extract_sources(&[doc(Some("exact.md"), &exact)]);
        assert_eq!(sources[0].snippet, exact);
    }

    #[test]
    fn test_snippet_trims_whitespace_and_counts_chars() {
        let sources = extract_sources(&[doc(Some("a.md"), "\n  Payments  \n")]);
        assert_eq!(sources[0].snippet, "Payments");

        let accented = "é".repeat(201);
        let sources = extract_sources(&[doc(Some("b.md"), &accented)]);
        assert_eq!(sources[0].snippet, format!("{}...", "é".repeat(200)));
    }
}
