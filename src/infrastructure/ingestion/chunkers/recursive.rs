//! Recursive character chunking strategy
//!
//! Splits on the first separator present in the text, keeps each separator
//! attached to the piece that follows it, merges small pieces back together
//! up to `chunk_size` with `chunk_overlap` carried between chunks, and recurses
//! with the remaining separators into any piece that is still too large.

use std::collections::VecDeque;

use crate::domain::ingestion::{Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy};
use crate::domain::DomainError;

/// Chunking strategy that splits on progressively finer separators
#[derive(Debug, Clone, Default)]
pub struct RecursiveChunker;

impl RecursiveChunker {
    pub fn new() -> Self {
        Self
    }

    fn char_len(text: &str) -> usize {
        text.chars().count()
    }

    /// Split keeping each separator at the start of the following piece
    fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
        if separator.is_empty() {
            return text.chars().map(String::from).collect();
        }

        let mut pieces = Vec::new();
        let mut start = 0;

        for (pos, _) in text.match_indices(separator) {
            if pos > start {
                pieces.push(text[start..pos].to_string());
            }
            start = pos;
        }
        if start < text.len() {
            pieces.push(text[start..].to_string());
        }

        pieces.retain(|p| !p.is_empty());
        pieces
    }

    fn split_text(text: &str, separators: &[String], config: &ChunkingConfig) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];

        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut small = Vec::new();

        for piece in Self::split_keeping_separator(text, separator) {
            if Self::char_len(&piece) < config.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                chunks.extend(Self::merge_pieces(&small, config));
                small.clear();
            }

            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(Self::split_text(&piece, remaining, config));
            }
        }

        if !small.is_empty() {
            chunks.extend(Self::merge_pieces(&small, config));
        }

        chunks
    }

    /// Greedily join pieces into chunks of at most `chunk_size`, starting
    /// each new chunk with up to `chunk_overlap` trailing characters of the
    /// previous one
    fn merge_pieces(pieces: &[String], config: &ChunkingConfig) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = Self::char_len(piece);

            if total + len > config.chunk_size && !window.is_empty() {
                Self::push_joined(&mut chunks, &window);

                while total > config.chunk_overlap
                    || (total + len > config.chunk_size && total > 0)
                {
                    match window.pop_front() {
                        Some(first) => total -= Self::char_len(first),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        Self::push_joined(&mut chunks, &window);
        chunks
    }

    fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>) {
        let joined: String = window.iter().copied().collect();
        let trimmed = joined.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
    }
}

impl ChunkingStrategy for RecursiveChunker {
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, DomainError> {
        config.validate()?;

        if content.trim().is_empty() {
            return Ok(vec![]);
        }

        let texts = Self::split_text(content, &config.separators, config);
        let total = texts.len();

        Ok(texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk::new(text, ChunkMetadata::new(i, total)))
            .collect())
    }

    fn name(&self) -> &'static str {
        "recursive"
    }
}
