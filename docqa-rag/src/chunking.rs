//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! cuts text into overlapping windows of at most `chunk_size` characters,
//! preferring to end each window on the coarsest available separator
//! (paragraph break, then line break, then sentence end, then space, then any
//! character).
//!
//! Consecutive chunks of one document share exactly `chunk_overlap`
//! characters: each chunk after the first starts `chunk_overlap` characters
//! before the end of its predecessor. Dropping the first `chunk_overlap`
//! characters of every chunk but the first and concatenating the rest
//! reproduces the document text exactly.

use crate::config::RagConfig;
use crate::document::{Chunk, RawDocument};
use crate::error::{RagError, Result};

/// Separators tried in order when choosing where a chunk ends.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", " "];

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &RawDocument) -> Vec<Chunk>;

    /// Split every document, keeping document order.
    fn chunk_all(&self, documents: &[RawDocument]) -> Vec<Chunk> {
        documents.iter().flat_map(|document| self.chunk(document)).collect()
    }
}

/// Splits text into overlapping chunks that end on natural boundaries.
///
/// Sizes and offsets are counted in characters, not bytes.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` with [`DEFAULT_SEPARATORS`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] unless `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap >= chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Compute chunk boundaries as `(start, end)` character ranges.
    pub fn spans(&self, text: &str) -> Vec<(usize, usize)> {
        let offsets = char_offsets(text);
        let total = offsets.len() - 1;
        let mut spans = Vec::new();
        if total == 0 {
            return spans;
        }

        let mut start = 0;
        loop {
            if total - start <= self.chunk_size {
                spans.push((start, total));
                break;
            }
            let end = self.find_cut(text, &offsets, start, start + self.chunk_size);
            spans.push((start, end));
            start = end - self.chunk_overlap;
        }
        spans
    }

    /// Pick the end of the chunk starting at `start`, at most `limit`.
    ///
    /// A cut must leave more than `chunk_overlap` characters in the chunk so
    /// the next chunk starts strictly later.
    fn find_cut(&self, text: &str, offsets: &[usize], start: usize, limit: usize) -> usize {
        let window_start = offsets[start];
        let window = &text[window_start..offsets[limit]];

        for separator in &self.separators {
            let Some(pos) = window.rfind(separator.as_str()) else {
                continue;
            };
            let cut_byte = window_start + pos + separator.len();
            let Ok(cut) = offsets.binary_search(&cut_byte) else {
                continue;
            };
            if cut - start > self.chunk_overlap {
                return cut;
            }
        }
        limit
    }
}

/// Byte offset of every character, plus the text length as a final sentinel.
fn char_offsets(text: &str) -> Vec<usize> {
    text.char_indices().map(|(b, _)| b).chain(std::iter::once(text.len())).collect()
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &RawDocument) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }

        let offsets = char_offsets(&document.text);
        self.spans(&document.text)
            .into_iter()
            .enumerate()
            .map(|(i, (start, end))| Chunk {
                text: document.text[offsets[start]..offsets[end]].to_string(),
                start_offset: start,
                chunk_index: i,
                metadata: document.metadata.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> RawDocument {
        RawDocument::new(text, "docs/test.txt")
    }

    #[test]
    fn rejects_overlap_not_below_size() {
        assert!(RecursiveChunker::new(10, 10).is_err());
        assert!(RecursiveChunker::new(10, 9).is_ok());
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let chunker = RecursiveChunker::new(100, 20).unwrap();
        assert!(chunker.chunk(&doc("")).is_empty());
    }

    #[test]
    fn short_document_is_one_chunk() {
        let chunker = RecursiveChunker::new(1000, 200).unwrap();
        let chunks = chunker.chunk(&doc(&"x".repeat(50)));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].source(), "docs/test.txt");
    }

    #[test]
    fn text_without_separators_cuts_at_size() {
        let chunker = RecursiveChunker::new(1000, 200).unwrap();
        let spans = chunker.spans(&"a".repeat(1200));
        assert_eq!(spans, vec![(0, 1000), (800, 1200)]);
    }

    #[test]
    fn prefers_paragraph_break_over_space() {
        let text = "alpha beta gamma\n\ndelta epsilon zeta eta theta";
        let chunker = RecursiveChunker::new(30, 5).unwrap();
        let chunks = chunker.chunk(&doc(text));
        assert_eq!(chunks[0].text, "alpha beta gamma\n\n");
        assert_eq!(chunks[1].start_offset, chunks[0].char_len() - 5);
    }

    #[test]
    fn falls_back_to_space_when_paragraph_too_early() {
        // The only paragraph break would leave a chunk no longer than the overlap.
        let text = "ab\n\ncdefgh ijklmnop qrstuvwxyz";
        let chunker = RecursiveChunker::new(20, 5).unwrap();
        let chunks = chunker.chunk(&doc(text));
        assert_eq!(chunks[0].text, "ab\n\ncdefgh ijklmnop ");
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let text = "héllo wörld ünïcode tëxt";
        let chunker = RecursiveChunker::new(8, 2).unwrap();
        let chunks = chunker.chunk(&doc(text));
        for chunk in &chunks {
            assert!(chunk.char_len() <= 8);
            let expected: String =
                text.chars().skip(chunk.start_offset).take(chunk.char_len()).collect();
            assert_eq!(chunk.text, expected);
        }
    }

    #[test]
    fn chunk_indices_are_sequential_per_document() {
        let chunker = RecursiveChunker::new(10, 2).unwrap();
        let docs = vec![doc(&"a".repeat(25)), doc(&"b".repeat(5))];
        let chunks = chunker.chunk_all(&docs);
        let indices: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 0]);
    }
}
