//! Data types for documents, chunks, and search results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding the path a document was loaded from.
pub const SOURCE_KEY: &str = "source";

/// Metadata key holding the lowercase file extension a document was parsed as.
pub const FILE_TYPE_KEY: &str = "file_type";

/// Metadata key holding the page count of PDF documents.
pub const PAGE_COUNT_KEY: &str = "page_count";

/// Metadata carried by documents and inherited by their chunks.
pub type Metadata = BTreeMap<String, String>;

/// The text of one loaded file plus where it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawDocument {
    /// The extracted text content.
    pub text: String,
    /// Source metadata. Always contains [`SOURCE_KEY`].
    pub metadata: Metadata,
}

impl RawDocument {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.to_string(), source.into());
        Self { text: text.into(), metadata }
    }

    /// The `source` metadata value, or `"Unknown"`.
    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map(String::as_str).unwrap_or("Unknown")
    }
}

/// A bounded substring of a [`RawDocument`], the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The text content of the chunk.
    pub text: String,
    /// Character offset of the chunk's first character in the parent text.
    pub start_offset: usize,
    /// Position of this chunk among its parent's chunks.
    pub chunk_index: usize,
    /// Metadata inherited from the parent document.
    pub metadata: Metadata,
}

impl Chunk {
    /// The `source` metadata value, or `"Unknown"`.
    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map(String::as_str).unwrap_or("Unknown")
    }

    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The index id the chunk is stored under.
    pub id: u64,
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Similarity or rerank relevance score (higher is more relevant).
    pub score: f32,
}
