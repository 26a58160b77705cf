//! Exact cosine-similarity index over embedded chunks, with JSON persistence.
//!
//! The index is built once from the full chunk set and saved as a unit to
//! `<dir>/index.json`. Loading restores the id → chunk mapping and vectors
//! exactly as saved, without calling the embedding provider.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::loader::SourceStamp;

/// File name of the persisted index inside its directory.
pub const INDEX_FILE: &str = "index.json";

const FORMAT_VERSION: u32 = 1;

/// One stored vector and the chunk it was computed from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct IndexEntry {
    id: u64,
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// How a persisted index was built.
///
/// Callers compare this against their current settings to decide whether a
/// saved index can be reused.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexManifest {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_model: String,
    /// Number of source documents the chunks came from.
    pub document_count: usize,
    /// The documents directory as it was when the index was built.
    #[serde(default)]
    pub sources: Vec<SourceStamp>,
}

/// An in-memory similarity index.
///
/// Ids are assigned in insertion order starting at zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    version: u32,
    manifest: IndexManifest,
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the result is not a
/// number.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a * norm_b);
    if similarity.is_nan() { 0.0 } else { similarity }
}

fn index_error(message: impl Into<String>) -> RagError {
    RagError::IndexError { message: message.into() }
}

impl VectorIndex {
    /// Create an empty index for vectors of the given dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, entries: Vec::new() }
    }

    /// Pair chunks with precomputed embeddings.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if the counts differ or any vector
    /// does not have `dimensions` components.
    pub fn from_embeddings(
        dimensions: usize,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            return Err(index_error(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut index = Self::new(dimensions);
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            index.push(chunk, embedding)?;
        }
        Ok(index)
    }

    /// Embed every chunk in one batch and index the results.
    ///
    /// An empty chunk set yields an empty index without calling the provider.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the provider fails, and
    /// [`RagError::IndexError`] if it returns the wrong number or shape of
    /// vectors.
    pub async fn build(chunks: Vec<Chunk>, embedder: &dyn EmbeddingProvider) -> Result<Self> {
        let dimensions = embedder.dimensions();
        if chunks.is_empty() {
            info!(chunk_count = 0, "built empty index");
            return Ok(Self::new(dimensions));
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = embedder.embed_batch(&texts).await.map_err(|e| {
            error!(chunk_count = chunks.len(), error = %e, "embedding failed during index build");
            e
        })?;

        let index = Self::from_embeddings(dimensions, chunks, embeddings)?;
        info!(chunk_count = index.len(), dimensions, "built index");
        Ok(index)
    }

    fn push(&mut self, chunk: Chunk, embedding: Vec<f32>) -> Result<()> {
        if embedding.len() != self.dimensions {
            return Err(index_error(format!(
                "embedding has {} dimensions, index expects {}",
                embedding.len(),
                self.dimensions
            )));
        }
        let id = self.entries.len() as u64;
        self.entries.push(IndexEntry { id, chunk, embedding });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Stored chunks in id order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// Return the `k` most similar chunks to `vector`, best first.
    ///
    /// Ties keep insertion order. Asking for more results than the index
    /// holds returns every entry.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if the index is non-empty and
    /// `vector` has the wrong dimensionality.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if vector.len() != self.dimensions {
            return Err(index_error(format!(
                "query vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| SearchResult {
                id: entry.id,
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&entry.embedding, vector),
            })
            .collect();

        // `sort_by` is stable, so equal scores stay in insertion order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    /// Write the index to `<dir>/index.json`, replacing any previous save.
    ///
    /// The file is written under a temporary name and renamed into place.
    pub fn save(&self, dir: &Path, manifest: &IndexManifest) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(INDEX_FILE);
        let tmp_path = dir.join(format!("{INDEX_FILE}.tmp"));

        let persisted = PersistedIndex {
            version: FORMAT_VERSION,
            manifest: manifest.clone(),
            dimensions: self.dimensions,
            entries: self.entries.clone(),
        };

        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        serde_json::to_writer(&mut writer, &persisted)?;
        writer.flush()?;
        drop(writer);
        fs::rename(&tmp_path, &path)?;

        info!(path = %path.display(), chunk_count = self.len(), "saved index");
        Ok(path)
    }

    /// Read an index saved by [`VectorIndex::save`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] for an unknown format version,
    /// vectors of the wrong dimensionality, or ids that are not the entry's
    /// position.
    pub fn load(dir: &Path) -> Result<(Self, IndexManifest)> {
        let path = dir.join(INDEX_FILE);
        let reader = BufReader::new(File::open(&path)?);
        let persisted: PersistedIndex = serde_json::from_reader(reader)?;

        if persisted.version != FORMAT_VERSION {
            return Err(index_error(format!(
                "unsupported index format version {} in {}",
                persisted.version,
                path.display()
            )));
        }

        for (position, entry) in persisted.entries.iter().enumerate() {
            if entry.embedding.len() != persisted.dimensions {
                return Err(index_error(format!(
                    "entry {} has {} dimensions, index expects {}",
                    entry.id,
                    entry.embedding.len(),
                    persisted.dimensions
                )));
            }
            if entry.id != position as u64 {
                return Err(index_error(format!(
                    "entry at position {position} has id {}",
                    entry.id
                )));
            }
        }

        info!(path = %path.display(), chunk_count = persisted.entries.len(), "loaded index");
        Ok((Self { dimensions: persisted.dimensions, entries: persisted.entries }, persisted.manifest))
    }

    /// Whether `<dir>/index.json` exists.
    pub fn exists(dir: &Path) -> bool {
        dir.join(INDEX_FILE).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;

    fn chunk(text: &str) -> Chunk {
        Chunk { text: text.to_string(), start_offset: 0, chunk_index: 0, metadata: Metadata::new() }
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_mismatched_counts_and_dimensions() {
        assert!(VectorIndex::from_embeddings(2, vec![chunk("a")], vec![]).is_err());
        assert!(VectorIndex::from_embeddings(2, vec![chunk("a")], vec![vec![1.0]]).is_err());
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index = VectorIndex::from_embeddings(
            2,
            vec![chunk("a"), chunk("b"), chunk("c")],
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0]],
        )
        .unwrap();

        let results = index.query(&[1.0, 0.0], 3).unwrap();
        assert_eq!(results.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 0]);
    }

    #[test]
    fn query_rejects_wrong_dimensions() {
        let index = VectorIndex::from_embeddings(2, vec![chunk("a")], vec![vec![1.0, 0.0]]).unwrap();
        assert!(index.query(&[1.0], 1).is_err());
        assert!(VectorIndex::new(2).query(&[1.0], 1).unwrap().is_empty());
    }

    #[test]
    fn nan_embeddings_score_zero_and_sort_last() {
        let index = VectorIndex::from_embeddings(
            2,
            vec![chunk("nan"), chunk("near"), chunk("far")],
            vec![vec![f32::NAN, 1.0], vec![1.0, 0.1], vec![-1.0, 0.0]],
        )
        .unwrap();

        let results = index.query(&[1.0, 0.0], 3).unwrap();
        assert!(results.iter().all(|r| r.score.is_finite()));
        assert_eq!(results.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 0, 2]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    fn write_index(dir: &Path, ids: &[u64]) {
        let entries: Vec<IndexEntry> = ids
            .iter()
            .map(|&id| IndexEntry { id, chunk: chunk("text"), embedding: vec![1.0, 0.0] })
            .collect();
        let persisted = PersistedIndex {
            version: FORMAT_VERSION,
            manifest: IndexManifest {
                chunk_size: 1,
                chunk_overlap: 0,
                embedding_model: "m".to_string(),
                document_count: 1,
                sources: Vec::new(),
            },
            dimensions: 2,
            entries,
        };
        fs::write(dir.join(INDEX_FILE), serde_json::to_string(&persisted).unwrap()).unwrap();
    }

    #[test]
    fn load_rejects_ids_out_of_position() {
        let temp = tempfile::tempdir().unwrap();

        write_index(temp.path(), &[0, 1]);
        assert_eq!(VectorIndex::load(temp.path()).unwrap().0.len(), 2);

        write_index(temp.path(), &[1, 0]);
        let err = VectorIndex::load(temp.path()).unwrap_err();
        assert!(matches!(err, RagError::IndexError { .. }));

        write_index(temp.path(), &[0, 5]);
        assert!(VectorIndex::load(temp.path()).is_err());
    }

    #[test]
    fn load_rejects_unknown_version() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join(INDEX_FILE),
            r#"{"version":99,"manifest":{"chunk_size":1,"chunk_overlap":0,"embedding_model":"m","document_count":0},"dimensions":2,"entries":[]}"#,
        )
        .unwrap();
        let err = VectorIndex::load(temp.path()).unwrap_err();
        assert!(matches!(err, RagError::IndexError { .. }));
    }
}
