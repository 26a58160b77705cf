//! Configuration for chunking, retrieval and answering.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the document assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of results handed to the language model.
    pub top_k: usize,
    /// Size of the candidate pool fetched from the index when reranking.
    pub rerank_candidates: usize,
    /// Whether retrieved candidates go through the reranker.
    pub use_reranker: bool,
    /// Sampling temperature for question answering.
    pub qa_temperature: f32,
    /// Sampling temperature for summarization.
    pub summary_temperature: f32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
            rerank_candidates: 10,
            use_reranker: true,
            qa_temperature: 0.2,
            summary_temperature: 0.0,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check the invariants [`RagConfigBuilder::build`] enforces.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `rerank_candidates < top_k`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.rerank_candidates < self.top_k {
            return Err(RagError::ConfigError(format!(
                "rerank_candidates ({}) must be at least top_k ({})",
                self.rerank_candidates, self.top_k
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of results handed to the language model.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the candidate pool size used when reranking.
    pub fn rerank_candidates(mut self, n: usize) -> Self {
        self.config.rerank_candidates = n;
        self
    }

    pub fn use_reranker(mut self, enabled: bool) -> Self {
        self.config.use_reranker = enabled;
        self
    }

    pub fn qa_temperature(mut self, temperature: f32) -> Self {
        self.config.qa_temperature = temperature;
        self
    }

    pub fn summary_temperature(mut self, temperature: f32) -> Self {
        self.config.summary_temperature = temperature;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RagConfig::builder().build().unwrap();
        assert_eq!(config, RagConfig::default());
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
    }

    #[test]
    fn rejects_overlap_not_below_size() {
        let err = RagConfig::builder().chunk_size(500).chunk_overlap(500).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn rejects_zero_top_k_and_small_pool() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().top_k(5).rerank_candidates(4).build().is_err());
    }
}
