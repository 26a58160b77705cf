//! Query-time retrieval: embed → search → rerank → assemble context.
//!
//! Without reranking the assembler fetches `top_k` candidates and uses them
//! as-is. With reranking it fetches a wider pool of `rerank_candidates`,
//! hands it to the [`Reranker`] and keeps the reranker's order and scores.
//! A reranker failure fails the query.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::document::{Chunk, Metadata, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::reranker::Reranker;
use crate::retrieval_log::RetrievalLog;

/// Per-query retrieval settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalOptions {
    pub use_reranker: bool,
    /// Final number of results (`k_final`).
    pub top_k: usize,
    /// Candidate pool size when reranking.
    pub rerank_candidates: usize,
}

impl RetrievalOptions {
    /// How many candidates to pull from the index.
    pub fn candidate_count(&self) -> usize {
        if self.use_reranker { self.rerank_candidates.max(self.top_k) } else { self.top_k }
    }
}

impl From<&RagConfig> for RetrievalOptions {
    fn from(config: &RagConfig) -> Self {
        Self {
            use_reranker: config.use_reranker,
            top_k: config.top_k,
            rerank_candidates: config.rerank_candidates,
        }
    }
}

/// The context assembled for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub query: String,
    /// Final results, most relevant first.
    pub results: Vec<SearchResult>,
}

impl Retrieval {
    /// Chunk texts joined by blank lines, in result order.
    pub fn context(&self) -> String {
        self.results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n")
    }

    /// The chunks used and their source metadata, for citation.
    pub fn sources(&self) -> impl Iterator<Item = (&Chunk, &Metadata)> {
        self.results.iter().map(|r| (&r.chunk, &r.chunk.metadata))
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Assembles retrieval results from an index.
///
/// # Example
///
/// ```rust,ignore
/// let assembler = RetrievalAssembler::new(embedder).with_reranker(Arc::new(reranker));
/// let retrieval = assembler.retrieve(&index, "what changed?", &options).await?;
/// ```
#[derive(Clone)]
pub struct RetrievalAssembler {
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Option<Arc<dyn Reranker>>,
    log: Option<RetrievalLog>,
}

impl RetrievalAssembler {
    /// `embedder` must be the provider the index was built with.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder, reranker: None, log: None }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Append every retrieval to `log`.
    pub fn with_log(mut self, log: RetrievalLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn has_reranker(&self) -> bool {
        self.reranker.is_some()
    }

    /// Retrieve context for `query` from `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RetrievalError`] if embedding, search or reranking
    /// fails, or if reranking is requested without a configured reranker.
    pub async fn retrieve(
        &self,
        index: &VectorIndex,
        query: &str,
        options: &RetrievalOptions,
    ) -> Result<Retrieval> {
        // 1. Embed the query
        let query_embedding = self.embedder.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            RagError::RetrievalError(format!("query embedding failed: {e}"))
        })?;

        // 2. Search the index
        let candidate_count = options.candidate_count();
        let candidates = index.query(&query_embedding, candidate_count).map_err(|e| {
            error!(error = %e, "index search failed");
            RagError::RetrievalError(format!("search failed: {e}"))
        })?;
        debug!(candidate_count = candidates.len(), requested = candidate_count, "fetched candidates");

        // 3. Rerank or take the index order
        let results = if options.use_reranker {
            let reranker = self.reranker.as_ref().ok_or_else(|| {
                RagError::RetrievalError("reranking enabled but no reranker configured".to_string())
            })?;
            self.rerank(reranker.as_ref(), query, candidates, options.top_k).await?
        } else {
            let mut candidates = candidates;
            candidates.truncate(options.top_k);
            candidates
        };

        if let Some(log) = &self.log {
            log.record(query, &results);
        }

        info!(result_count = results.len(), reranked = options.use_reranker, "retrieval completed");
        Ok(Retrieval { query: query.to_string(), results })
    }

    async fn rerank(
        &self,
        reranker: &dyn Reranker,
        query: &str,
        candidates: Vec<SearchResult>,
        top_n: usize,
    ) -> Result<Vec<SearchResult>> {
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let candidate_ids: Vec<u64> = candidates.iter().map(|c| c.id).collect();
        let mut reranked = reranker.rerank(query, candidates, top_n).await.map_err(|e| {
            error!(reranker = reranker.name(), error = %e, "reranking failed");
            RagError::RetrievalError(format!("reranking failed: {e}"))
        })?;

        if let Some(stray) = reranked.iter().find(|r| !candidate_ids.contains(&r.id)) {
            error!(reranker = reranker.name(), id = stray.id, "reranker returned unknown candidate");
            return Err(RagError::RetrievalError(format!(
                "reranker {} returned a result that was not a candidate (id {})",
                reranker.name(),
                stray.id
            )));
        }
        reranked.truncate(top_n);
        Ok(reranked)
    }
}
