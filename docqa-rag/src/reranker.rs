//! Reranker trait for re-scoring retrieval candidates.

use async_trait::async_trait;

use crate::document::SearchResult;
use crate::error::Result;

/// A reranker that re-scores, reorders and truncates search results.
///
/// Implementations must only return candidates they were given; they may
/// change scores and order and must return at most `top_n` results.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Rerank `candidates` for `query`, keeping the best `top_n`.
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<SearchResult>,
        top_n: usize,
    ) -> Result<Vec<SearchResult>>;
}

/// A reranker that keeps the incoming order and only truncates.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::NoOpReranker;
///
/// let reranked = NoOpReranker.rerank("query", results, 3).await?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    fn name(&self) -> &str {
        "NoOp"
    }

    async fn rerank(
        &self,
        _query: &str,
        mut candidates: Vec<SearchResult>,
        top_n: usize,
    ) -> Result<Vec<SearchResult>> {
        candidates.truncate(top_n);
        Ok(candidates)
    }
}
