//! Cohere reranker using the Cohere rerank API.
//!
//! This module is only available when the `cohere` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::document::SearchResult;
use crate::error::{RagError, Result};
use crate::reranker::Reranker;

/// The default Cohere rerank endpoint.
const COHERE_RERANK_URL: &str = "https://api.cohere.com/v1/rerank";

/// The default rerank model.
pub const DEFAULT_RERANK_MODEL: &str = "rerank-english-v3.0";

/// A [`Reranker`] backed by the Cohere rerank API.
///
/// Sends the query and candidate texts, then maps the returned indices back
/// onto the candidates, replacing their scores with Cohere's relevance score.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::cohere::CohereReranker;
///
/// let reranker = CohereReranker::from_env()?;
/// let top = reranker.rerank("what is the refund policy?", candidates, 3).await?;
/// ```
pub struct CohereReranker {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
}

impl CohereReranker {
    /// Create a new reranker with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Self::error("API key must not be empty".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            url: COHERE_RERANK_URL.into(),
            model: DEFAULT_RERANK_MODEL.into(),
        })
    }

    /// Create a new reranker using the `COHERE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("COHERE_API_KEY")
            .map_err(|_| Self::error("COHERE_API_KEY environment variable not set".into()))?;
        Self::new(api_key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn error(message: String) -> RagError {
        RagError::RerankerError { reranker: "Cohere".into(), message }
    }
}

// ── Cohere API request/response types ──────────────────────────────

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankHit>,
}

#[derive(Deserialize)]
struct RerankHit {
    index: usize,
    relevance_score: f32,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Rebuild the result list in the order Cohere returned it.
///
/// Every hit must name a distinct, in-range candidate.
fn apply_hits(
    mut candidates: Vec<Option<SearchResult>>,
    hits: Vec<RerankHit>,
    top_n: usize,
) -> Result<Vec<SearchResult>> {
    let mut reranked = Vec::with_capacity(hits.len().min(top_n));
    for hit in hits.into_iter().take(top_n) {
        let slot = candidates.get_mut(hit.index).ok_or_else(|| {
            CohereReranker::error(format!("result index {} out of range", hit.index))
        })?;
        let mut result = slot.take().ok_or_else(|| {
            CohereReranker::error(format!("result index {} returned twice", hit.index))
        })?;
        result.score = hit.relevance_score;
        reranked.push(result);
    }
    Ok(reranked)
}

#[async_trait]
impl Reranker for CohereReranker {
    fn name(&self) -> &str {
        "Cohere"
    }

    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<SearchResult>,
        top_n: usize,
    ) -> Result<Vec<SearchResult>> {
        if candidates.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        debug!(
            reranker = "Cohere",
            model = %self.model,
            candidate_count = candidates.len(),
            top_n,
            "reranking candidates"
        );

        let request_body = RerankRequest {
            model: &self.model,
            query,
            documents: candidates.iter().map(|c| c.chunk.text.as_str()).collect(),
            top_n: top_n.min(candidates.len()),
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(reranker = "Cohere", error = %e, "request failed");
                Self::error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.message).unwrap_or(body);

            error!(reranker = "Cohere", %status, "API error");
            return Err(Self::error(format!("API returned {status}: {detail}")));
        }

        let rerank_response: RerankResponse = response.json().await.map_err(|e| {
            error!(reranker = "Cohere", error = %e, "failed to parse response");
            Self::error(format!("failed to parse response: {e}"))
        })?;

        apply_hits(candidates.into_iter().map(Some).collect(), rerank_response.results, top_n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Chunk, Metadata};

    fn candidate(id: u64) -> Option<SearchResult> {
        Some(SearchResult {
            id,
            chunk: Chunk {
                text: format!("text {id}"),
                start_offset: 0,
                chunk_index: 0,
                metadata: Metadata::new(),
            },
            score: 0.1,
        })
    }

    #[test]
    fn applies_hits_in_returned_order() {
        let hits = vec![
            RerankHit { index: 2, relevance_score: 0.9 },
            RerankHit { index: 0, relevance_score: 0.4 },
        ];
        let results = apply_hits(vec![candidate(10), candidate(11), candidate(12)], hits, 3).unwrap();
        assert_eq!(results.iter().map(|r| r.id).collect::<Vec<_>>(), vec![12, 10]);
        assert!((results[0].score - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_unknown_or_repeated_indices() {
        let out_of_range = vec![RerankHit { index: 5, relevance_score: 0.9 }];
        assert!(apply_hits(vec![candidate(0)], out_of_range, 3).is_err());

        let repeated = vec![
            RerankHit { index: 0, relevance_score: 0.9 },
            RerankHit { index: 0, relevance_score: 0.8 },
        ];
        assert!(apply_hits(vec![candidate(0), candidate(1)], repeated, 3).is_err());
    }

    #[test]
    fn truncates_to_top_n() {
        let hits = vec![
            RerankHit { index: 1, relevance_score: 0.9 },
            RerankHit { index: 0, relevance_score: 0.8 },
        ];
        let results = apply_hits(vec![candidate(0), candidate(1)], hits, 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 1);
    }
}
