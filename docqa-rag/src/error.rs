//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur in ingestion, retrieval and answering.
#[derive(Debug, Error)]
pub enum RagError {
    /// A file could not be read or parsed.
    #[error("Failed to load {path}: {message}")]
    Load {
        /// The file or directory that failed.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The similarity index could not be built, saved or loaded.
    #[error("Index error: {message}")]
    IndexError {
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during result reranking.
    #[error("Reranker error ({reranker}): {message}")]
    RerankerError {
        /// The reranker that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Building context for a query failed (embed, search or rerank).
    #[error("Retrieval error: {0}")]
    RetrievalError(String),

    /// The language model failed to produce an answer or summary.
    #[error("Generation error: {0}")]
    GenerationError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
