//! # docqa-rag
//!
//! Question answering and summarization over a directory of documents.
//!
//! ## Overview
//!
//! Documents flow through the pipeline in this order:
//!
//! - [`loader`] reads every file in a directory into [`RawDocument`]s
//! - [`RecursiveChunker`] splits them into overlapping [`Chunk`]s
//! - [`VectorIndex`] embeds the chunks and answers nearest-neighbour queries;
//!   it can be saved to and loaded from a directory
//! - [`RetrievalAssembler`] turns a query into context, optionally through a
//!   [`Reranker`]
//! - [`Assistant`] fills the prompt templates and calls the language model
//!
//! Providers are trait objects so tests can swap in deterministic fakes:
//!
//! - [`EmbeddingProvider`] - [`OpenAIEmbeddingProvider`] (feature `openai`)
//! - [`Reranker`] - [`CohereReranker`] (feature `cohere`), [`NoOpReranker`]
//! - [`docqa_model::LanguageModel`] - chat completion models
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::{Assistant, QueryRequest, RagConfig, Session};
//!
//! let assistant = Assistant::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(OpenAIEmbeddingProvider::from_env()?))
//!     .language_model(Arc::new(model))
//!     .reranker(Arc::new(CohereReranker::from_env()?))
//!     .build()?;
//!
//! assistant.load_or_rebuild("docs".as_ref(), "vectorstore".as_ref()).await?;
//!
//! let mut session = Session::new();
//! let answer = assistant
//!     .handle(&mut session, QueryRequest::Ask { question: "What is X?".into() })
//!     .await?;
//! println!("{}", answer.text);
//! ```

pub mod assistant;
pub mod chunking;
#[cfg(feature = "cohere")]
pub mod cohere;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod loader;
#[cfg(feature = "openai")]
pub mod openai;
pub mod prompt;
pub mod reranker;
pub mod retrieval;
pub mod retrieval_log;
pub mod session;

pub use assistant::{
    Answer, Assistant, AssistantBuilder, Corpus, CorpusStatus, IndexSource, Mode, QueryRequest,
};
pub use chunking::{Chunker, RecursiveChunker};
#[cfg(feature = "cohere")]
pub use cohere::CohereReranker;
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Metadata, RawDocument, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use index::{IndexManifest, VectorIndex};
pub use loader::{LoadReport, SourceStamp, load_directory, load_documents, snapshot_directory};
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
pub use reranker::{NoOpReranker, Reranker};
pub use retrieval::{Retrieval, RetrievalAssembler, RetrievalOptions};
pub use retrieval_log::RetrievalLog;
pub use session::{ConversationTurn, Role, Session};
