//! Document assistant orchestrator.
//!
//! The [`Assistant`] owns the providers and the current [`Corpus`] and runs
//! the two query modes:
//!
//! - **Q&A**: retrieve context for the question, fill the Q&A prompt, ask the
//!   language model, return the answer with the results used as sources.
//! - **Summarization**: reassemble the indexed text (consecutive chunks of a
//!   document lose their shared overlap), fill the summary prompt, ask the
//!   language model. No retrieval, no sources.
//!
//! The corpus is replaced wholesale by [`Assistant::rebuild`] or
//! [`Assistant::load_index`]. Queries work on an `Arc` snapshot, so a rebuild
//! never changes the index under a query that is already running.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{Assistant, QueryRequest, RagConfig, Session};
//!
//! let assistant = Assistant::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .language_model(Arc::new(model))
//!     .reranker(Arc::new(reranker))
//!     .build()?;
//!
//! assistant.rebuild(Path::new("docs")).await?;
//! let mut session = Session::new();
//! let answer = assistant
//!     .handle(&mut session, QueryRequest::Ask { question: "What is covered?".into() })
//!     .await?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use docqa_model::{CompletionRequest, LanguageModel};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, RawDocument, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::{IndexManifest, VectorIndex};
use crate::loader::{SourceStamp, load_directory, snapshot_directory};
use crate::prompt::{render_qa_prompt, render_summary_prompt};
use crate::reranker::Reranker;
use crate::retrieval::{Retrieval, RetrievalAssembler, RetrievalOptions};
use crate::retrieval_log::RetrievalLog;
use crate::session::{Role, Session};

/// Which kind of answer a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Qa,
    Summarize,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Qa => f.write_str("qa"),
            Mode::Summarize => f.write_str("summarize"),
        }
    }
}

impl FromStr for Mode {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qa" | "q&a" | "ask" => Ok(Mode::Qa),
            "summarize" | "summarization" | "summary" => Ok(Mode::Summarize),
            other => Err(RagError::ConfigError(format!("unknown mode '{other}'"))),
        }
    }
}

/// User turn recorded for a summary request with a blank instruction.
pub const DEFAULT_SUMMARY_INSTRUCTION: &str = "Summarize the documents.";

/// A single query, dispatched once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum QueryRequest {
    /// Answer `question` from retrieved context.
    Ask { question: String },
    /// Summarize the whole corpus. `instruction` is what the user typed; it
    /// is kept in the conversation but does not change the summary prompt.
    Summarize { instruction: String },
}

impl QueryRequest {
    /// Build the request `mode` calls for from the user's input line.
    pub fn for_mode(mode: Mode, input: impl Into<String>) -> Self {
        match mode {
            Mode::Qa => QueryRequest::Ask { question: input.into() },
            Mode::Summarize => QueryRequest::Summarize { instruction: input.into() },
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            QueryRequest::Ask { .. } => Mode::Qa,
            QueryRequest::Summarize { .. } => Mode::Summarize,
        }
    }
}

/// The model's reply plus the results it was given.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// Retrieved results in relevance order. Empty for summaries.
    pub sources: Vec<SearchResult>,
}

/// An index together with how it was built.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    index: VectorIndex,
    manifest: IndexManifest,
}

impl Corpus {
    pub fn new(index: VectorIndex, manifest: IndexManifest) -> Self {
        Self { index, manifest }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn status(&self) -> CorpusStatus {
        CorpusStatus {
            documents: self.manifest.document_count,
            chunks: self.index.len(),
            embedding_model: self.manifest.embedding_model.clone(),
        }
    }

    /// The indexed text in id order.
    ///
    /// A chunk that directly follows its predecessor in the same document
    /// contributes only the characters past their shared overlap. Different
    /// documents are separated by a blank line.
    fn full_text(&self) -> String {
        let mut text = String::new();
        let mut previous: Option<&Chunk> = None;
        for chunk in self.index.chunks() {
            match previous {
                Some(prev)
                    if prev.source() == chunk.source() && chunk.chunk_index == prev.chunk_index + 1 =>
                {
                    let shared = (prev.start_offset + prev.char_len()).saturating_sub(chunk.start_offset);
                    text.extend(chunk.text.chars().skip(shared));
                }
                Some(_) => {
                    text.push_str("\n\n");
                    text.push_str(&chunk.text);
                }
                None => text.push_str(&chunk.text),
            }
            previous = Some(chunk);
        }
        text
    }
}

/// Counts shown to the user after loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStatus {
    pub documents: usize,
    pub chunks: usize,
    pub embedding_model: String,
}

/// How [`Assistant::load_or_rebuild`] obtained its corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    Loaded,
    Rebuilt,
}

/// The document assistant.
///
/// Construct one via [`Assistant::builder()`]. A new assistant starts with an
/// empty corpus.
pub struct Assistant {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    language_model: Arc<dyn LanguageModel>,
    assembler: RetrievalAssembler,
    corpus: RwLock<Arc<Corpus>>,
    rebuild_lock: Mutex<()>,
}

impl Assistant {
    /// Create a new [`AssistantBuilder`].
    pub fn builder() -> AssistantBuilder {
        AssistantBuilder::default()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn has_reranker(&self) -> bool {
        self.assembler.has_reranker()
    }

    /// Default per-query retrieval settings from the config.
    pub fn retrieval_options(&self) -> RetrievalOptions {
        RetrievalOptions::from(&self.config)
    }

    /// Snapshot of the current corpus.
    pub async fn corpus(&self) -> Arc<Corpus> {
        self.corpus.read().await.clone()
    }

    pub async fn status(&self) -> CorpusStatus {
        self.corpus().await.status()
    }

    fn manifest_for(&self, document_count: usize, sources: Vec<SourceStamp>) -> IndexManifest {
        IndexManifest {
            chunk_size: self.config.chunk_size,
            chunk_overlap: self.config.chunk_overlap,
            embedding_model: self.embedding_provider.model_name().to_string(),
            document_count,
            sources,
        }
    }

    /// Chunk and embed `documents` into a new corpus without installing it.
    ///
    /// # Errors
    ///
    /// Propagates embedding and index failures; never returns a silently
    /// empty corpus for non-empty input.
    pub async fn build_corpus(&self, documents: &[RawDocument]) -> Result<Corpus> {
        let chunker = RecursiveChunker::from_config(&self.config)?;
        let chunks = chunker.chunk_all(documents);
        info!(document_count = documents.len(), chunk_count = chunks.len(), "chunked documents");

        let index = VectorIndex::build(chunks, self.embedding_provider.as_ref()).await?;
        Ok(Corpus::new(index, self.manifest_for(documents.len(), Vec::new())))
    }

    async fn install(&self, corpus: Corpus) -> CorpusStatus {
        let status = corpus.status();
        *self.corpus.write().await = Arc::new(corpus);
        status
    }

    /// Load `docs_dir`, rebuild the index from it and swap it in.
    ///
    /// Rebuilds are serialized; queries keep using the previous corpus until
    /// the new one is complete. The manifest records the directory's file
    /// stamps as they were before loading.
    pub async fn rebuild(&self, docs_dir: &Path) -> Result<CorpusStatus> {
        let _guard = self.rebuild_lock.lock().await;
        let sources = snapshot_directory(docs_dir)?;
        let report = load_directory(docs_dir)?;
        let mut corpus = self.build_corpus(&report.documents).await?;
        corpus.manifest.sources = sources;
        let status = self.install(corpus).await;
        info!(
            documents = status.documents,
            chunks = status.chunks,
            skipped = report.skipped.len(),
            "rebuilt corpus"
        );
        Ok(status)
    }

    /// Save the current corpus to `index_dir`.
    pub async fn save_index(&self, index_dir: &Path) -> Result<PathBuf> {
        let corpus = self.corpus().await;
        corpus.index.save(index_dir, &corpus.manifest)
    }

    /// Load a saved index from `index_dir` and swap it in.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if the saved vectors do not match the
    /// embedding provider's dimensionality.
    pub async fn load_index(&self, index_dir: &Path) -> Result<CorpusStatus> {
        let (index, manifest) = VectorIndex::load(index_dir)?;
        self.install_loaded(index, manifest).await
    }

    async fn install_loaded(&self, index: VectorIndex, manifest: IndexManifest) -> Result<CorpusStatus> {
        if !index.is_empty() && index.dimensions() != self.embedding_provider.dimensions() {
            return Err(RagError::IndexError {
                message: format!(
                    "saved index has {} dimensions, embedding provider produces {}",
                    index.dimensions(),
                    self.embedding_provider.dimensions()
                ),
            });
        }
        let _guard = self.rebuild_lock.lock().await;
        Ok(self.install(Corpus::new(index, manifest)).await)
    }

    fn matches_settings(&self, manifest: &IndexManifest) -> bool {
        manifest.chunk_size == self.config.chunk_size
            && manifest.chunk_overlap == self.config.chunk_overlap
            && manifest.embedding_model == self.embedding_provider.model_name()
    }

    /// Whether `docs_dir` still holds exactly the files `manifest` was built
    /// from, by name, size and modification time.
    fn matches_sources(manifest: &IndexManifest, docs_dir: &Path) -> bool {
        snapshot_directory(docs_dir).is_ok_and(|sources| sources == manifest.sources)
    }

    /// Reuse the index in `index_dir` if it was built with the current
    /// chunking settings and embedding model from the files currently in
    /// `docs_dir`; otherwise rebuild from `docs_dir` and save.
    pub async fn load_or_rebuild(
        &self,
        docs_dir: &Path,
        index_dir: &Path,
    ) -> Result<(CorpusStatus, IndexSource)> {
        if VectorIndex::exists(index_dir) {
            match VectorIndex::load(index_dir) {
                Ok((index, manifest))
                    if self.matches_settings(&manifest) && Self::matches_sources(&manifest, docs_dir) =>
                {
                    let status = self.install_loaded(index, manifest).await?;
                    return Ok((status, IndexSource::Loaded));
                }
                Ok((_, manifest)) if self.matches_settings(&manifest) => {
                    info!(docs_dir = %docs_dir.display(), "documents changed since the index was saved, rebuilding")
                }
                Ok(_) => info!(index_dir = %index_dir.display(), "saved index settings differ, rebuilding"),
                Err(e) => warn!(index_dir = %index_dir.display(), error = %e, "saved index unreadable, rebuilding"),
            }
        }

        let status = self.rebuild(docs_dir).await?;
        self.save_index(index_dir).await?;
        Ok((status, IndexSource::Rebuilt))
    }

    /// Retrieve context for `query` from the current corpus.
    pub async fn retrieve(&self, query: &str, options: &RetrievalOptions) -> Result<Retrieval> {
        let corpus = self.corpus().await;
        self.assembler.retrieve(&corpus.index, query, options).await
    }

    /// Answer `question` from retrieved context.
    ///
    /// An empty corpus still produces a model call with empty context.
    pub async fn answer(&self, question: &str, options: &RetrievalOptions) -> Result<Answer> {
        let retrieval = self.retrieve(question, options).await?;
        let prompt = render_qa_prompt(&retrieval.context(), question);
        let text = self.generate(prompt, self.config.qa_temperature).await?;
        Ok(Answer { text, sources: retrieval.results })
    }

    /// Summarize every chunk of the current corpus.
    ///
    /// Uses the chunks already held in memory; documents are not re-read.
    pub async fn summarize(&self) -> Result<Answer> {
        let corpus = self.corpus().await;
        let prompt = render_summary_prompt(&corpus.full_text());
        let text = self.generate(prompt, self.config.summary_temperature).await?;
        Ok(Answer { text, sources: Vec::new() })
    }

    async fn generate(&self, prompt: String, temperature: f32) -> Result<String> {
        let response = self
            .language_model
            .complete(CompletionRequest::new(prompt, temperature))
            .await
            .map_err(|e| {
                error!(model = self.language_model.name(), error = %e, "generation failed");
                RagError::GenerationError(format!("{} failed: {e}", self.language_model.name()))
            })?;
        Ok(response.text)
    }

    /// Run `request` with the configured retrieval settings, recording the
    /// exchange in `session`.
    pub async fn handle(&self, session: &mut Session, request: QueryRequest) -> Result<Answer> {
        let options = self.retrieval_options();
        self.handle_with_options(session, request, &options).await
    }

    /// Run `request`, recording the exchange in `session`.
    ///
    /// The user turn is appended before the request runs; the assistant turn
    /// only on success.
    pub async fn handle_with_options(
        &self,
        session: &mut Session,
        request: QueryRequest,
        options: &RetrievalOptions,
    ) -> Result<Answer> {
        let answer = match request {
            QueryRequest::Ask { question } => {
                session.append_turn(Role::User, question.as_str());
                self.answer(&question, options).await?
            }
            QueryRequest::Summarize { instruction } => {
                let instruction = instruction.trim();
                let turn = if instruction.is_empty() { DEFAULT_SUMMARY_INSTRUCTION } else { instruction };
                session.append_turn(Role::User, turn);
                self.summarize().await?
            }
        };
        session.append_turn(Role::Assistant, answer.text.as_str());
        Ok(answer)
    }
}

/// Builder for constructing an [`Assistant`].
///
/// `config`, `embedding_provider` and `language_model` are required.
#[derive(Default)]
pub struct AssistantBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    language_model: Option<Arc<dyn LanguageModel>>,
    reranker: Option<Arc<dyn Reranker>>,
    retrieval_log: Option<RetrievalLog>,
}

impl AssistantBuilder {
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider used for both indexing and queries.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    pub fn language_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.language_model = Some(model);
        self
    }

    /// Set the reranker used when `use_reranker` is on.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Append each retrieval to `log`.
    pub fn retrieval_log(mut self, log: RetrievalLog) -> Self {
        self.retrieval_log = Some(log);
        self
    }

    /// Build the [`Assistant`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing, the
    /// config is invalid, or reranking is enabled without a reranker.
    pub fn build(self) -> Result<Assistant> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let language_model = self
            .language_model
            .ok_or_else(|| RagError::ConfigError("language_model is required".to_string()))?;
        if config.use_reranker && self.reranker.is_none() {
            return Err(RagError::ConfigError(
                "use_reranker is set but no reranker was provided".to_string(),
            ));
        }

        let mut assembler = RetrievalAssembler::new(embedding_provider.clone());
        if let Some(reranker) = self.reranker {
            assembler = assembler.with_reranker(reranker);
        }
        if let Some(log) = self.retrieval_log {
            assembler = assembler.with_log(log);
        }

        let empty = Corpus::new(
            VectorIndex::new(embedding_provider.dimensions()),
            IndexManifest {
                chunk_size: config.chunk_size,
                chunk_overlap: config.chunk_overlap,
                embedding_model: embedding_provider.model_name().to_string(),
                document_count: 0,
                sources: Vec::new(),
            },
        );

        Ok(Assistant {
            config,
            embedding_provider,
            language_model,
            assembler,
            corpus: RwLock::new(Arc::new(empty)),
            rebuild_lock: Mutex::new(()),
        })
    }
}
