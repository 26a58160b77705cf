//! # docqa-cli
//!
//! The `docqa` binary: a chat console and one-shot commands over a folder of
//! documents.
//!
//! ```text
//! docqa                      # interactive console (same as `docqa chat`)
//! docqa ask "What changed?"  # answer one question
//! docqa summarize            # summarize every document
//! docqa index                # rebuild and save the index
//! ```
//!
//! Requires `OPENAI_API_KEY`; reranking also needs `COHERE_API_KEY`.

pub mod cli;
pub mod console;
pub mod output;

use std::sync::Arc;

use anyhow::Context;
use docqa_model::openai::{OpenAIChatModel, OpenAIConfig};
use docqa_rag::{
    Assistant, CohereReranker, IndexSource, OpenAIEmbeddingProvider, Reranker, RetrievalLog,
};
use tracing::info;

pub use cli::{Cli, Command, Settings};

/// Build the assistant with the hosted providers `settings` name.
///
/// The Cohere reranker is optional when reranking starts switched off, so the
/// console can still enable it later if a key is present.
pub fn build_assistant(settings: &Settings) -> anyhow::Result<Assistant> {
    let config = settings.rag_config()?;

    let embedder = OpenAIEmbeddingProvider::from_env()
        .context("embeddings need OPENAI_API_KEY")?
        .with_model(settings.embedding_model.clone());
    let model = OpenAIChatModel::new(OpenAIConfig::from_env(settings.chat_model.clone())?)
        .context("failed to create the chat model client")?;

    let reranker = match CohereReranker::from_env() {
        Ok(reranker) => Some(reranker.with_model(settings.rerank_model.clone())),
        Err(e) if config.use_reranker => {
            return Err(e).context("reranking is on; set COHERE_API_KEY or pass --no-reranker");
        }
        Err(_) => None,
    };

    let mut builder = Assistant::builder()
        .config(config)
        .embedding_provider(Arc::new(embedder))
        .language_model(Arc::new(model))
        .retrieval_log(RetrievalLog::new(&settings.retrieval_log));
    if let Some(reranker) = reranker {
        builder = builder.reranker(Arc::new(reranker) as Arc<dyn Reranker>);
    }
    Ok(builder.build()?)
}

/// Load the saved index or rebuild it from the documents directory.
pub async fn prepare(assistant: &Assistant, settings: &Settings) -> anyhow::Result<()> {
    let (status, source) = assistant
        .load_or_rebuild(&settings.docs_dir, &settings.index_dir)
        .await
        .with_context(|| format!("failed to prepare documents in {}", settings.docs_dir.display()))?;
    info!(
        documents = status.documents,
        chunks = status.chunks,
        loaded = source == IndexSource::Loaded,
        "documents ready"
    );
    Ok(())
}

/// Run the parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = cli.command();
    let settings = cli.settings;
    let assistant = Arc::new(build_assistant(&settings)?);

    match command {
        Command::Index => {
            let status = assistant.rebuild(&settings.docs_dir).await?;
            let path = assistant.save_index(&settings.index_dir).await?;
            println!("{}\nSaved to {}", output::format_status(&status), path.display());
        }
        Command::Ask { question } => {
            prepare(&assistant, &settings).await?;
            let answer = assistant.answer(&question.join(" "), &assistant.retrieval_options()).await?;
            println!("{}", output::format_answer(&answer));
        }
        Command::Summarize => {
            prepare(&assistant, &settings).await?;
            let answer = assistant.summarize().await?;
            println!("{}", output::format_answer(&answer));
        }
        Command::Chat => {
            prepare(&assistant, &settings).await?;
            console::run_console(assistant, &settings).await?;
        }
    }
    Ok(())
}
