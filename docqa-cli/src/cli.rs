//! Command-line arguments.
//!
//! Every setting can also come from the environment (or a `.env` file loaded
//! before parsing).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use docqa_model::openai::DEFAULT_CHAT_MODEL;
use docqa_rag::cohere::DEFAULT_RERANK_MODEL;
use docqa_rag::openai::DEFAULT_EMBEDDING_MODEL;
use docqa_rag::{Mode, RagConfig};
use docqa_telemetry::LogFormat;

#[derive(Parser, Debug)]
#[command(name = "docqa", version, about = "Ask questions about a folder of documents")]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive console (the default).
    Chat,
    /// Answer one question and exit.
    Ask {
        /// The question; multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Summarize the documents and exit.
    Summarize,
    /// Rebuild and save the index, then exit.
    Index,
}

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Directory of documents to index.
    #[arg(long, env = "DOCQA_DOCS_DIR", default_value = "docs", global = true)]
    pub docs_dir: PathBuf,

    /// Directory the index is saved to and loaded from.
    #[arg(long, env = "DOCQA_INDEX_DIR", default_value = "vectorstore", global = true)]
    pub index_dir: PathBuf,

    /// File that receives one entry per retrieval.
    #[arg(long, env = "DOCQA_RETRIEVAL_LOG", default_value = "retrieval_logs.txt", global = true)]
    pub retrieval_log: PathBuf,

    /// Maximum chunk size in characters.
    #[arg(
        long,
        env = "DOCQA_CHUNK_SIZE",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(500..=2000),
        global = true
    )]
    pub chunk_size: u64,

    /// Characters shared by consecutive chunks.
    #[arg(
        long,
        env = "DOCQA_CHUNK_OVERLAP",
        default_value_t = 200,
        value_parser = clap::value_parser!(u64).range(0..=500),
        global = true
    )]
    pub chunk_overlap: u64,

    /// Start with reranking switched off.
    #[arg(long, env = "DOCQA_NO_RERANKER", global = true)]
    pub no_reranker: bool,

    /// Initial console mode: `qa` or `summarize`.
    #[arg(long, env = "DOCQA_MODE", default_value = "qa", global = true)]
    pub mode: Mode,

    #[arg(long, env = "DOCQA_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL, global = true)]
    pub chat_model: String,

    #[arg(long, env = "DOCQA_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL, global = true)]
    pub embedding_model: String,

    #[arg(long, env = "DOCQA_RERANK_MODEL", default_value = DEFAULT_RERANK_MODEL, global = true)]
    pub rerank_model: String,

    #[arg(long, env = "DOCQA_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Text, global = true)]
    pub log_format: LogFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl Settings {
    /// Library configuration for these settings.
    ///
    /// # Errors
    ///
    /// Fails when the overlap is not smaller than the chunk size.
    pub fn rag_config(&self) -> docqa_rag::Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size as usize)
            .chunk_overlap(self.chunk_overlap as usize)
            .use_reranker(!self.no_reranker)
            .build()
    }
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let cli = Cli::try_parse_from(["docqa"]).unwrap();
        assert_eq!(cli.command(), Command::Chat);

        let config = cli.settings.rag_config().unwrap();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert!(config.use_reranker);
        assert_eq!(cli.settings.mode, Mode::Qa);
        assert_eq!(cli.settings.log_format, LogFormatArg::Text);
    }

    #[test]
    fn ask_joins_words() {
        let cli = Cli::try_parse_from(["docqa", "ask", "what", "is", "this?", "--no-reranker"]).unwrap();
        assert_eq!(
            cli.command(),
            Command::Ask { question: vec!["what".into(), "is".into(), "this?".into()] }
        );
        assert!(!cli.settings.rag_config().unwrap().use_reranker);
    }

    #[test]
    fn chunk_size_outside_range_is_rejected() {
        assert!(Cli::try_parse_from(["docqa", "--chunk-size", "400"]).is_err());
        assert!(Cli::try_parse_from(["docqa", "--chunk-size", "2001"]).is_err());
        assert!(Cli::try_parse_from(["docqa", "--chunk-overlap", "501"]).is_err());
    }

    #[test]
    fn parses_mode_and_log_format() {
        let cli =
            Cli::try_parse_from(["docqa", "--mode", "summarize", "--log-format", "json", "chat"]).unwrap();
        assert_eq!(cli.settings.mode, Mode::Summarize);
        assert_eq!(LogFormat::from(cli.settings.log_format), LogFormat::Json);
    }
}
