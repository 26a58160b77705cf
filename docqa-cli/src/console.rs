//! Interactive chat console.
//!
//! Plain lines are queries in the current mode; lines starting with `/` are
//! console commands. Each line is handled to completion before the next
//! prompt is shown.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docqa_rag::{Assistant, Mode, QueryRequest, RetrievalOptions, Session};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

use crate::cli::Settings;
use crate::output::{format_answer, format_history, format_status};

pub const HELP: &str = "\
Commands:
  /mode qa|summarize   switch between question answering and summarization
  /reranker on|off     toggle reranking of retrieved passages
  /reload              reload documents and rebuild the index
  /reset               clear the conversation
  /history             show the conversation
  /status              show document and index counts
  /help                show this help
  /quit                exit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Query(String),
    SetMode(Mode),
    SetReranker(bool),
    Reload,
    Reset,
    History,
    Status,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub fn parse_line(line: &str) -> ConsoleCommand {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleCommand::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ConsoleCommand::Query(line.to_string());
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts.next();
    match (name.as_str(), arg) {
        ("mode", Some(mode)) => match mode.parse::<Mode>() {
            Ok(mode) => ConsoleCommand::SetMode(mode),
            Err(e) => ConsoleCommand::Invalid(e.to_string()),
        },
        ("mode", None) => ConsoleCommand::Invalid("usage: /mode qa|summarize".to_string()),
        ("reranker", Some("on")) => ConsoleCommand::SetReranker(true),
        ("reranker", Some("off")) => ConsoleCommand::SetReranker(false),
        ("reranker", _) => ConsoleCommand::Invalid("usage: /reranker on|off".to_string()),
        ("reload", _) => ConsoleCommand::Reload,
        ("reset", _) => ConsoleCommand::Reset,
        ("history", _) => ConsoleCommand::History,
        ("status", _) => ConsoleCommand::Status,
        ("help", _) => ConsoleCommand::Help,
        ("quit" | "exit", _) => ConsoleCommand::Quit,
        (other, _) => ConsoleCommand::Invalid(format!("unknown command '/{other}', try /help")),
    }
}

/// Per-console state: the mode, the reranker toggle and the conversation.
#[derive(Debug, Clone)]
pub struct ConsoleState {
    pub mode: Mode,
    pub use_reranker: bool,
    pub session: Session,
    docs_dir: PathBuf,
    index_dir: PathBuf,
}

impl ConsoleState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            mode: settings.mode,
            use_reranker: !settings.no_reranker,
            session: Session::new(),
            docs_dir: settings.docs_dir.clone(),
            index_dir: settings.index_dir.clone(),
        }
    }

    pub fn with_dirs(mode: Mode, use_reranker: bool, docs_dir: &Path, index_dir: &Path) -> Self {
        Self {
            mode,
            use_reranker,
            session: Session::new(),
            docs_dir: docs_dir.to_path_buf(),
            index_dir: index_dir.to_path_buf(),
        }
    }

    fn options(&self, assistant: &Assistant) -> RetrievalOptions {
        RetrievalOptions {
            use_reranker: self.use_reranker && assistant.has_reranker(),
            ..assistant.retrieval_options()
        }
    }
}

/// What the console should do after a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Print the text (if any) and prompt again.
    Continue(String),
    Quit,
}

/// Run one console command against `assistant`.
///
/// Failures are reported in the returned text; the console keeps running.
pub async fn execute(assistant: &Assistant, state: &mut ConsoleState, command: ConsoleCommand) -> Step {
    let output = match command {
        ConsoleCommand::Empty => String::new(),
        ConsoleCommand::Quit => return Step::Quit,
        ConsoleCommand::Help => HELP.to_string(),
        ConsoleCommand::Invalid(message) => message,
        ConsoleCommand::SetMode(mode) => {
            state.mode = mode;
            format!("Mode: {mode}")
        }
        ConsoleCommand::SetReranker(true) if !assistant.has_reranker() => {
            "No reranker is configured; set COHERE_API_KEY and restart.".to_string()
        }
        ConsoleCommand::SetReranker(enabled) => {
            state.use_reranker = enabled;
            format!("Reranker: {}", if enabled { "on" } else { "off" })
        }
        ConsoleCommand::Reset => {
            state.session.reset();
            "Conversation cleared.".to_string()
        }
        ConsoleCommand::History => format_history(state.session.history()),
        ConsoleCommand::Status => format_status(&assistant.status().await),
        ConsoleCommand::Reload => match reload(assistant, state).await {
            Ok(status) => format!("Processing complete!\n{status}"),
            Err(e) => format!("Error: {e}"),
        },
        ConsoleCommand::Query(input) => {
            let request = QueryRequest::for_mode(state.mode, input);
            let options = state.options(assistant);
            match assistant.handle_with_options(&mut state.session, request, &options).await {
                Ok(answer) => format_answer(&answer),
                Err(e) => {
                    warn!(error = %e, "query failed");
                    format!("Error: {e}")
                }
            }
        }
    };
    Step::Continue(output)
}

async fn reload(assistant: &Assistant, state: &ConsoleState) -> docqa_rag::Result<String> {
    let status = assistant.rebuild(&state.docs_dir).await?;
    assistant.save_index(&state.index_dir).await?;
    Ok(format_status(&status))
}

/// Read lines from the terminal until `/quit`, Ctrl-C or Ctrl-D.
pub async fn run_console(assistant: Arc<Assistant>, settings: &Settings) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut state = ConsoleState::new(settings);
    info!(session.id = %state.session.id(), mode = %state.mode, "console started");

    println!("Document assistant. Type /help for commands.");
    println!("{}\n", format_status(&assistant.status().await));

    loop {
        let prompt = format!("{}> ", state.mode);
        match rl.readline(&prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                match execute(&assistant, &mut state, parse_line(&line)).await {
                    Step::Continue(output) if output.is_empty() => {}
                    Step::Continue(output) => println!("{output}\n"),
                    Step::Quit => break,
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    info!(session.id = %state.session.id(), turns = state.session.len(), "console closed");
    Ok(())
}
