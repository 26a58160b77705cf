//! Rendering answers and status for the terminal.

use std::fmt::Write;

use docqa_rag::{Answer, ConversationTurn, CorpusStatus, SearchResult};

/// Characters of chunk text shown per source.
const SOURCE_PREVIEW_CHARS: usize = 500;

/// The answer text followed, when there are any, by its sources.
pub fn format_answer(answer: &Answer) -> String {
    let mut out = answer.text.clone();
    if !answer.sources.is_empty() {
        out.push_str("\n\nSource Documents:\n");
        out.push_str(&format_sources(&answer.sources));
    }
    out
}

pub fn format_sources(sources: &[SearchResult]) -> String {
    let mut out = String::new();
    for (i, source) in sources.iter().enumerate() {
        let preview: String = source.chunk.text.chars().take(SOURCE_PREVIEW_CHARS).collect();
        let _ = writeln!(out, "Source {}: {}", i + 1, source.chunk.source());
        let _ = writeln!(out, "{preview}...");
        let _ = writeln!(out, "{}", "-".repeat(40));
    }
    out
}

pub fn format_status(status: &CorpusStatus) -> String {
    format!(
        "Documents processed: {}\nChunks created: {}\nEmbedding model: {}",
        status.documents, status.chunks, status.embedding_model
    )
}

pub fn format_history(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return "(no messages yet)".to_string();
    }
    history.iter().map(|turn| format!("[{}] {}", turn.role, turn.content)).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_rag::document::{Chunk, Metadata, SOURCE_KEY};
    use docqa_rag::{Role, Session};

    fn source(text: &str, name: Option<&str>) -> SearchResult {
        let mut metadata = Metadata::new();
        if let Some(name) = name {
            metadata.insert(SOURCE_KEY.to_string(), name.to_string());
        }
        SearchResult {
            id: 0,
            chunk: Chunk { text: text.to_string(), start_offset: 0, chunk_index: 0, metadata },
            score: 0.5,
        }
    }

    #[test]
    fn sources_are_numbered_and_truncated() {
        let long = "y".repeat(600);
        let answer = Answer {
            text: "Because.".to_string(),
            sources: vec![source(&long, Some("docs/a.pdf")), source("short", None)],
        };

        let out = format_answer(&answer);
        assert!(out.starts_with("Because.\n\nSource Documents:\n"));
        assert!(out.contains(&format!("Source 1: docs/a.pdf\n{}...\n", "y".repeat(500))));
        assert!(out.contains("Source 2: Unknown\nshort...\n"));
    }

    #[test]
    fn summaries_have_no_sources_section() {
        let answer = Answer { text: "- point".to_string(), sources: Vec::new() };
        assert_eq!(format_answer(&answer), "- point");
    }

    #[test]
    fn history_shows_roles() {
        let mut session = Session::new();
        assert_eq!(format_history(session.history()), "(no messages yet)");
        session.append_turn(Role::User, "hi");
        session.append_turn(Role::Assistant, "hello");
        assert_eq!(format_history(session.history()), "[user] hi\n[assistant] hello");
    }
}
