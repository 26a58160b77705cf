//! Plain-text diagnostic log of what each query retrieved.
//!
//! Entries are appended and never read back by the pipeline.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::warn;

use crate::document::{Metadata, SearchResult};

/// Characters of chunk text written per result.
const CONTENT_PREVIEW_CHARS: usize = 200;

/// Appends one entry per query to a log file.
#[derive(Debug, Clone)]
pub struct RetrievalLog {
    path: PathBuf,
}

impl RetrievalLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry for `query`. Write failures are logged, not returned.
    pub fn record(&self, query: &str, results: &[SearchResult]) {
        let entry = format_entry(&Local::now().format("%Y-%m-%d %H:%M:%S").to_string(), query, results);
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(entry.as_bytes()));
        if let Err(e) = written {
            warn!(path = %self.path.display(), error = %e, "failed to write retrieval log");
        }
    }
}

fn format_entry(timestamp: &str, query: &str, results: &[SearchResult]) -> String {
    let mut entry = format!("\n\n[{timestamp}] QUERY: {query}\n");
    for (i, result) in results.iter().enumerate() {
        let preview: String = result.chunk.text.chars().take(CONTENT_PREVIEW_CHARS).collect();
        entry.push_str(&format!("RESULT {}:\n", i + 1));
        entry.push_str(&format!("Content: {preview}...\n"));
        entry.push_str(&format!("Metadata: {}\n", format_metadata(&result.chunk.metadata)));
        entry.push_str(&"-".repeat(50));
        entry.push('\n');
    }
    entry
}

fn format_metadata(metadata: &Metadata) -> String {
    let fields: Vec<String> = metadata.iter().map(|(k, v)| format!("'{k}': '{v}'")).collect();
    format!("{{{}}}", fields.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Chunk, SOURCE_KEY};

    fn result(text: &str) -> SearchResult {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.to_string(), "docs/a.txt".to_string());
        SearchResult {
            id: 0,
            chunk: Chunk { text: text.to_string(), start_offset: 0, chunk_index: 0, metadata },
            score: 1.0,
        }
    }

    #[test]
    fn formats_entry_with_truncated_content() {
        let long = "x".repeat(300);
        let entry = format_entry("2024-01-01 00:00:00", "what?", &[result(&long)]);

        assert!(entry.starts_with("\n\n[2024-01-01 00:00:00] QUERY: what?\n"));
        assert!(entry.contains("RESULT 1:\n"));
        assert!(entry.contains(&format!("Content: {}...\n", "x".repeat(200))));
        assert!(entry.contains("Metadata: {'source': 'docs/a.txt'}\n"));
        assert!(entry.ends_with(&format!("{}\n", "-".repeat(50))));
    }

    #[test]
    fn record_appends() {
        let temp = tempfile::tempdir().unwrap();
        let log = RetrievalLog::new(temp.path().join("retrieval_logs.txt"));
        log.record("first", &[result("a")]);
        log.record("second", &[]);

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert!(contents.contains("QUERY: first"));
        assert!(contents.contains("QUERY: second"));
    }
}
