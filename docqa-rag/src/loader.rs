//! Loading a documents directory into [`RawDocument`]s.
//!
//! Each regular file directly inside the directory becomes one document. The
//! parser is chosen by extension: `.pdf` goes through PDF text extraction,
//! `.docx` has the text runs of `word/document.xml` pulled out of the zip
//! container, `.txt` is read as UTF-8, anything else gets best-effort text
//! extraction.
//! A file that fails to parse is logged and skipped; it never aborts the load.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::UNIX_EPOCH;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::document::{FILE_TYPE_KEY, PAGE_COUNT_KEY, RawDocument};
use crate::error::{RagError, Result};

/// Bytes inspected when deciding whether an unknown file is binary.
const BINARY_SNIFF_LEN: usize = 8192;

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<script.*?</script>|<style.*?</style>|<[^>]+>").unwrap());

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t]*\n(\s*\n)+").unwrap());

static DOCX_PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:p[ >].*?</w:p>").unwrap());

static DOCX_TEXT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").unwrap());

/// Name, size and modification time of one file in a documents directory.
///
/// A saved index records the stamps of the directory it was built from, so a
/// changed directory can be detected without re-reading every file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStamp {
    pub name: String,
    pub len: u64,
    /// Milliseconds since the Unix epoch; 0 where the platform has no mtime.
    pub modified_ms: u64,
}

/// Outcome of loading a directory.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Successfully parsed documents, in directory-listing order.
    pub documents: Vec<RawDocument>,
    /// Files that were skipped, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Load every file in `dir`, returning only the parsed documents.
///
/// # Errors
///
/// Returns [`RagError::Load`] if `dir` does not exist or is not a directory.
/// Per-file failures are logged and skipped.
pub fn load_documents(dir: impl AsRef<Path>) -> Result<Vec<RawDocument>> {
    load_directory(dir).map(|report| report.documents)
}

/// Regular files directly inside `dir`, sorted by file name.
fn list_files(dir: &Path) -> Result<impl Iterator<Item = walkdir::DirEntry>> {
    if !dir.is_dir() {
        return Err(RagError::Load {
            path: dir.display().to_string(),
            message: "not a directory".to_string(),
        });
    }

    Ok(WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file()))
}

/// Stamp every file [`load_directory`] would read from `dir`.
///
/// # Errors
///
/// Returns [`RagError::Load`] if `dir` is not a directory or a file's
/// metadata cannot be read.
pub fn snapshot_directory(dir: impl AsRef<Path>) -> Result<Vec<SourceStamp>> {
    list_files(dir.as_ref())?
        .map(|entry| -> Result<SourceStamp> {
            let metadata = entry.metadata().map_err(|e| RagError::Load {
                path: entry.path().display().to_string(),
                message: e.to_string(),
            })?;
            let modified_ms = metadata
                .modified()
                .ok()
                .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |elapsed| elapsed.as_millis() as u64);
            Ok(SourceStamp {
                name: entry.file_name().to_string_lossy().into_owned(),
                len: metadata.len(),
                modified_ms,
            })
        })
        .collect()
}

/// Load every file in `dir`, reporting which files were skipped.
pub fn load_directory(dir: impl AsRef<Path>) -> Result<LoadReport> {
    let dir = dir.as_ref();
    let mut report = LoadReport::default();

    for entry in list_files(dir)? {
        let path = entry.into_path();
        match load_file(&path) {
            Ok(document) => {
                debug!(document.source = document.source(), bytes = document.text.len(), "loaded file");
                report.documents.push(document);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file that failed to load");
                report.skipped.push((path, e.to_string()));
            }
        }
    }

    info!(
        dir = %dir.display(),
        document_count = report.documents.len(),
        skipped_count = report.skipped.len(),
        "loaded documents"
    );
    Ok(report)
}

/// Parse a single file according to its extension.
pub fn load_file(path: &Path) -> Result<RawDocument> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let mut document = match extension.as_str() {
        "pdf" => load_pdf(path)?,
        "docx" => load_docx(path)?,
        "txt" => RawDocument::new(fs::read_to_string(path)?, path.display().to_string()),
        _ => load_generic(path, &extension)?,
    };

    let file_type = if extension.is_empty() { "unknown".to_string() } else { extension };
    document.metadata.insert(FILE_TYPE_KEY.to_string(), file_type);
    Ok(document)
}

fn load_pdf(path: &Path) -> Result<RawDocument> {
    // pdf-extract panics on some malformed inputs.
    let extracted = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_by_pages(path)
    }));

    let pages = match extracted {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            return Err(RagError::Load {
                path: path.display().to_string(),
                message: format!("PDF extraction failed: {e}"),
            });
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            return Err(RagError::Load {
                path: path.display().to_string(),
                message: format!("PDF extraction panicked: {message}"),
            });
        }
    };

    let page_count = pages.len();
    let mut document = RawDocument::new(pages.join("\n"), path.display().to_string());
    document.metadata.insert(PAGE_COUNT_KEY.to_string(), page_count.to_string());
    Ok(document)
}

fn load_docx(path: &Path) -> Result<RawDocument> {
    let load_error = |message: String| RagError::Load { path: path.display().to_string(), message };

    let mut archive = zip::ZipArchive::new(File::open(path)?)
        .map_err(|e| load_error(format!("not a docx archive: {e}")))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| load_error(format!("missing word/document.xml: {e}")))?
        .read_to_string(&mut xml)?;

    Ok(RawDocument::new(docx_text(&xml), path.display().to_string()))
}

/// The text of each `<w:p>` paragraph, one paragraph per line.
fn docx_text(xml: &str) -> String {
    DOCX_PARAGRAPH
        .find_iter(xml)
        .map(|paragraph| {
            let runs: String = DOCX_TEXT_RUN
                .captures_iter(paragraph.as_str())
                .filter_map(|run| run.get(1))
                .map(|text| text.as_str())
                .collect();
            decode_entities(&runs)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Best-effort extraction for files without a dedicated parser.
///
/// Binary content is rejected; markup has its tags stripped; anything else is
/// decoded as UTF-8 with invalid sequences replaced.
fn load_generic(path: &Path, extension: &str) -> Result<RawDocument> {
    let bytes = fs::read(path)?;
    if bytes.iter().take(BINARY_SNIFF_LEN).any(|b| *b == 0) {
        return Err(RagError::Load {
            path: path.display().to_string(),
            message: "unsupported binary content".to_string(),
        });
    }

    let text = String::from_utf8_lossy(&bytes);
    let text = match extension {
        "html" | "htm" | "xml" | "xhtml" => strip_markup(&text),
        _ => text.into_owned(),
    };
    Ok(RawDocument::new(text, path.display().to_string()))
}

fn strip_markup(text: &str) -> String {
    let stripped = MARKUP_TAG.replace_all(text, " ");
    let decoded = decode_entities(&stripped);
    BLANK_RUNS.replace_all(decoded.trim(), "\n\n").into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SOURCE_KEY;

    #[test]
    fn loads_text_and_skips_broken_files() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::write(root.join("notes.txt"), "plain text").unwrap();
        fs::write(root.join("broken.pdf"), "not really a pdf").unwrap();
        fs::write(root.join("blob.bin"), [0u8, 159, 146, 150]).unwrap();
        fs::create_dir(root.join("nested")).unwrap();
        fs::write(root.join("nested/ignored.txt"), "ignored").unwrap();

        let report = load_directory(root).unwrap();
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].text, "plain text");
        assert_eq!(report.documents[0].metadata[FILE_TYPE_KEY], "txt");
        assert!(report.documents[0].metadata[SOURCE_KEY].ends_with("notes.txt"));
        assert_eq!(report.skipped.len(), 2);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = load_documents(temp.path().join("absent")).unwrap_err();
        assert!(matches!(err, RagError::Load { .. }));
    }

    #[test]
    fn empty_directory_loads_nothing() {
        let temp = tempfile::tempdir().unwrap();
        assert!(load_documents(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn strips_html_markup() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("page.html");
        fs::write(
            &path,
            "<html><head><style>p{}</style></head><body><p>Fish &amp; chips</p></body></html>",
        )
        .unwrap();

        let document = load_file(&path).unwrap();
        assert_eq!(document.text.trim(), "Fish & chips");
        assert_eq!(document.metadata[FILE_TYPE_KEY], "html");
    }

    fn write_docx(path: &Path, document_xml: &str) {
        use std::io::Write;

        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        writer.start_file("[Content_Types].xml", zip::write::FileOptions::default()).unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer.start_file("word/document.xml", zip::write::FileOptions::default()).unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn extracts_docx_paragraphs() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("report.docx");
        write_docx(
            &path,
            r#"<w:document><w:body>
<w:p w:rsidR="1"><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Quarterly</w:t></w:r><w:r><w:t xml:space="preserve"> report</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell &amp; value</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p><w:r><w:t>Closing line</w:t></w:r></w:p>
</w:body></w:document>"#,
        );

        let document = load_file(&path).unwrap();
        assert_eq!(document.text, "Quarterly report\nCell & value\nClosing line");
        assert_eq!(document.metadata[FILE_TYPE_KEY], "docx");

        let report = load_directory(temp.path()).unwrap();
        assert_eq!(report.documents.len(), 1);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn docx_without_document_part_is_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("empty.docx");
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        writer.start_file("other.xml", zip::write::FileOptions::default()).unwrap();
        writer.finish().unwrap();
        fs::write(temp.path().join("fake.docx"), "plain text, not a zip").unwrap();

        assert!(matches!(load_file(&path).unwrap_err(), RagError::Load { .. }));
        let report = load_directory(temp.path()).unwrap();
        assert!(report.documents.is_empty());
        assert_eq!(report.skipped.len(), 2);
    }

    #[test]
    fn snapshot_lists_the_files_that_would_be_loaded() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("b.txt"), "bee").unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();

        let stamps = snapshot_directory(temp.path()).unwrap();
        let names: Vec<_> = stamps.iter().map(|s| (s.name.as_str(), s.len)).collect();
        assert_eq!(names, vec![("a.txt", 1), ("b.txt", 3)]);
        assert!(stamps.iter().all(|s| s.modified_ms > 0));

        fs::write(temp.path().join("a.txt"), "changed").unwrap();
        assert_ne!(snapshot_directory(temp.path()).unwrap(), stamps);
        assert!(snapshot_directory(temp.path().join("absent")).is_err());
    }

    #[test]
    fn unknown_text_extension_is_read_as_text() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("README");
        fs::write(&path, "# Title\n\nBody").unwrap();

        let document = load_file(&path).unwrap();
        assert_eq!(document.text, "# Title\n\nBody");
        assert_eq!(document.metadata[FILE_TYPE_KEY], "unknown");
    }
}
