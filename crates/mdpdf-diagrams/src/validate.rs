//! Input validation.
//!
//! [`validate`] checks a loaded document before any processing starts and
//! fails fast on the first violation, in this order:
//!
//! 1. content is non-empty
//! 2. every diagram block is closed
//! 3. no diagram block is empty
//! 4. the document is within the size limit
//!
//! [`validate_file`] first loads the document, which adds the path checks
//! (exists, readable) in front of that list.
//!
//! [`lint_diagram`] is separate: it flags diagrams whose header Mermaid is
//! unlikely to accept, as a warning rather than an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::document::read_error;
use crate::extract::{self, ExtractionError};
use crate::{DiagramBlock, Document};

/// Default upper bound on document size (10 MiB).
pub const DEFAULT_MAX_DOCUMENT_SIZE: u64 = 10 * 1024 * 1024;

const INPUT_EXTENSIONS: &[&str] = &["md", "markdown"];
const OUTPUT_EXTENSION: &str = "pdf";

/// Diagram types Mermaid is known to accept, lowercased.
const KNOWN_DIAGRAM_TYPES: &[&str] = &[
    "architecture-beta",
    "block-beta",
    "c4component",
    "c4container",
    "c4context",
    "c4deployment",
    "c4dynamic",
    "classdiagram",
    "classdiagram-v2",
    "erdiagram",
    "flowchart",
    "gantt",
    "gitgraph",
    "graph",
    "journey",
    "kanban",
    "mindmap",
    "packet-beta",
    "pie",
    "quadrantchart",
    "requirementdiagram",
    "sankey-beta",
    "sequencediagram",
    "statediagram",
    "statediagram-v2",
    "timeline",
    "xychart-beta",
];

/// First word of a diagram header and whatever follows it.
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9-]*):?(?:\s+(\S.*))?$").expect("invalid header regex")
});

/// Document validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("permission denied: {}", .path.display())]
    PermissionDenied { path: PathBuf },

    #[error("cannot read {}: {message}", .path.display())]
    Unreadable { path: PathBuf, message: String },

    #[error("not a regular file: {}", .path.display())]
    NotAFile { path: PathBuf },

    #[error("unsupported file extension for {} (expected {expected})", .path.display())]
    UnsupportedExtension { path: PathBuf, expected: String },

    #[error("cannot write output {}: {reason}", .path.display())]
    OutputNotWritable { path: PathBuf, reason: String },

    #[error("document is empty")]
    Empty,

    #[error("diagram fence opened at line {line} is never closed")]
    UnbalancedFence { line: usize },

    #[error("diagram {} at line {line} is empty", .id + 1)]
    EmptyDiagram { id: usize, line: usize },

    #[error("document is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
}

/// Validation thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum document size in bytes.
    pub max_document_size: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_document_size: DEFAULT_MAX_DOCUMENT_SIZE,
        }
    }
}

/// Validate a loaded document.
///
/// Ambiguous diagram fences are left for [`extract`](crate::extract) to
/// report; the empty-diagram check is skipped for such documents.
pub fn validate(document: &Document, limits: &Limits) -> Result<(), ValidationError> {
    if document.text().trim().is_empty() {
        return Err(ValidationError::Empty);
    }

    match extract::scan(document.text()) {
        Ok(blocks) => {
            if let Some(block) = blocks.iter().find(|b| b.source.trim().is_empty()) {
                return Err(ValidationError::EmptyDiagram {
                    id: block.id,
                    line: block.line,
                });
            }
        }
        Err(ExtractionError::Unclosed { line }) => {
            return Err(ValidationError::UnbalancedFence { line });
        }
        Err(ExtractionError::MalformedBlock { .. }) => {}
    }

    let size = document.len() as u64;
    if size > limits.max_document_size {
        return Err(ValidationError::TooLarge {
            size,
            limit: limits.max_document_size,
        });
    }

    Ok(())
}

/// Load and validate a document from disk.
///
/// The size limit is checked against file metadata before any content is
/// read, so an oversized file reports [`ValidationError::TooLarge`] even
/// when its content is not UTF-8.
pub fn validate_file(
    path: impl AsRef<Path>,
    limits: &Limits,
) -> Result<Document, ValidationError> {
    let path = path.as_ref();
    let size = fs::metadata(path).map_err(|e| read_error(path, &e))?.len();
    if size > limits.max_document_size {
        return Err(ValidationError::TooLarge {
            size,
            limit: limits.max_document_size,
        });
    }

    let document = Document::load(path)?;
    validate(&document, limits)?;
    Ok(document)
}

/// Check that `path` names a readable Markdown file.
pub fn validate_input_path(path: impl AsRef<Path>) -> Result<(), ValidationError> {
    let path = path.as_ref();
    let metadata = fs::metadata(path).map_err(|e| read_error(path, &e))?;
    if !metadata.is_file() {
        return Err(ValidationError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    if !has_extension(path, INPUT_EXTENSIONS) {
        return Err(ValidationError::UnsupportedExtension {
            path: path.to_path_buf(),
            expected: ".md or .markdown".to_owned(),
        });
    }

    fs::File::open(path).map_err(|e| read_error(path, &e))?;
    Ok(())
}

/// Check that a PDF can be written to `path`.
///
/// Creates the parent directory if it does not exist.
pub fn validate_output_path(path: impl AsRef<Path>) -> Result<(), ValidationError> {
    let path = path.as_ref();
    let not_writable = |reason: String| ValidationError::OutputNotWritable {
        path: path.to_path_buf(),
        reason,
    };

    if !has_extension(path, &[OUTPUT_EXTENSION]) {
        return Err(ValidationError::UnsupportedExtension {
            path: path.to_path_buf(),
            expected: ".pdf".to_owned(),
        });
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| not_writable(e.to_string()))?;
    tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| not_writable(format!("directory not writable: {e}")))?;

    if let Ok(metadata) = fs::metadata(path) {
        if metadata.is_dir() {
            return Err(not_writable("path is a directory".to_owned()));
        }
        if metadata.permissions().readonly() {
            return Err(not_writable("file is read-only".to_owned()));
        }
    }

    Ok(())
}

/// Check a diagram's header line, returning a warning if Mermaid is likely to
/// reject it.
///
/// Leading `%%` comment and directive lines and a `---` front matter block
/// are skipped.
#[must_use]
pub fn lint_diagram(block: &DiagramBlock) -> Option<String> {
    let header = header_line(&block.source)?;
    let label = format!("diagram {} (line {})", block.id + 1, block.line);

    let Some(caps) = HEADER.captures(header) else {
        return Some(format!("{label}: cannot read diagram type from `{header}`"));
    };
    let kind = caps[1].to_lowercase();

    if !KNOWN_DIAGRAM_TYPES.contains(&kind.as_str()) {
        return Some(format!("{label}: unknown diagram type `{}`", &caps[1]));
    }
    if (kind == "graph" || kind == "flowchart") && caps.get(2).is_none() {
        return Some(format!("{label}: missing direction for {kind} diagram"));
    }
    None
}

fn header_line(source: &str) -> Option<&str> {
    let mut lines = source
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .peekable();
    if lines.peek() == Some(&"---") {
        lines.next();
        lines.by_ref().find(|l| *l == "---")?;
    }
    lines.find(|l| !l.starts_with("%%"))
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| allowed.iter().any(|a| e.eq_ignore_ascii_case(a)))
}
