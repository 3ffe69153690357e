//! Diagram substitution.
//!
//! Replaces each diagram block with an image reference while copying every
//! other byte of the document verbatim.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{DiagramBlock, Document};

/// Internal inconsistency between extracted blocks and rendered artifacts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    /// No artifact was supplied for a block.
    #[error("no rendered artifact for diagram {}", .id + 1)]
    MissingArtifact { id: usize },

    /// A block span does not fit the document or overlaps its predecessor.
    #[error("diagram {} has an invalid span {start}..{end}", .id + 1)]
    InvalidSpan { id: usize, start: usize, end: usize },
}

/// Document text with every diagram replaced by an image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenDocument {
    text: String,
}

impl RewrittenDocument {
    /// The rewritten text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consume into the rewritten text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

/// Replace each block in `document` with a reference to `artifacts[block.id]`.
///
/// Blocks must come from [`extract`](crate::extract) on the same document:
/// ascending, non-overlapping spans on character boundaries.
pub fn rewrite(
    document: &Document,
    blocks: &[DiagramBlock],
    artifacts: &BTreeMap<usize, PathBuf>,
) -> Result<RewrittenDocument, RewriteError> {
    let text = document.text();
    let mut result = String::with_capacity(text.len());
    let mut last_end = 0;

    for block in blocks {
        let path = artifacts
            .get(&block.id)
            .ok_or(RewriteError::MissingArtifact { id: block.id })?;
        if block.start < last_end
            || block.end < block.start
            || !text.is_char_boundary(block.start)
            || !text.is_char_boundary(block.end)
        {
            return Err(RewriteError::InvalidSpan {
                id: block.id,
                start: block.start,
                end: block.end,
            });
        }

        result.push_str(&text[last_end..block.start]);
        result.push_str(&image_reference(block.id, path));
        last_end = block.end;
    }

    result.push_str(&text[last_end..]);

    Ok(RewrittenDocument { text: result })
}

/// Markdown image token for diagram `id`.
///
/// Destinations containing whitespace or parentheses are wrapped in angle
/// brackets so they stay a single link target.
fn image_reference(id: usize, path: &Path) -> String {
    let target = path.to_string_lossy().replace('\\', "/");
    let needs_brackets = target
        .chars()
        .any(|c| c.is_whitespace() || c == '(' || c == ')');
    if needs_brackets {
        format!("![Diagram {}](<{target}>)", id + 1)
    } else {
        format!("![Diagram {}]({target})", id + 1)
    }
}
