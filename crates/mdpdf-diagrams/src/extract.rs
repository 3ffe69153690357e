//! Diagram block extraction.
//!
//! A single linear scan over the document's lines. Fenced code blocks are
//! tracked the `CommonMark` way; a fence whose info string names a diagram
//! kind opens a diagram block and the first qualifying closing fence ends it.
//! `<mermaid>...</mermaid>` tags starting a line outside any fence are also
//! recognized.
//!
//! Only offsets are recorded for the text between blocks, so the rewriter can
//! splice the document back together byte for byte.

use std::ops::Range;

use crate::fence::{self, Fence};
use crate::{DiagramKind, Document};

const TAG_OPEN: &str = "<mermaid>";
const TAG_CLOSE: &str = "</mermaid>";

/// How a diagram block was delimited in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// A fenced code block (```` ```mermaid ````).
    Fence,
    /// A `<mermaid>` tag pair.
    Tag,
}

/// One diagram found in a document.
///
/// Blocks returned by [`extract`] have strictly increasing, non-overlapping
/// spans and ids `0..n` in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    /// Zero-based ordinal in scan order.
    pub id: usize,
    /// Byte offset of the start of the opening line.
    pub start: usize,
    /// Byte offset just past the closing delimiter (line terminator excluded).
    pub end: usize,
    /// 1-based line number of the opening delimiter.
    pub line: usize,
    /// Diagram dialect.
    pub kind: DiagramKind,
    /// Diagram body without delimiters.
    pub source: String,
    /// Delimiter style.
    pub delimiter: Delimiter,
}

impl DiagramBlock {
    /// Byte range of the whole block, delimiters included.
    #[must_use]
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Malformed diagram markup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    /// A diagram fence inside another code block that could equally be read
    /// as closing it.
    #[error("ambiguous diagram fence at line {line} inside a code block")]
    MalformedBlock { line: usize },

    /// A diagram block that is never closed.
    #[error("diagram block opened at line {line} is never closed")]
    Unclosed { line: usize },
}

/// Extract all diagram blocks from a document.
pub fn extract(document: &Document) -> Result<Vec<DiagramBlock>, ExtractionError> {
    let blocks = scan(document.text())?;
    tracing::debug!(
        path = %document.path().display(),
        count = blocks.len(),
        "extracted diagrams"
    );
    Ok(blocks)
}

/// A line with its byte offsets.
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    /// Offset of the first byte.
    start: usize,
    /// Offset past the content, before `\n` / `\r\n`.
    end: usize,
    /// Offset of the next line.
    next: usize,
    number: usize,
    text: &'a str,
}

fn lines(text: &str) -> impl Iterator<Item = Line<'_>> {
    let mut start = 0;
    text.split_inclusive('\n').enumerate().map(move |(i, raw)| {
        let content = raw.strip_suffix('\n').unwrap_or(raw);
        let content = content.strip_suffix('\r').unwrap_or(content);
        let line = Line {
            start,
            end: start + content.len(),
            next: start + raw.len(),
            number: i + 1,
            text: content,
        };
        start += raw.len();
        line
    })
}

enum State<'a> {
    Text,
    Plain(Fence<'a>),
    Diagram {
        fence: Fence<'a>,
        kind: DiagramKind,
        start: usize,
        line: usize,
        body: usize,
    },
}

pub(crate) fn scan(text: &str) -> Result<Vec<DiagramBlock>, ExtractionError> {
    let mut blocks = Vec::new();
    let mut state = State::Text;
    // Lines starting before this offset were consumed by a tag block.
    let mut resume = 0;

    for line in lines(text) {
        if line.start < resume {
            continue;
        }

        state = match state {
            State::Text => {
                if let Some(fence) = fence::detect(line.text) {
                    match DiagramKind::parse(fence.lang) {
                        Some(kind) => State::Diagram {
                            fence,
                            kind,
                            start: line.start,
                            line: line.number,
                            body: line.next,
                        },
                        None => State::Plain(fence),
                    }
                } else if let Some(indent) = tag_indent(line.text) {
                    let block = tag_block(text, &line, indent, blocks.len())?;
                    resume = block.end;
                    blocks.push(block);
                    State::Text
                } else {
                    State::Text
                }
            }
            State::Plain(outer) => {
                if outer.is_closed_by(line.text) {
                    State::Text
                } else {
                    if let Some(inner) = fence::detect(line.text)
                        && DiagramKind::parse(inner.lang).is_some()
                        && outer.shadows(&inner)
                    {
                        return Err(ExtractionError::MalformedBlock { line: line.number });
                    }
                    State::Plain(outer)
                }
            }
            State::Diagram {
                fence,
                kind,
                start,
                line: opened,
                body,
            } => {
                if fence.is_closed_by(line.text) {
                    blocks.push(DiagramBlock {
                        id: blocks.len(),
                        start,
                        end: line.end,
                        line: opened,
                        kind,
                        source: strip_eol(&text[body..line.start]).to_owned(),
                        delimiter: Delimiter::Fence,
                    });
                    State::Text
                } else {
                    State::Diagram {
                        fence,
                        kind,
                        start,
                        line: opened,
                        body,
                    }
                }
            }
        };
    }

    if let State::Diagram { line, .. } = state {
        return Err(ExtractionError::Unclosed { line });
    }
    Ok(blocks)
}

/// Leading whitespace length if the line starts with an opening tag.
fn tag_indent(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    trimmed
        .starts_with(TAG_OPEN)
        .then_some(line.len() - trimmed.len())
}

fn tag_block(
    text: &str,
    line: &Line<'_>,
    indent: usize,
    id: usize,
) -> Result<DiagramBlock, ExtractionError> {
    let body = line.start + indent + TAG_OPEN.len();
    let close = text[body..]
        .find(TAG_CLOSE)
        .map(|pos| body + pos)
        .ok_or(ExtractionError::Unclosed { line: line.number })?;

    Ok(DiagramBlock {
        id,
        start: line.start,
        end: close + TAG_CLOSE.len(),
        line: line.number,
        kind: DiagramKind::Mermaid,
        source: text[body..close].trim().to_owned(),
        delimiter: Delimiter::Tag,
    })
}

/// Drop one trailing line terminator.
fn strip_eol(body: &str) -> &str {
    let body = body.strip_suffix('\n').unwrap_or(body);
    body.strip_suffix('\r').unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extract_text(text: &str) -> Result<Vec<DiagramBlock>, ExtractionError> {
        extract(&Document::new("test.md", text))
    }

    #[test]
    fn test_single_fenced_diagram() {
        let text = "# Title\n\n```mermaid\nflowchart A-->B\n```\n\nText after.";

        let blocks = extract_text(text).unwrap();

        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.id, 0);
        assert_eq!(block.kind, DiagramKind::Mermaid);
        assert_eq!(block.source, "flowchart A-->B");
        assert_eq!(block.line, 3);
        assert_eq!(block.delimiter, Delimiter::Fence);
        assert_eq!(&text[block.span()], "```mermaid\nflowchart A-->B\n```");
        assert_eq!(&text[..block.start], "# Title\n\n");
        assert_eq!(&text[block.end..], "\n\nText after.");
    }

    #[test]
    fn test_no_diagrams() {
        let blocks = extract_text("# Title\n\nJust text.\n\n```rust\nfn main() {}\n```\n").unwrap();

        assert!(blocks.is_empty());
    }

    #[test]
    fn test_multiple_blocks_in_order() {
        let text = "```mermaid\ngraph TD\n```\ntext\n~~~mermaid\npie\n~~~\n<mermaid>gantt</mermaid>\n";

        let blocks = extract_text(text).unwrap();

        assert_eq!(blocks.len(), 3);
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.id, i);
        }
        assert!(blocks.windows(2).all(|w| w[0].end < w[1].start));
        assert_eq!(blocks[0].source, "graph TD");
        assert_eq!(blocks[1].source, "pie");
        assert_eq!(blocks[2].source, "gantt");
        assert_eq!(blocks[2].delimiter, Delimiter::Tag);
    }

    #[test]
    fn test_block_at_eof_without_newline() {
        let text = "intro\n```mermaid\nsequenceDiagram\n  A->>B: hi\n```";

        let blocks = extract_text(text).unwrap();

        assert_eq!(blocks[0].end, text.len());
        assert_eq!(blocks[0].source, "sequenceDiagram\n  A->>B: hi");
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "a\r\n```mermaid\r\ngraph LR\r\n```\r\nb";

        let blocks = extract_text(text).unwrap();

        assert_eq!(blocks[0].source, "graph LR");
        assert_eq!(&text[blocks[0].end..], "\r\nb");
    }

    #[test]
    fn test_multiline_body_preserved() {
        let text = "```mermaid\nflowchart LR\n\n    A --> B\n```\n";

        let blocks = extract_text(text).unwrap();

        assert_eq!(blocks[0].source, "flowchart LR\n\n    A --> B");
    }

    #[test]
    fn test_empty_body() {
        let blocks = extract_text("```mermaid\n```\n").unwrap();

        assert_eq!(blocks[0].source, "");
    }

    #[test]
    fn test_longer_fence_closes_only_on_matching_length() {
        let text = "````mermaid\ngraph TD\n```\nstill inside\n````\n";

        let blocks = extract_text(text).unwrap();

        assert_eq!(blocks[0].source, "graph TD\n```\nstill inside");
    }

    #[test]
    fn test_fence_with_attributes() {
        let blocks = extract_text("``` mermaid {theme=dark}\ngraph TD\n```\n").unwrap();

        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_diagram_inside_longer_plain_fence_is_literal() {
        let text = "````markdown\n```mermaid\ngraph TD\n```\n````\n";

        let blocks = extract_text(text).unwrap();

        assert!(blocks.is_empty());
    }

    #[test]
    fn test_diagram_inside_tilde_fence_is_literal() {
        let text = "~~~\n```mermaid\ngraph TD\n```\n~~~\n";

        assert!(extract_text(text).unwrap().is_empty());
    }

    #[test]
    fn test_ambiguous_nested_fence_rejected() {
        let text = "```text\nexample\n```mermaid\ngraph TD\n```\n";

        let err = extract_text(text).unwrap_err();

        assert_eq!(err, ExtractionError::MalformedBlock { line: 3 });
    }

    #[test]
    fn test_unclosed_fence() {
        let err = extract_text("# Doc\n\n```mermaid\ngraph TD\n").unwrap_err();

        assert_eq!(err, ExtractionError::Unclosed { line: 3 });
    }

    #[test]
    fn test_unclosed_plain_fence_is_fine() {
        assert!(extract_text("```python\nprint(1)\n").unwrap().is_empty());
    }

    #[test]
    fn test_tag_block_multiline() {
        let text = "before\n<mermaid>\n  graph TD\n  A-->B\n</mermaid>\nafter";

        let blocks = extract_text(text).unwrap();

        assert_eq!(blocks[0].source, "graph TD\n  A-->B");
        assert_eq!(blocks[0].line, 2);
        assert_eq!(&text[blocks[0].end..], "\nafter");
    }

    #[test]
    fn test_tag_inside_fence_is_literal() {
        let text = "```html\n<mermaid>graph TD</mermaid>\n```\n";

        assert!(extract_text(text).unwrap().is_empty());
    }

    #[test]
    fn test_tag_mid_line_ignored() {
        assert!(extract_text("see <mermaid>graph TD</mermaid>\n").unwrap().is_empty());
    }

    #[test]
    fn test_unclosed_tag() {
        let err = extract_text("<mermaid>\ngraph TD\n").unwrap_err();

        assert_eq!(err, ExtractionError::Unclosed { line: 1 });
    }

    #[test]
    fn test_non_diagram_text_preserved_between_spans() {
        let text = "A\n```mermaid\nx\n```\nB\n```mermaid\ny\n```\nC";

        let blocks = extract_text(text).unwrap();

        let mut outside = String::new();
        let mut cursor = 0;
        for block in &blocks {
            outside.push_str(&text[cursor..block.start]);
            cursor = block.end;
        }
        outside.push_str(&text[cursor..]);
        assert_eq!(outside, "A\n\nB\n\nC");
    }
}
