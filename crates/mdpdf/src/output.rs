//! Status reporting for mdpdf commands.
//!
//! Lines are written to stderr. Report contents are built as plain
//! [`Line`]s first so the wording can be checked without a terminal.

use console::{Style, Term};
use mdpdf_pipeline::ConversionResult;
use mdpdf_tool::ToolError;

/// How a status line is colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tone {
    Plain,
    Done,
    Attention,
    Failed,
}

/// One status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Line {
    pub(crate) tone: Tone,
    pub(crate) text: String,
}

impl Line {
    fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
        }
    }
}

/// Lines reported after a successful conversion: every renderer or cache
/// warning in the order found, the diagram tally, then the PDF location.
pub(crate) fn conversion_report(result: &ConversionResult) -> Vec<Line> {
    let mut lines: Vec<Line> = result
        .warnings
        .iter()
        .map(|w| Line::new(Tone::Attention, format!("Warning: {w}")))
        .collect();

    let tally = if result.diagrams() == 0 {
        "Diagrams: none".to_owned()
    } else {
        format!(
            "Diagrams: {} rendered, {} from cache",
            result.diagrams_rendered, result.diagrams_cache_hits
        )
    };
    lines.push(Line::new(Tone::Plain, tally));
    lines.push(Line::new(
        Tone::Done,
        format!("PDF written to {}", result.output_pdf_path.display()),
    ));
    lines
}

/// Status line for one external tool checked by `mdpdf check`.
pub(crate) fn tool_status_line(
    role: &str,
    tool: &str,
    outcome: &Result<String, ToolError>,
) -> Line {
    match outcome {
        Ok(banner) if banner.is_empty() => Line::new(Tone::Done, format!("{role}: {tool}")),
        Ok(banner) => Line::new(Tone::Done, format!("{role}: {tool} ({banner})")),
        Err(err) => Line::new(Tone::Failed, format!("{role}: {err}")),
    }
}

/// Writes status lines to stderr, colored by [`Tone`].
pub(crate) struct Output {
    term: Term,
    done: Style,
    attention: Style,
    failed: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            done: Style::new().green(),
            attention: Style::new().yellow(),
            failed: Style::new().red(),
        }
    }

    /// Write a single line. Terminal write errors are ignored.
    pub(crate) fn line(&self, line: &Line) {
        let text = match line.tone {
            Tone::Plain => line.text.clone(),
            Tone::Done => self.done.apply_to(&line.text).to_string(),
            Tone::Attention => self.attention.apply_to(&line.text).to_string(),
            Tone::Failed => self.failed.apply_to(&line.text).to_string(),
        };
        let _ = self.term.write_line(&text);
    }

    pub(crate) fn lines(&self, lines: &[Line]) {
        for line in lines {
            self.line(line);
        }
    }

    /// Progress detail such as the input path or the config file in use.
    pub(crate) fn info(&self, msg: &str) {
        self.line(&Line::new(Tone::Plain, msg));
    }

    /// Completed action, e.g. a cache clear.
    pub(crate) fn success(&self, msg: &str) {
        self.line(&Line::new(Tone::Done, msg));
    }

    /// Something the user should look at that did not stop the command.
    pub(crate) fn warning(&self, msg: &str) {
        self.line(&Line::new(Tone::Attention, msg));
    }

    /// Command failure, printed once by `main` before exiting with status 1.
    pub(crate) fn error(&self, msg: &str) {
        self.line(&Line::new(Tone::Failed, format!("Error: {msg}")));
    }
}
