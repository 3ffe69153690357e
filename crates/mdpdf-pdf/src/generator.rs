//! Typesetting engine adapter.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mdpdf_diagrams::RewrittenDocument;
use mdpdf_tool::{CancellationToken, ExternalTool, Invocation};
use mdpdf_workspace::Workspace;

use crate::{GenerationError, validate_pdf};

/// Default LaTeX engine passed as `{engine}`.
pub const DEFAULT_ENGINE: &str = "xelatex";

/// Default time budget for one PDF generation.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(300);

const DOCUMENT_FILE: &str = "document.md";
const OUTPUT_FILE: &str = "document.pdf";

/// Default engine options: one-inch margins on A4 article pages.
#[must_use]
pub fn default_options() -> Vec<String> {
    [
        "-V",
        "geometry:margin=1in",
        "-V",
        "documentclass:article",
        "-V",
        "papersize:a4",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

/// Engine settings for one generation.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine name substituted for `{engine}`.
    pub engine: String,
    /// Options appended after the templated arguments.
    pub options: Vec<String>,
    /// Time budget.
    pub timeout: Duration,
    /// Document title, emitted as a `% title` block.
    pub title: Option<String>,
    /// Working directory for the engine, so relative references in the
    /// document (local images) resolve against the source directory.
    pub resource_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine: DEFAULT_ENGINE.to_owned(),
            options: default_options(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
            title: None,
            resource_dir: None,
        }
    }
}

/// Produces a PDF from a rewritten document.
pub struct PdfGenerator {
    tool: Arc<dyn ExternalTool>,
    config: EngineConfig,
    cancel: CancellationToken,
}

impl PdfGenerator {
    /// Create a generator running `tool` with `config`.
    #[must_use]
    pub fn new(tool: Arc<dyn ExternalTool>, config: EngineConfig) -> Self {
        Self {
            tool,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Share a cancellation token with the engine invocation.
    #[must_use]
    pub fn with_cancel(mut self, token: &CancellationToken) -> Self {
        self.cancel = token.clone();
        self
    }

    /// Engine settings.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Write `document` into `workspace` and typeset it.
    ///
    /// Returns the path of the validated PDF inside the workspace; move it
    /// out with [`persist`](crate::persist) before the workspace is closed.
    pub fn generate(
        &self,
        document: &RewrittenDocument,
        workspace: &Workspace,
    ) -> Result<PathBuf, GenerationError> {
        let input = workspace.write_file(DOCUMENT_FILE, self.source_text(document))?;
        let output = workspace.resolve(OUTPUT_FILE)?;

        let mut invocation = Invocation::new(&input, &output, self.config.timeout)
            .var("engine", &self.config.engine)
            .extra_args(&self.config.options)
            .cancel_with(&self.cancel);
        if let Some(dir) = &self.config.resource_dir {
            invocation = invocation.cwd(dir);
        }

        tracing::info!(
            engine = %self.config.engine,
            tool = self.tool.name(),
            "generating PDF"
        );
        let result = self.tool.invoke(&invocation)?;

        let stderr = result.stderr.trim();
        if !stderr.is_empty() {
            tracing::debug!(tool = self.tool.name(), "engine output: {stderr}");
        }

        let size = validate_pdf(&output)?;
        tracing::info!(
            size,
            "generated PDF in {:.2}s",
            result.elapsed.as_secs_f64()
        );
        Ok(output)
    }

    /// Check that the engine is installed, returning its version banner.
    pub fn probe(&self) -> Result<String, GenerationError> {
        Ok(self.tool.probe()?)
    }

    fn source_text(&self, document: &RewrittenDocument) -> String {
        match self.config.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => {
                let title = title.replace(['\r', '\n'], " ");
                format!("% {title}\n\n{}", document.as_str())
            }
            _ => document.as_str().to_owned(),
        }
    }
}

impl std::fmt::Debug for PdfGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfGenerator")
            .field("tool", &self.tool.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
