//! Diagram renderer adapter.
//!
//! Runs the external renderer once per diagram: the source is written to a
//! temporary file next to the expected output, the tool is invoked with a
//! bounded timeout, and the output file is checked before it is handed back.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mdpdf_tool::{CancellationToken, ExternalTool, Invocation, ToolError, ToolOutput};

use crate::{DiagramBlock, DiagramFormat, DiagramKind, Fingerprint, FingerprintKey};

/// Default time budget for one render.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of retries after a failed spawn.
pub const DEFAULT_SPAWN_RETRIES: u32 = 2;

/// Base delay between spawn retries; grows linearly per attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Diagram rendering failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The renderer exceeded its time budget and was killed.
    #[error("renderer timed out after {}s", .timeout.as_secs_f64())]
    Timeout { timeout: Duration },

    /// The renderer exited with a failure status.
    #[error("renderer failed: {detail}")]
    Failed { detail: String },

    /// The renderer could not be started.
    #[error("failed to start renderer: {detail}")]
    Spawn { detail: String },

    /// The render was cancelled because another diagram failed.
    #[error("render cancelled")]
    Cancelled,

    /// The renderer succeeded but wrote no output file.
    #[error("renderer produced no output at {}", .path.display())]
    MissingOutput { path: PathBuf },

    /// The renderer succeeded but the output file is empty.
    #[error("renderer produced an empty file at {}", .path.display())]
    EmptyOutput { path: PathBuf },

    /// Filesystem error around the render.
    #[error("render I/O error: {detail}")]
    Io { detail: String },
}

impl From<ToolError> for RenderError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Timeout { timeout, .. } => Self::Timeout { timeout },
            ToolError::Cancelled { .. } => Self::Cancelled,
            ToolError::Spawn { .. } => Self::Spawn {
                detail: err.to_string(),
            },
            ToolError::Failed { .. } => Self::Failed {
                detail: err.to_string(),
            },
            ToolError::Io { .. } => Self::Io {
                detail: err.to_string(),
            },
        }
    }
}

/// A successfully rendered image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    /// The image file.
    pub path: PathBuf,
    /// Renderer stderr, if it printed anything.
    pub diagnostics: Option<String>,
}

/// Renders diagram sources through an [`ExternalTool`].
#[derive(Clone)]
pub struct DiagramRenderer {
    tool: Arc<dyn ExternalTool>,
    format: DiagramFormat,
    timeout: Duration,
    spawn_retries: u32,
    retry_backoff: Duration,
    identity: String,
    cancel: CancellationToken,
}

impl DiagramRenderer {
    /// Create a renderer producing SVG with default timeout and retries.
    ///
    /// The renderer identity defaults to the tool name; set the full command
    /// line with [`with_identity`](Self::with_identity) so that changing it
    /// invalidates cached artifacts.
    #[must_use]
    pub fn new(tool: Arc<dyn ExternalTool>) -> Self {
        let identity = tool.name().to_owned();
        Self {
            tool,
            format: DiagramFormat::default(),
            timeout: DEFAULT_RENDER_TIMEOUT,
            spawn_retries: DEFAULT_SPAWN_RETRIES,
            retry_backoff: RETRY_BACKOFF,
            identity,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the output image format.
    #[must_use]
    pub fn with_format(mut self, format: DiagramFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the per-render time budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how many times a failed spawn is retried.
    #[must_use]
    pub fn with_spawn_retries(mut self, retries: u32) -> Self {
        self.spawn_retries = retries;
        self
    }

    /// Set the base delay between spawn retries.
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Set the identity string mixed into fingerprints.
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Share a cancellation token with every render.
    #[must_use]
    pub fn with_cancel(mut self, token: &CancellationToken) -> Self {
        self.cancel = token.clone();
        self
    }

    /// Output image format.
    #[must_use]
    pub fn format(&self) -> DiagramFormat {
        self.format
    }

    /// Per-render time budget.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Identity mixed into fingerprints.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The cancellation token renders observe.
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fingerprint of `block` as rendered by this renderer.
    #[must_use]
    pub fn fingerprint(&self, block: &DiagramBlock) -> Fingerprint {
        FingerprintKey {
            kind: block.kind,
            renderer: &self.identity,
            format: self.format,
            source: &block.source,
        }
        .compute()
    }

    /// Render `source` into `output_dir`, returning the image path.
    pub fn render(
        &self,
        source: &str,
        kind: DiagramKind,
        output_dir: &Path,
    ) -> Result<PathBuf, RenderError> {
        self.render_output(source, kind, output_dir)
            .map(|output| output.path)
    }

    /// Render `source` into `output_dir`, keeping the renderer's diagnostics.
    pub fn render_output(
        &self,
        source: &str,
        kind: DiagramKind,
        output_dir: &Path,
    ) -> Result<RenderOutput, RenderError> {
        let io = |e: std::io::Error| RenderError::Io {
            detail: e.to_string(),
        };

        // Removed on drop, after the render.
        let mut input = tempfile::Builder::new()
            .prefix("diagram-")
            .suffix(&format!(".{}", kind.source_extension()))
            .tempfile_in(output_dir)
            .map_err(io)?;
        input.write_all(source.as_bytes()).map_err(io)?;
        input.flush().map_err(io)?;

        let output = input.path().with_extension(self.format.as_str());
        let invocation =
            Invocation::new(input.path(), &output, self.timeout).cancel_with(&self.cancel);

        let result = self.invoke(&invocation)?;

        match fs::metadata(&output) {
            Ok(meta) if meta.len() > 0 => {}
            Ok(_) => return Err(RenderError::EmptyOutput { path: output }),
            Err(_) => return Err(RenderError::MissingOutput { path: output }),
        }

        let stderr = result.stderr.trim();
        let diagnostics = (!stderr.is_empty()).then(|| stderr.to_owned());
        if let Some(text) = &diagnostics {
            tracing::warn!(tool = self.tool.name(), "renderer reported: {text}");
        }

        tracing::debug!(
            path = %output.display(),
            "rendered {kind} diagram in {:.2}s",
            result.elapsed.as_secs_f64()
        );

        Ok(RenderOutput {
            path: output,
            diagnostics,
        })
    }

    /// Invoke the tool, retrying spawn failures with linear backoff.
    fn invoke(&self, invocation: &Invocation) -> Result<ToolOutput, RenderError> {
        let mut attempt = 0;
        loop {
            match self.tool.invoke(invocation) {
                Ok(output) => return Ok(output),
                Err(e) if e.is_transient() && attempt < self.spawn_retries => {
                    attempt += 1;
                    tracing::warn!(
                        tool = self.tool.name(),
                        attempt,
                        max = self.spawn_retries,
                        "{e}, retrying"
                    );
                    thread::sleep(self.retry_backoff * attempt);
                    if self.cancel.is_cancelled() {
                        return Err(RenderError::Cancelled);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl std::fmt::Debug for DiagramRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramRenderer")
            .field("tool", &self.tool.name())
            .field("format", &self.format)
            .field("timeout", &self.timeout)
            .field("spawn_retries", &self.spawn_retries)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdpdf_tool::MockTool;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn renderer(tool: MockTool) -> (DiagramRenderer, Arc<MockTool>) {
        let tool = Arc::new(tool);
        let renderer = DiagramRenderer::new(Arc::clone(&tool) as Arc<dyn ExternalTool>)
            .with_retry_backoff(Duration::from_millis(1));
        (renderer, tool)
    }

    #[test]
    fn test_render_success() {
        let tmp = TempDir::new().unwrap();
        let (renderer, tool) = renderer(MockTool::new("mmdc").with_output(b"<svg>ok</svg>"));

        let path = renderer
            .render("graph TD", DiagramKind::Mermaid, tmp.path())
            .unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"<svg>ok</svg>");
        assert_eq!(path.extension().unwrap(), "svg");
        assert_eq!(tool.invocations(), 1);
        let call = &tool.calls()[0];
        assert_eq!(call.input().extension().unwrap(), "mmd");
        assert_eq!(call.output(), path);
        assert_eq!(call.timeout, DEFAULT_RENDER_TIMEOUT);
    }

    #[test]
    fn test_render_removes_source_file() {
        let tmp = TempDir::new().unwrap();
        let (renderer, _) = renderer(MockTool::new("mmdc"));

        renderer
            .render("graph TD", DiagramKind::Mermaid, tmp.path())
            .unwrap();

        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].extension().unwrap(), "svg");
    }

    #[test]
    fn test_format_sets_extension() {
        let tmp = TempDir::new().unwrap();
        let (renderer, _) = renderer(MockTool::new("mmdc").with_output(b"\x89PNG"));
        let renderer = renderer.with_format(DiagramFormat::Png);

        let path = renderer
            .render("graph TD", DiagramKind::Mermaid, tmp.path())
            .unwrap();

        assert_eq!(path.extension().unwrap(), "png");
    }

    #[test]
    fn test_missing_output() {
        let tmp = TempDir::new().unwrap();
        let (renderer, _) = renderer(MockTool::new("mmdc").without_output());

        let err = renderer
            .render("graph TD", DiagramKind::Mermaid, tmp.path())
            .unwrap_err();

        assert!(matches!(err, RenderError::MissingOutput { .. }));
    }

    #[test]
    fn test_empty_output() {
        let tmp = TempDir::new().unwrap();
        let (renderer, _) = renderer(MockTool::new("mmdc").with_output(b""));

        let err = renderer
            .render("graph TD", DiagramKind::Mermaid, tmp.path())
            .unwrap_err();

        assert!(matches!(err, RenderError::EmptyOutput { .. }));
    }

    #[test]
    fn test_failure_carries_stderr() {
        let tmp = TempDir::new().unwrap();
        let (renderer, tool) = renderer(MockTool::new("mmdc").failing("Parse error on line 2"));

        let err = renderer
            .render("graph TD", DiagramKind::Mermaid, tmp.path())
            .unwrap_err();

        match err {
            RenderError::Failed { detail } => assert!(detail.contains("Parse error on line 2")),
            other => panic!("unexpected error: {other:?}"),
        }
        // Deterministic failures are not retried
        assert_eq!(tool.invocations(), 1);
    }

    #[test]
    fn test_timeout() {
        let tmp = TempDir::new().unwrap();
        let (renderer, _) = renderer(MockTool::new("mmdc").with_delay(Duration::from_secs(5)));
        let renderer = renderer.with_timeout(Duration::from_millis(50));

        let err = renderer
            .render("graph TD", DiagramKind::Mermaid, tmp.path())
            .unwrap_err();

        assert_eq!(
            err,
            RenderError::Timeout {
                timeout: Duration::from_millis(50)
            }
        );
    }

    #[test]
    fn test_spawn_failures_retried() {
        let tmp = TempDir::new().unwrap();
        let (renderer, tool) = renderer(MockTool::new("mmdc").with_spawn_failures(2, b"<svg/>"));

        renderer
            .render("graph TD", DiagramKind::Mermaid, tmp.path())
            .unwrap();

        assert_eq!(tool.invocations(), 3);
    }

    #[test]
    fn test_spawn_retries_bounded() {
        let tmp = TempDir::new().unwrap();
        let (renderer, tool) = renderer(MockTool::new("mmdc").with_spawn_failures(5, b"<svg/>"));
        let renderer = renderer.with_spawn_retries(1);

        let err = renderer
            .render("graph TD", DiagramKind::Mermaid, tmp.path())
            .unwrap_err();

        assert!(matches!(err, RenderError::Spawn { .. }));
        assert_eq!(tool.invocations(), 2);
    }

    #[test]
    fn test_cancelled() {
        let tmp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let (renderer, _) = renderer(MockTool::new("mmdc"));
        let renderer = renderer.with_cancel(&token);

        let err = renderer
            .render("graph TD", DiagramKind::Mermaid, tmp.path())
            .unwrap_err();

        assert_eq!(err, RenderError::Cancelled);
    }

    #[test]
    fn test_fingerprint_depends_on_identity() {
        let (renderer, _) = renderer(MockTool::new("mmdc"));
        let block = crate::DiagramBlock {
            id: 0,
            start: 0,
            end: 0,
            line: 1,
            kind: DiagramKind::Mermaid,
            source: "graph TD".to_owned(),
            delimiter: crate::Delimiter::Fence,
        };

        let default = renderer.fingerprint(&block);
        let salted = renderer.clone().with_identity("mmdc 11").fingerprint(&block);

        assert_eq!(renderer.identity(), "mmdc");
        assert_ne!(default, salted);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_renderer_receives_source() {
        use mdpdf_tool::{CommandTemplate, ProcessTool};

        let tmp = TempDir::new().unwrap();
        let tool = ProcessTool::new(CommandTemplate::new(
            "sh",
            ["-c", "cp \"$0\" \"$1\"", "{input}", "{output}"],
        ));
        let renderer = DiagramRenderer::new(Arc::new(tool));

        let path = renderer
            .render("flowchart A-->B", DiagramKind::Mermaid, tmp.path())
            .unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "flowchart A-->B");
    }
}
