//! External tool invocation for mdpdf.
//!
//! The diagram renderer and the typesetting engine are both external programs.
//! This crate models them as a capability behind the [`ExternalTool`] trait so
//! the rest of the workspace never spawns processes directly:
//!
//! - [`ProcessTool`]: runs a [`CommandTemplate`] as a subprocess with a bounded
//!   timeout, stderr capture, and cooperative cancellation
//! - `MockTool` (feature `mock`): in-memory test double
//!
//! # Exit-code convention
//!
//! Exit code 0 means success. Any other code is reported as
//! [`ToolError::Failed`] carrying the captured stderr.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use mdpdf_tool::{CommandTemplate, ExternalTool, Invocation, ProcessTool};
//!
//! let template = CommandTemplate::new("mmdc", ["-i", "{input}", "-o", "{output}"]);
//! let tool = ProcessTool::new(template);
//!
//! let invocation = Invocation::new("diagram.mmd", "diagram.svg", Duration::from_secs(30));
//! let output = tool.invoke(&invocation)?;
//! println!("{}", output.stderr);
//! # Ok::<(), mdpdf_tool::ToolError>(())
//! ```

mod cancel;
mod command;
mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod process;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use cancel::CancellationToken;
pub use command::CommandTemplate;
pub use error::ToolError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockTool;
pub use process::ProcessTool;

/// A single request to run an external tool.
///
/// `input` and `output` fill the `{input}` and `{output}` placeholders of the
/// command template. Additional placeholders come from [`vars`](Self::vars).
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Path of the file the tool reads.
    pub input: PathBuf,
    /// Path of the file the tool is expected to produce.
    pub output: PathBuf,
    /// Extra `{name}` placeholder values.
    pub vars: BTreeMap<String, String>,
    /// Arguments appended after the expanded template.
    pub extra_args: Vec<String>,
    /// Working directory for the process (inherits the caller's when `None`).
    pub cwd: Option<PathBuf>,
    /// Upper bound on wall-clock run time.
    pub timeout: Duration,
    /// Cancellation shared with sibling invocations of the same run.
    pub cancel: CancellationToken,
}

impl Invocation {
    /// Create an invocation with no extra arguments and a fresh cancellation token.
    #[must_use]
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            vars: BTreeMap::new(),
            extra_args: Vec::new(),
            cwd: None,
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Set a `{name}` placeholder value.
    #[must_use]
    pub fn var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Append arguments after the expanded template.
    #[must_use]
    pub fn extra_args(mut self, args: &[String]) -> Self {
        self.extra_args.extend_from_slice(args);
        self
    }

    /// Run the process in `dir`.
    #[must_use]
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Share a cancellation token with this invocation.
    #[must_use]
    pub fn cancel_with(mut self, token: &CancellationToken) -> Self {
        self.cancel = token.clone();
        self
    }

    /// Input path as a `&Path`.
    #[must_use]
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Output path as a `&Path`.
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }
}

/// Captured result of a successful tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8). Tools often print warnings here
    /// even on success.
    pub stderr: String,
    /// Wall-clock run time.
    pub elapsed: Duration,
}

/// An external program the pipeline depends on.
///
/// Implementations must be shareable across render workers.
pub trait ExternalTool: Send + Sync {
    /// Short name used in logs and errors (usually the program name).
    fn name(&self) -> &str;

    /// Run the tool once.
    ///
    /// Returns `Ok` only when the tool exited successfully. Output-file
    /// validation is the caller's responsibility.
    fn invoke(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError>;

    /// Check that the tool is installed, returning its version banner.
    fn probe(&self) -> Result<String, ToolError>;
}
