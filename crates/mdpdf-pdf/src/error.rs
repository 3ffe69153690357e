//! PDF generation errors.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mdpdf_tool::ToolError;
use mdpdf_workspace::WorkspaceError;

/// PDF generation failure.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The engine exceeded its time budget and was killed.
    #[error("PDF engine timed out after {}s", .timeout.as_secs_f64())]
    Timeout { timeout: Duration },

    /// The engine exited with a failure status.
    #[error("PDF engine failed: {detail}")]
    Failed { detail: String },

    /// The engine could not be started.
    #[error("failed to start PDF engine: {detail}")]
    Spawn { detail: String },

    /// Generation was cancelled.
    #[error("PDF generation cancelled")]
    Cancelled,

    /// The engine reported success but the output is not a usable PDF.
    #[error("invalid PDF at {}: {reason}", .path.display())]
    InvalidPdf { path: PathBuf, reason: String },

    /// Filesystem error reading or moving the PDF.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be written into the workspace.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

impl GenerationError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn invalid(path: &Path, reason: impl Into<String>) -> Self {
        Self::InvalidPdf {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl From<ToolError> for GenerationError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Timeout { timeout, .. } => Self::Timeout { timeout },
            ToolError::Cancelled { .. } => Self::Cancelled,
            ToolError::Spawn { .. } => Self::Spawn {
                detail: err.to_string(),
            },
            ToolError::Failed { .. } | ToolError::Io { .. } => Self::Failed {
                detail: err.to_string(),
            },
        }
    }
}
