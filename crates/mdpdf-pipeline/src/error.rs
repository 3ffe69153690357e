//! Conversion errors tagged with the stage that failed.

use std::fmt;

use mdpdf_diagrams::{ExtractionError, RenderError, RewriteError, ValidationError};
use mdpdf_pdf::GenerationError;
use mdpdf_workspace::WorkspaceError;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Validation,
    Extraction,
    Workspace,
    Render,
    Rewrite,
    Generation,
}

impl Stage {
    /// Lowercase stage name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Extraction => "extraction",
            Self::Workspace => "workspace",
            Self::Render => "render",
            Self::Rewrite => "rewrite",
            Self::Generation => "generation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A conversion that did not produce a PDF.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// A diagram failed to render.
    #[error("diagram {} (line {line}): {source}", .id + 1)]
    Render {
        id: usize,
        line: usize,
        #[source]
        source: RenderError,
    },

    /// The render worker pool could not be started.
    #[error("failed to start render workers: {0}")]
    WorkerPool(String),

    /// Artifacts and blocks disagree; a bug rather than a user error.
    #[error("internal error: {0}")]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl ConvertError {
    /// The stage that failed.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Validation(_) => Stage::Validation,
            Self::Extraction(_) => Stage::Extraction,
            Self::Workspace(_) => Stage::Workspace,
            Self::Render { .. } | Self::WorkerPool(_) => Stage::Render,
            Self::Rewrite(_) => Stage::Rewrite,
            Self::Generation(_) => Stage::Generation,
        }
    }

    /// Zero-based id of the diagram that failed, if one did.
    #[must_use]
    pub fn block(&self) -> Option<usize> {
        match self {
            Self::Render { id, .. } => Some(*id),
            Self::Validation(ValidationError::EmptyDiagram { id, .. })
            | Self::Rewrite(
                RewriteError::MissingArtifact { id } | RewriteError::InvalidSpan { id, .. },
            ) => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_render_error_names_block() {
        let err = ConvertError::Render {
            id: 2,
            line: 14,
            source: RenderError::Timeout {
                timeout: Duration::from_secs(5),
            },
        };

        assert_eq!(err.stage(), Stage::Render);
        assert_eq!(err.block(), Some(2));
        assert_eq!(err.to_string(), "diagram 3 (line 14): renderer timed out after 5s");
    }

    #[test]
    fn test_validation_stage() {
        let err = ConvertError::from(ValidationError::UnbalancedFence { line: 3 });

        assert_eq!(err.stage(), Stage::Validation);
        assert_eq!(err.block(), None);
        assert_eq!(err.to_string(), "diagram fence opened at line 3 is never closed");
    }

    #[test]
    fn test_empty_diagram_names_block() {
        let err = ConvertError::from(ValidationError::EmptyDiagram { id: 0, line: 5 });

        assert_eq!(err.block(), Some(0));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Generation.to_string(), "generation");
        assert!(Stage::Validation < Stage::Render);
    }
}
