//! Tool invocation errors.

use std::time::Duration;

/// Error returned by an [`ExternalTool`](crate::ExternalTool).
///
/// Payloads are strings so the error is `Clone` and can be shared between
/// workers waiting on the same result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// The process could not be started.
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    /// The process exceeded its time budget and was killed.
    #[error("{program} timed out after {}s", .timeout.as_secs_f64())]
    Timeout { program: String, timeout: Duration },

    /// The run was cancelled because a sibling invocation failed.
    #[error("{program} was cancelled")]
    Cancelled { program: String },

    /// The process exited with a non-zero status.
    #[error("{program} exited with {}: {stderr}", .code.map_or_else(|| "signal".to_owned(), |c| format!("code {c}")))]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// I/O error while supervising the process.
    #[error("I/O error running {program}: {message}")]
    Io { program: String, message: String },
}

impl ToolError {
    /// Whether the failure looks transient and worth a bounded retry.
    ///
    /// Only spawn failures qualify: a renderer that ran and failed will fail
    /// the same way for the same input.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Spawn { .. })
    }

    /// Diagnostic text from the tool, if any.
    #[must_use]
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } if !stderr.is_empty() => Some(stderr),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_display_with_code() {
        let err = ToolError::Failed {
            program: "mmdc".to_owned(),
            code: Some(1),
            stderr: "Parse error on line 2".to_owned(),
        };

        assert_eq!(
            err.to_string(),
            "mmdc exited with code 1: Parse error on line 2"
        );
        assert_eq!(err.stderr(), Some("Parse error on line 2"));
    }

    #[test]
    fn test_failed_display_signal() {
        let err = ToolError::Failed {
            program: "pandoc".to_owned(),
            code: None,
            stderr: String::new(),
        };

        assert!(err.to_string().contains("signal"));
        assert_eq!(err.stderr(), None);
    }

    #[test]
    fn test_only_spawn_is_transient() {
        let spawn = ToolError::Spawn {
            program: "mmdc".to_owned(),
            message: "resource temporarily unavailable".to_owned(),
        };
        let timeout = ToolError::Timeout {
            program: "mmdc".to_owned(),
            timeout: Duration::from_secs(1),
        };

        assert!(spawn.is_transient());
        assert!(!timeout.is_transient());
    }
}
