//! Source documents.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::ValidationError;

/// A Markdown document and the path it was read from.
///
/// Immutable once loaded; rewriting produces a new
/// [`RewrittenDocument`](crate::RewrittenDocument).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    text: String,
}

impl Document {
    /// Wrap in-memory text. `path` is informational only.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Read a document from disk.
    ///
    /// Fails with [`ValidationError::NotFound`] or
    /// [`ValidationError::PermissionDenied`] when the path cannot be read, and
    /// [`ValidationError::Unreadable`] for any other I/O error, including
    /// content that is not UTF-8.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| read_error(path, &e))?;
        Ok(Self::new(path, text))
    }

    /// Path the document was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full document text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Size of the text in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the document has no content at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

pub(crate) fn read_error(path: &Path, err: &io::Error) -> ValidationError {
    let path = path.to_path_buf();
    match err.kind() {
        io::ErrorKind::NotFound => ValidationError::NotFound { path },
        io::ErrorKind::PermissionDenied => ValidationError::PermissionDenied { path },
        _ => ValidationError::Unreadable {
            path,
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.md");
        fs::write(&path, "# Title\n").unwrap();

        let doc = Document::load(&path).unwrap();

        assert_eq!(doc.path(), path);
        assert_eq!(doc.text(), "# Title\n");
        assert_eq!(doc.len(), 8);
    }

    #[test]
    fn test_load_missing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing.md");

        let err = Document::load(&path).unwrap_err();

        assert_eq!(err, ValidationError::NotFound { path });
    }

    #[test]
    fn test_load_invalid_utf8() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.md");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let err = Document::load(&path).unwrap_err();

        assert!(matches!(err, ValidationError::Unreadable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.md");
        fs::write(&path, "# Title").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

        let result = Document::load(&path);

        // Root can read anything; only assert when the OS denied access.
        if let Err(err) = result {
            assert_eq!(err, ValidationError::PermissionDenied { path });
        }
    }
}
