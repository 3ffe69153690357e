//! Run-scoped scratch directories.
//!
//! A [`Workspace`] is an isolated directory holding every intermediate file of
//! one conversion: diagram sources, rendered images copied from the cache, and
//! the rewritten document. It is removed when the value is dropped, on every
//! exit path. Call [`Workspace::close`] to observe removal errors instead of
//! ignoring them.
//!
//! All paths handed to the workspace are relative and are checked by
//! [`Workspace::resolve`]; anything that would land outside the directory is
//! rejected with [`WorkspaceError::PathEscape`].
//!
//! # Example
//!
//! ```
//! use mdpdf_workspace::Workspace;
//!
//! let ws = Workspace::create(None)?;
//! let path = ws.write_file("diagrams/0.mmd", b"flowchart LR\n  A-->B")?;
//! assert!(path.starts_with(ws.path()));
//! assert!(ws.resolve("../etc/passwd").is_err());
//! ws.close()?;
//! # Ok::<(), mdpdf_workspace::WorkspaceError>(())
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;

/// Prefix of every workspace directory name.
const DIR_PREFIX: &str = "mdpdf-";

/// Workspace lifecycle error.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// The workspace directory could not be created.
    #[error("failed to create workspace under {}: {source}", .root.display())]
    Create {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A relative path would resolve outside the workspace.
    #[error("path escapes workspace: {}", .0.display())]
    PathEscape(PathBuf),

    /// I/O error inside the workspace.
    #[error("workspace I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The workspace directory could not be removed.
    #[error("failed to remove workspace {}: {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An isolated scratch directory removed on drop.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh `mdpdf-XXXX` directory under `root`, or under the system
    /// temp directory when `root` is `None`.
    ///
    /// `root` is created if missing and made absolute, so paths handed to
    /// external tools stay valid whatever their working directory. On unix the
    /// workspace itself is mode 0700.
    pub fn create(root: Option<&Path>) -> Result<Self, WorkspaceError> {
        let requested = root.map_or_else(std::env::temp_dir, Path::to_path_buf);
        let root = std::path::absolute(&requested).map_err(|source| WorkspaceError::Create {
            root: requested.clone(),
            source,
        })?;
        let create_err = |source| WorkspaceError::Create {
            root: root.clone(),
            source,
        };

        fs::create_dir_all(&root).map_err(create_err)?;
        let dir = tempfile::Builder::new()
            .prefix(DIR_PREFIX)
            .tempdir_in(&root)
            .map_err(create_err)?;
        restrict_permissions(dir.path()).map_err(create_err)?;

        tracing::debug!(path = %dir.path().display(), "created workspace");
        Ok(Self { dir })
    }

    /// Absolute path of the workspace directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Resolve a relative path inside the workspace.
    ///
    /// Only plain components (and `.`) are accepted. Absolute paths, `..`,
    /// and Windows prefixes fail with [`WorkspaceError::PathEscape`], as does
    /// a path that resolves to the workspace directory itself.
    pub fn resolve(&self, rel: impl AsRef<Path>) -> Result<PathBuf, WorkspaceError> {
        let rel = rel.as_ref();
        let mut resolved = self.dir.path().to_path_buf();
        let mut depth = 0usize;

        for component in rel.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(WorkspaceError::PathEscape(rel.to_path_buf()));
                }
            }
        }

        if depth == 0 {
            return Err(WorkspaceError::PathEscape(rel.to_path_buf()));
        }
        Ok(resolved)
    }

    /// Write `contents` to `rel`, creating parent directories as needed.
    pub fn write_file(
        &self,
        rel: impl AsRef<Path>,
        contents: impl AsRef<[u8]>,
    ) -> Result<PathBuf, WorkspaceError> {
        let path = self.resolve(rel)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }
        fs::write(&path, contents).map_err(|source| io_error(&path, source))?;
        Ok(path)
    }

    /// Create a directory (and parents) at `rel`.
    pub fn create_dir(&self, rel: impl AsRef<Path>) -> Result<PathBuf, WorkspaceError> {
        let path = self.resolve(rel)?;
        fs::create_dir_all(&path).map_err(|source| io_error(&path, source))?;
        Ok(path)
    }

    /// Copy an external file into the workspace at `rel`.
    pub fn import(
        &self,
        source: impl AsRef<Path>,
        rel: impl AsRef<Path>,
    ) -> Result<PathBuf, WorkspaceError> {
        let source = source.as_ref();
        let path = self.resolve(rel)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        fs::copy(source, &path).map_err(|e| io_error(source, e))?;
        Ok(path)
    }

    /// Remove the workspace, reporting any error.
    ///
    /// Dropping a workspace also removes it but discards the error.
    pub fn close(self) -> Result<(), WorkspaceError> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|source| WorkspaceError::Cleanup {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "removed workspace");
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> WorkspaceError {
    WorkspaceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
