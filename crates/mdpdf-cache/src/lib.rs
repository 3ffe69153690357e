//! Rendered-artifact store for mdpdf.
//!
//! Rendered diagram images are keyed by their content fingerprint and kept
//! across runs so identical diagrams are rendered once. The [`ArtifactStore`]
//! trait decouples the render cache from the storage mechanism:
//!
//! - [`NullCache`]: stores nothing; every lookup misses
//! - [`FileCache`]: directory on disk with version validation, atomic writes,
//!   and optional entry-count eviction
//!
//! # Example
//!
//! ```
//! use mdpdf_cache::{ArtifactStore, NullCache};
//!
//! let store = NullCache;
//! assert!(store.get("3f2a").is_none()); // NullCache always misses
//! ```

mod file;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub use file::FileCache;

/// Error from a persistent artifact store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem error reading or writing the store.
    #[error("cache I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Metadata could not be encoded.
    #[error("failed to encode cache metadata: {0}")]
    Encode(#[from] serde_json::Error),

    /// A fingerprint or format that is not safe to use as a file name.
    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    /// The cache root holds files but no `VERSION` marker.
    #[error(
        "refusing to use {} as a cache: directory is not empty and has no VERSION file",
        .root.display()
    )]
    NotACache { root: PathBuf },
}

impl CacheError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Metadata stored next to each artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Diagram dialect (e.g. `mermaid`).
    pub kind: String,
    /// Image format, also the file extension (e.g. `svg`).
    pub format: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
}

impl ArtifactMeta {
    /// Metadata stamped with the current time.
    #[must_use]
    pub fn now(kind: impl Into<String>, format: impl Into<String>) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        Self {
            kind: kind.into(),
            format: format.into(),
            created_at,
        }
    }

    /// Creation time as a [`SystemTime`].
    #[must_use]
    pub fn created(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.created_at)
    }
}

/// A rendered image associated with one fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    /// Cache key the artifact was stored under.
    pub fingerprint: String,
    /// Location of the image file.
    pub image_path: PathBuf,
    /// Kind, format and creation time.
    pub meta: ArtifactMeta,
}

impl RenderedArtifact {
    /// Image format (file extension).
    #[must_use]
    pub fn format(&self) -> &str {
        &self.meta.format
    }
}

/// Fingerprint-keyed storage for rendered images.
///
/// Implementations must tolerate concurrent use from several render workers
/// and from several processes sharing the same store.
pub trait ArtifactStore: Send + Sync {
    /// Look up an artifact.
    ///
    /// Returns `None` on miss, or when the entry is incomplete or unreadable.
    fn get(&self, fingerprint: &str) -> Option<RenderedArtifact>;

    /// Store the image at `rendered` under `fingerprint`.
    ///
    /// Returns the artifact as it should be used from now on. Stores that do
    /// not persist return an artifact pointing at `rendered` itself.
    fn put(
        &self,
        fingerprint: &str,
        meta: &ArtifactMeta,
        rendered: &Path,
    ) -> Result<RenderedArtifact, CacheError>;

    /// Apply the eviction bound, returning the number of entries removed.
    fn prune(&self) -> Result<usize, CacheError>;

    /// Remove every entry, returning the number removed.
    fn clear(&self) -> Result<usize, CacheError>;

    /// Whether stored artifacts survive the current process.
    fn is_persistent(&self) -> bool;

    /// Take the exclusive right to produce `fingerprint`, blocking while
    /// another holder (possibly another process) has it.
    ///
    /// Callers re-check [`get`](Self::get) after locking. Stores shared only
    /// within one process need no lock.
    fn lock(&self, _fingerprint: &str) -> Result<ArtifactLock, CacheError> {
        Ok(ArtifactLock::unlocked())
    }
}

/// Hold on one fingerprint taken by [`ArtifactStore::lock`], released on drop.
#[derive(Debug)]
#[must_use = "the lock is released as soon as it is dropped"]
pub struct ArtifactLock {
    file: Option<File>,
}

impl ArtifactLock {
    /// A guard that holds nothing.
    pub fn unlocked() -> Self {
        Self { file: None }
    }

    pub(crate) fn held(file: File) -> Self {
        Self { file: Some(file) }
    }

    /// Whether a lock is actually held.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }
}

/// No-op [`ArtifactStore`] used when caching is disabled.
///
/// Every `get` misses; `put` hands back the rendered file in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

impl ArtifactStore for NullCache {
    fn get(&self, _fingerprint: &str) -> Option<RenderedArtifact> {
        None
    }

    fn put(
        &self,
        fingerprint: &str,
        meta: &ArtifactMeta,
        rendered: &Path,
    ) -> Result<RenderedArtifact, CacheError> {
        Ok(RenderedArtifact {
            fingerprint: fingerprint.to_owned(),
            image_path: rendered.to_path_buf(),
            meta: meta.clone(),
        })
    }

    fn prune(&self) -> Result<usize, CacheError> {
        Ok(0)
    }

    fn clear(&self) -> Result<usize, CacheError> {
        Ok(0)
    }

    fn is_persistent(&self) -> bool {
        false
    }
}
