//! File-based artifact store.
//!
//! [`FileCache`] keeps each artifact as two files named after its
//! fingerprint: the image itself and a JSON metadata sidecar. The sidecar is
//! written last, so an entry is visible only once its image is complete.
//!
//! Both files are written to a temporary file in the same directory and then
//! renamed into place. Readers in other processes therefore see either the
//! previous state or the complete new entry, never a partial file.
//!
//! On open, [`FileCache`] validates a `VERSION` file in the cache root. If the
//! version mismatches, the directories the cache owns are wiped so artifacts
//! from an incompatible build are never used. A missing `VERSION` is only
//! accepted for a root holding nothing but cache files; anything else might
//! be a user directory and is refused with [`CacheError::NotACache`].
//!
//! Producing an entry is serialized per fingerprint with an advisory lock
//! file, so processes sharing one store render each diagram once.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{ArtifactLock, ArtifactMeta, ArtifactStore, CacheError, RenderedArtifact};

const ARTIFACTS_DIR: &str = "artifacts";
const LOCKS_DIR: &str = "locks";
const VERSION_FILE: &str = "VERSION";
const VERSION_TMP_PREFIX: &str = ".VERSION";
const META_EXT: &str = "json";
const LOCK_EXT: &str = "lock";

/// File-based [`ArtifactStore`] rooted at a directory on disk.
///
/// Directory layout:
/// ```text
/// {root}/
/// +-- VERSION                    # cache format version
/// +-- artifacts/
/// |   +-- {fingerprint}.svg      # rendered image
/// |   +-- {fingerprint}.json     # kind, format, created_at
/// +-- locks/
///     +-- {fingerprint}.lock     # held while the entry is produced
/// ```
///
/// Without [`max_entries`](Self::with_max_entries) the store grows without
/// bound; entries are only removed by [`clear`](ArtifactStore::clear).
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
    artifacts: PathBuf,
    locks: PathBuf,
    max_entries: Option<usize>,
}

impl FileCache {
    /// Open the store at `root`, wiping its entries if its `VERSION` differs
    /// from `version`.
    ///
    /// Fails with [`CacheError::NotACache`] if `root` is a non-empty
    /// directory without a `VERSION` file.
    pub fn open(root: impl Into<PathBuf>, version: &str) -> Result<Self, CacheError> {
        let root = root.into();
        validate_version(&root, version)?;

        let artifacts = root.join(ARTIFACTS_DIR);
        let locks = root.join(LOCKS_DIR);
        for dir in [&artifacts, &locks] {
            fs::create_dir_all(dir).map_err(|e| CacheError::io(dir, e))?;
        }

        Ok(Self {
            root,
            artifacts,
            locks,
            max_entries: None,
        })
    }

    /// Bound the store to `max_entries`, evicting oldest entries first.
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        match max_entries {
            Some(max) => tracing::debug!(max, "artifact cache bounded"),
            None => tracing::info!(
                root = %self.root.display(),
                "artifact cache has no entry limit and will grow until cleared"
            ),
        }
        self.max_entries = max_entries;
        self
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Configured entry bound.
    #[must_use]
    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// All complete entries, oldest first.
    pub fn entries(&self) -> Result<Vec<(String, ArtifactMeta)>, CacheError> {
        let read_dir =
            fs::read_dir(&self.artifacts).map_err(|e| CacheError::io(&self.artifacts, e))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let path = entry.map_err(|e| CacheError::io(&self.artifacts, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(META_EXT) {
                continue;
            }
            let Some(fingerprint) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(meta) = read_meta(&path) {
                entries.push((fingerprint.to_owned(), meta));
            }
        }
        entries.sort_by(|a, b| {
            a.1.created_at
                .cmp(&b.1.created_at)
                .then_with(|| a.0.cmp(&b.0))
        });
        Ok(entries)
    }

    fn meta_path(&self, fingerprint: &str) -> PathBuf {
        self.artifacts.join(format!("{fingerprint}.{META_EXT}"))
    }

    fn image_path(&self, fingerprint: &str, format: &str) -> PathBuf {
        self.artifacts.join(format!("{fingerprint}.{format}"))
    }

    fn lock_path(&self, fingerprint: &str) -> PathBuf {
        self.locks.join(format!("{fingerprint}.{LOCK_EXT}"))
    }

    /// Evict oldest entries beyond the bound, never touching `keep`.
    fn evict(&self, keep: Option<&str>) -> Result<usize, CacheError> {
        let Some(max) = self.max_entries else {
            return Ok(0);
        };

        let entries = self.entries()?;
        let excess = entries.len().saturating_sub(max);
        let mut removed = 0;
        for (fingerprint, meta) in entries
            .iter()
            .filter(|(fp, _)| Some(fp.as_str()) != keep)
            .take(excess)
        {
            self.remove(fingerprint, &meta.format)?;
            removed += 1;
        }

        if removed > 0 {
            tracing::debug!(removed, max, "evicted cached artifacts");
        }
        Ok(removed)
    }

    fn remove(&self, fingerprint: &str, format: &str) -> Result<(), CacheError> {
        // Sidecar first so readers stop seeing the entry before the image goes.
        remove_if_exists(&self.meta_path(fingerprint))?;
        remove_if_exists(&self.image_path(fingerprint, format))?;
        remove_if_exists(&self.lock_path(fingerprint))
    }

    fn write_atomic(
        &self,
        target: &Path,
        write: impl FnOnce(&mut File) -> io::Result<()>,
    ) -> Result<(), CacheError> {
        let mut tmp =
            NamedTempFile::new_in(&self.artifacts).map_err(|e| CacheError::io(&self.artifacts, e))?;
        write(tmp.as_file_mut()).map_err(|e| CacheError::io(tmp.path(), e))?;
        tmp.persist(target).map_err(|e| CacheError::io(target, e.error))?;
        Ok(())
    }
}

impl ArtifactStore for FileCache {
    fn get(&self, fingerprint: &str) -> Option<RenderedArtifact> {
        if validate_key(fingerprint).is_err() {
            return None;
        }
        let meta = read_meta(&self.meta_path(fingerprint))?;
        if validate_key(&meta.format).is_err() {
            return None;
        }

        let image_path = self.image_path(fingerprint, &meta.format);
        let len = fs::metadata(&image_path).ok()?.len();
        if len == 0 {
            return None;
        }

        Some(RenderedArtifact {
            fingerprint: fingerprint.to_owned(),
            image_path,
            meta,
        })
    }

    fn put(
        &self,
        fingerprint: &str,
        meta: &ArtifactMeta,
        rendered: &Path,
    ) -> Result<RenderedArtifact, CacheError> {
        validate_key(fingerprint)?;
        validate_key(&meta.format)?;

        let image_path = self.image_path(fingerprint, &meta.format);
        let mut source = File::open(rendered).map_err(|e| CacheError::io(rendered, e))?;
        self.write_atomic(&image_path, |file| io::copy(&mut source, file).map(|_| ()))?;

        let encoded = serde_json::to_vec(meta)?;
        self.write_atomic(&self.meta_path(fingerprint), |file| file.write_all(&encoded))?;

        tracing::debug!(fingerprint, format = %meta.format, "stored artifact");

        if let Err(e) = self.evict(Some(fingerprint)) {
            tracing::warn!("artifact cache eviction failed: {e}");
        }

        Ok(RenderedArtifact {
            fingerprint: fingerprint.to_owned(),
            image_path,
            meta: meta.clone(),
        })
    }

    fn prune(&self) -> Result<usize, CacheError> {
        self.evict(None)
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let count = self.entries()?.len();
        for dir in [&self.artifacts, &self.locks] {
            remove_dir_if_exists(dir)?;
            fs::create_dir_all(dir).map_err(|e| CacheError::io(dir, e))?;
        }
        tracing::info!(count, root = %self.root.display(), "cleared artifact cache");
        Ok(count)
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn lock(&self, fingerprint: &str) -> Result<ArtifactLock, CacheError> {
        validate_key(fingerprint)?;

        let path = self.lock_path(fingerprint);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| CacheError::io(&path, e))?;
        file.lock().map_err(|e| CacheError::io(&path, e))?;

        tracing::debug!(fingerprint, "locked artifact");
        Ok(ArtifactLock::held(file))
    }
}

/// Keys become file names, so only ASCII alphanumerics are accepted.
fn validate_key(key: &str) -> Result<(), CacheError> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(CacheError::InvalidKey(key.to_owned()));
    }
    Ok(())
}

fn read_meta(path: &Path) -> Option<ArtifactMeta> {
    let bytes = fs::read(path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(meta) => Some(meta),
        Err(e) => {
            tracing::debug!(path = %path.display(), "ignoring unreadable cache metadata: {e}");
            None
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<(), CacheError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(CacheError::io(path, e)),
        _ => Ok(()),
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<(), CacheError> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(CacheError::io(path, e)),
        _ => Ok(()),
    }
}

/// Whether `root` holds anything besides the files a cache creates.
///
/// Cache-owned names are tolerated so a store another process is
/// initializing right now is not mistaken for a user directory.
fn has_foreign_entries(root: &Path) -> Result<bool, CacheError> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(CacheError::io(root, e)),
    };
    for entry in entries {
        let name = entry.map_err(|e| CacheError::io(root, e))?.file_name();
        let owned = name.to_str().is_some_and(|name| {
            [VERSION_FILE, ARTIFACTS_DIR, LOCKS_DIR].contains(&name)
                || name.starts_with(VERSION_TMP_PREFIX)
        });
        if !owned {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Validate the cache version, wiping the owned directories on mismatch.
///
/// Only `artifacts/` and `locks/` are ever removed; other files under the
/// root are left alone.
fn validate_version(root: &Path, version: &str) -> Result<(), CacheError> {
    let version_file = root.join(VERSION_FILE);

    match fs::read_to_string(&version_file) {
        Ok(stored) if stored == version => {
            tracing::debug!("cache version matches: {version}");
            return Ok(());
        }
        Ok(stored) => {
            tracing::info!(
                "cache version mismatch (stored={stored}, current={version}), wiping cache"
            );
            for dir in [ARTIFACTS_DIR, LOCKS_DIR] {
                remove_dir_if_exists(&root.join(dir))?;
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if has_foreign_entries(root)? {
                return Err(CacheError::NotACache {
                    root: root.to_path_buf(),
                });
            }
            tracing::debug!("no cache VERSION file found, initializing cache");
        }
        Err(e) => return Err(CacheError::io(&version_file, e)),
    }

    fs::create_dir_all(root).map_err(|e| CacheError::io(root, e))?;
    let mut tmp = tempfile::Builder::new()
        .prefix(VERSION_TMP_PREFIX)
        .tempfile_in(root)
        .map_err(|e| CacheError::io(root, e))?;
    tmp.write_all(version.as_bytes())
        .map_err(|e| CacheError::io(tmp.path(), e))?;
    tmp.persist(&version_file)
        .map_err(|e| CacheError::io(&version_file, e.error))?;
    Ok(())
}
