//! Render cache with per-fingerprint mutual exclusion.
//!
//! [`RenderCache`] sits between the pipeline and the [`DiagramRenderer`].
//! For each fingerprint it consults the persistent [`ArtifactStore`] first and
//! renders only on a miss. Concurrent requests for the same fingerprint share
//! one slot: the first caller resolves it, the rest block until it is filled
//! and reuse the result, so a diagram is rendered at most once per run.
//!
//! Failures are memoized for the lifetime of the cache as well; a diagram
//! that failed once fails the same way for every other block that shares its
//! fingerprint.
//!
//! Every artifact handed out lives in the scratch directory: stored images
//! are copied there on a hit, fresh renders stay where the renderer wrote
//! them. Eviction from the store, by this run or another process, therefore
//! never invalidates an outcome. A stored entry that disappears before it is
//! copied counts as a miss.
//!
//! On a miss the store's per-fingerprint [`lock`](ArtifactStore::lock) is
//! held across the re-check, render and store, so runs sharing a persistent
//! store render each diagram once between them.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use mdpdf_cache::{ArtifactMeta, ArtifactStore, RenderedArtifact};

use crate::{DiagramBlock, DiagramRenderer, Fingerprint, RenderError};

/// How a diagram's image was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Found in the store or already resolved earlier in this run.
    Hit,
    /// Rendered and stored.
    Rendered,
    /// Rendered, but storing the artifact failed.
    RenderedUncached,
}

/// Result of [`RenderCache::get_or_render`].
#[derive(Debug, Clone)]
pub struct CacheOutcome {
    /// Fingerprint the artifact is keyed by.
    pub fingerprint: Fingerprint,
    /// The image to embed.
    pub artifact: RenderedArtifact,
    /// Whether the image was rendered for this request.
    pub status: CacheStatus,
    /// Non-fatal problems: renderer diagnostics, store failures.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
struct Resolved {
    artifact: RenderedArtifact,
    status: CacheStatus,
    warnings: Vec<String>,
}

type Slot = Arc<OnceLock<Result<Resolved, RenderError>>>;

/// Fingerprint-keyed front for an [`ArtifactStore`].
pub struct RenderCache {
    store: Arc<dyn ArtifactStore>,
    scratch: PathBuf,
    slots: Mutex<HashMap<Fingerprint, Slot>>,
}

impl RenderCache {
    /// Create a cache over `store`. Renders are written into `scratch`.
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>, scratch: impl Into<PathBuf>) -> Self {
        Self {
            store,
            scratch: scratch.into(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Directory renders are written into.
    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch
    }

    /// Number of fingerprints resolved or in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been requested yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the artifact for `block`, rendering it if no stored copy exists.
    ///
    /// Safe to call from many threads. At most one render per fingerprint
    /// runs; other callers for the same fingerprint wait for it and receive
    /// its result with [`CacheStatus::Hit`].
    pub fn get_or_render(
        &self,
        block: &DiagramBlock,
        renderer: &DiagramRenderer,
    ) -> Result<CacheOutcome, RenderError> {
        let fingerprint = renderer.fingerprint(block);
        let slot = self.slot(&fingerprint);

        let mut resolved_here = false;
        let result = slot.get_or_init(|| {
            resolved_here = true;
            self.resolve(&fingerprint, block, renderer)
        });

        let resolved = result.as_ref().map_err(Clone::clone)?;
        if !resolved_here {
            tracing::debug!(
                diagram = block.id + 1,
                fingerprint = %fingerprint,
                "reusing diagram resolved earlier in this run"
            );
        }

        Ok(CacheOutcome {
            fingerprint,
            artifact: resolved.artifact.clone(),
            status: if resolved_here {
                resolved.status
            } else {
                CacheStatus::Hit
            },
            warnings: if resolved_here {
                resolved.warnings.clone()
            } else {
                Vec::new()
            },
        })
    }

    fn slot(&self, fingerprint: &Fingerprint) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(fingerprint.clone()).or_default())
    }

    fn resolve(
        &self,
        fingerprint: &Fingerprint,
        block: &DiagramBlock,
        renderer: &DiagramRenderer,
    ) -> Result<Resolved, RenderError> {
        if let Some(resolved) = self.lookup(fingerprint, block)? {
            return Ok(resolved);
        }

        let label = format!("diagram {} (line {})", block.id + 1, block.line);
        let mut warnings = Vec::new();

        let _lock = match self.store.lock(fingerprint.as_str()) {
            Ok(lock) => {
                if lock.is_held()
                    && let Some(resolved) = self.lookup(fingerprint, block)?
                {
                    return Ok(resolved);
                }
                Some(lock)
            }
            Err(e) => {
                tracing::warn!(fingerprint = %fingerprint, "failed to lock cache entry: {e}");
                warnings.push(format!("{label}: cache lock unavailable: {e}"));
                None
            }
        };

        tracing::debug!(
            diagram = block.id + 1,
            fingerprint = %fingerprint,
            "cache miss, rendering"
        );
        let output = renderer.render_output(&block.source, block.kind, &self.scratch)?;

        warnings.extend(
            output
                .diagnostics
                .iter()
                .map(|text| format!("{label}: renderer reported: {text}")),
        );

        let meta = ArtifactMeta::now(block.kind.as_str(), renderer.format().as_str());
        match self.store.put(fingerprint.as_str(), &meta, &output.path) {
            Ok(stored) => Ok(Resolved {
                artifact: RenderedArtifact {
                    image_path: output.path,
                    ..stored
                },
                status: CacheStatus::Rendered,
                warnings,
            }),
            Err(e) => {
                tracing::warn!(
                    fingerprint = %fingerprint,
                    "failed to store rendered diagram: {e}"
                );
                warnings.push(format!("{label}: not cached: {e}"));
                Ok(Resolved {
                    artifact: RenderedArtifact {
                        fingerprint: fingerprint.to_string(),
                        image_path: output.path,
                        meta,
                    },
                    status: CacheStatus::RenderedUncached,
                    warnings,
                })
            }
        }
    }

    /// Look `fingerprint` up in the store and copy a hit into scratch.
    ///
    /// An entry evicted between lookup and copy is reported as a miss.
    fn lookup(
        &self,
        fingerprint: &Fingerprint,
        block: &DiagramBlock,
    ) -> Result<Option<Resolved>, RenderError> {
        let Some(stored) = self.store.get(fingerprint.as_str()) else {
            return Ok(None);
        };

        let local = self
            .scratch
            .join(format!("{}.{}", fingerprint.as_str(), stored.format()));
        match fs::copy(&stored.image_path, &local) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(
                    diagram = block.id + 1,
                    fingerprint = %fingerprint,
                    "cached entry evicted before use"
                );
                return Ok(None);
            }
            Err(e) => {
                return Err(RenderError::Io {
                    detail: format!("copying {}: {e}", stored.image_path.display()),
                });
            }
        }

        tracing::debug!(diagram = block.id + 1, fingerprint = %fingerprint, "cache hit");
        Ok(Some(Resolved {
            artifact: RenderedArtifact {
                image_path: local,
                ..stored
            },
            status: CacheStatus::Hit,
            warnings: Vec::new(),
        }))
    }
}

impl std::fmt::Debug for RenderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCache")
            .field("persistent", &self.store.is_persistent())
            .field("scratch", &self.scratch)
            .field("slots", &self.len())
            .finish()
    }
}
