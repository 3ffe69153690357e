//! End-to-end conversion.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use mdpdf_cache::{ArtifactStore, NullCache};
use mdpdf_diagrams::{
    CacheOutcome, CacheStatus, DiagramBlock, DiagramRenderer, Document, Limits, RenderCache,
    RenderError, extract, lint_diagram, rewrite, validate_file, validate_input_path,
    validate_output_path,
};
use mdpdf_pdf::{EngineConfig, PdfGenerator, persist};
use mdpdf_tool::{CancellationToken, ExternalTool};
use mdpdf_workspace::Workspace;
use rayon::prelude::*;

use crate::{ConvertError, Stage};

/// Upper bound on the default number of render workers.
pub const MAX_DEFAULT_WORKERS: usize = 8;

/// Workspace directory the renderer writes into.
const RENDER_DIR: &str = "render";

/// Workspace directory holding the images the document references.
const IMAGE_DIR: &str = "images";

/// Available parallelism, capped at [`MAX_DEFAULT_WORKERS`].
#[must_use]
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map_or(1, NonZeroUsize::get)
        .min(MAX_DEFAULT_WORKERS)
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// Where the PDF was written.
    pub output_pdf_path: PathBuf,
    /// Diagrams rendered by the external renderer during this run.
    pub diagrams_rendered: usize,
    /// Diagrams served from the cache or reused within the run.
    pub diagrams_cache_hits: usize,
    /// Non-fatal problems, in the order they were found.
    pub warnings: Vec<String>,
}

impl ConversionResult {
    /// Total number of diagrams in the document.
    #[must_use]
    pub fn diagrams(&self) -> usize {
        self.diagrams_rendered + self.diagrams_cache_hits
    }
}

#[derive(Debug, Default)]
struct RenderStats {
    rendered: usize,
    hits: usize,
}

/// Converts Markdown documents with Mermaid diagrams to PDF.
///
/// A converter holds configuration only and can run any number of
/// conversions. Each [`convert`](Self::convert) call gets its own workspace,
/// cancellation token and in-run render memo; the artifact store is shared.
pub struct Converter {
    renderer: DiagramRenderer,
    engine: Arc<dyn ExternalTool>,
    engine_config: EngineConfig,
    store: Arc<dyn ArtifactStore>,
    limits: Limits,
    workers: usize,
    workspace_root: Option<PathBuf>,
}

impl Converter {
    /// Create a converter with caching disabled and default settings.
    #[must_use]
    pub fn new(renderer: DiagramRenderer, engine: Arc<dyn ExternalTool>) -> Self {
        Self {
            renderer,
            engine,
            engine_config: EngineConfig::default(),
            store: Arc::new(NullCache),
            limits: Limits::default(),
            workers: default_workers(),
            workspace_root: None,
        }
    }

    /// Set the typesetting engine configuration.
    #[must_use]
    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    /// Set the document title passed to the engine.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.engine_config.title = Some(title.into());
        self
    }

    /// Use `store` for rendered artifacts.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = store;
        self
    }

    /// Set document validation limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the number of parallel render workers (at least one).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Create run workspaces under `root` instead of the system temp dir.
    #[must_use]
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// The diagram renderer.
    #[must_use]
    pub fn renderer(&self) -> &DiagramRenderer {
        &self.renderer
    }

    /// The artifact store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Number of parallel render workers.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Convert `input` to a PDF at `output`.
    ///
    /// Stages run in order: validation, extraction, rendering, rewriting,
    /// generation. Validation happens before any workspace exists; once it
    /// is created the workspace is removed on every exit path. `output` is
    /// only written after the PDF has been validated.
    pub fn convert(&self, input: &Path, output: &Path) -> Result<ConversionResult, ConvertError> {
        let started = Instant::now();
        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            "converting"
        );

        validate_input_path(input)?;
        validate_output_path(output)?;
        let document = validate_file(input, &self.limits)?;

        let blocks = extract(&document)?;
        let mut warnings: Vec<String> = blocks.iter().filter_map(lint_diagram).collect();
        for warning in &warnings {
            tracing::warn!("{warning}");
        }

        let workspace = Workspace::create(self.workspace_root.as_deref())?;
        let result = self.run(&document, &blocks, &workspace, output, &mut warnings);

        if let Err(e) = workspace.close() {
            tracing::warn!("{e}");
            warnings.push(e.to_string());
        }

        let stats = result.inspect_err(|e| {
            tracing::debug!(stage = %e.stage(), "conversion failed");
        })?;

        tracing::info!(
            diagrams = blocks.len(),
            rendered = stats.rendered,
            cache_hits = stats.hits,
            "converted in {:.2}s",
            started.elapsed().as_secs_f64()
        );

        Ok(ConversionResult {
            output_pdf_path: output.to_path_buf(),
            diagrams_rendered: stats.rendered,
            diagrams_cache_hits: stats.hits,
            warnings,
        })
    }

    /// Everything that needs the workspace.
    fn run(
        &self,
        document: &Document,
        blocks: &[DiagramBlock],
        workspace: &Workspace,
        output: &Path,
        warnings: &mut Vec<String>,
    ) -> Result<RenderStats, ConvertError> {
        let token = CancellationToken::new();
        let scratch = workspace.create_dir(RENDER_DIR)?;
        let cache = RenderCache::new(Arc::clone(&self.store), scratch);
        let renderer = self.renderer.clone().with_cancel(&token);

        let outcomes = self.render_all(blocks, &cache, &renderer, &token)?;

        let mut stats = RenderStats::default();
        let mut artifacts = BTreeMap::new();
        for (block, outcome) in blocks.iter().zip(outcomes) {
            match outcome.status {
                CacheStatus::Hit => stats.hits += 1,
                CacheStatus::Rendered | CacheStatus::RenderedUncached => stats.rendered += 1,
            }
            warnings.extend(outcome.warnings);

            let name = format!("{IMAGE_DIR}/{}.{}", block.id, outcome.artifact.format());
            let image = workspace.import(&outcome.artifact.image_path, name)?;
            artifacts.insert(block.id, image);
        }

        tracing::info!(stage = %Stage::Rewrite, "substituting diagrams");
        let rewritten = rewrite(document, blocks, &artifacts)?;

        let mut config = self.engine_config.clone();
        if config.resource_dir.is_none() {
            config.resource_dir = document
                .path()
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(Path::to_path_buf);
        }
        let generator = PdfGenerator::new(Arc::clone(&self.engine), config).with_cancel(&token);
        let pdf = generator.generate(&rewritten, workspace)?;
        persist(&pdf, output)?;

        Ok(stats)
    }

    /// Resolve every block through the cache on a bounded pool.
    ///
    /// The first real failure trips `token`: blocks not yet started are
    /// skipped and running renders are killed. The reported error is the
    /// first non-cancellation failure in document order.
    fn render_all(
        &self,
        blocks: &[DiagramBlock],
        cache: &RenderCache,
        renderer: &DiagramRenderer,
        token: &CancellationToken,
    ) -> Result<Vec<CacheOutcome>, ConvertError> {
        if blocks.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.workers.min(blocks.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("mdpdf-render-{i}"))
            .build()
            .map_err(|e| ConvertError::WorkerPool(e.to_string()))?;

        tracing::info!(
            stage = %Stage::Render,
            diagrams = blocks.len(),
            workers,
            "rendering diagrams"
        );

        let results: Vec<Result<CacheOutcome, RenderError>> = pool.install(|| {
            blocks
                .par_iter()
                .map(|block| {
                    if token.is_cancelled() {
                        return Err(RenderError::Cancelled);
                    }
                    let result = cache.get_or_render(block, renderer);
                    if let Err(e) = &result
                        && *e != RenderError::Cancelled
                    {
                        tracing::warn!(
                            diagram = block.id + 1,
                            "{e}, cancelling remaining renders"
                        );
                        token.cancel();
                    }
                    result
                })
                .collect()
        });

        let mut outcomes = Vec::with_capacity(blocks.len());
        let mut first_cancelled = None;
        for (block, result) in blocks.iter().zip(results) {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(RenderError::Cancelled) => {
                    first_cancelled.get_or_insert(block);
                }
                Err(source) => {
                    return Err(ConvertError::Render {
                        id: block.id,
                        line: block.line,
                        source,
                    });
                }
            }
        }
        if let Some(block) = first_cancelled {
            return Err(ConvertError::Render {
                id: block.id,
                line: block.line,
                source: RenderError::Cancelled,
            });
        }

        Ok(outcomes)
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("renderer", &self.renderer)
            .field("engine", &self.engine.name())
            .field("engine_config", &self.engine_config)
            .field("persistent_cache", &self.store.is_persistent())
            .field("limits", &self.limits)
            .field("workers", &self.workers)
            .field("workspace_root", &self.workspace_root)
            .finish()
    }
}
