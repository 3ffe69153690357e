//! CLI command implementations.

mod cache;
mod check;
mod convert;

use std::sync::Arc;

use mdpdf_cache::{ArtifactStore, FileCache, NullCache};
use mdpdf_config::Config;
use mdpdf_diagrams::{DiagramFormat, DiagramRenderer};
use mdpdf_tool::{CommandTemplate, ProcessTool};

use crate::error::CliError;

pub(crate) use cache::CacheCommand;
pub(crate) use check::CheckArgs;
pub(crate) use convert::ConvertArgs;

/// Cache format version from Cargo.toml; a new release starts a fresh cache.
const CACHE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build a subprocess tool from an argv-style config value.
fn process_tool(argv: &[String], field: &str) -> Result<ProcessTool, CliError> {
    CommandTemplate::from_argv(argv)
        .map(ProcessTool::new)
        .ok_or_else(|| CliError::Validation(format!("{field} has no program")))
}

/// Diagram renderer tool built from `[renderer]`.
fn renderer_tool(config: &Config) -> Result<ProcessTool, CliError> {
    process_tool(&config.renderer.command, "renderer.command")
}

/// PDF engine tool built from `[pdf]`.
fn engine_tool(config: &Config) -> Result<ProcessTool, CliError> {
    process_tool(&config.pdf.command, "pdf.command")
}

/// Diagram renderer configured from `[renderer]`.
fn diagram_renderer(config: &Config) -> Result<DiagramRenderer, CliError> {
    let renderer = &config.renderer;
    let format = DiagramFormat::parse(&renderer.format).ok_or_else(|| {
        CliError::Validation(format!("unsupported diagram format `{}`", renderer.format))
    })?;

    Ok(DiagramRenderer::new(Arc::new(renderer_tool(config)?))
        .with_format(format)
        .with_timeout(renderer.timeout())
        .with_spawn_retries(renderer.spawn_retries)
        .with_identity(renderer.identity()))
}

/// Open the configured artifact store, or a no-op store when caching is off.
fn open_store(config: &Config) -> Result<Arc<dyn ArtifactStore>, CliError> {
    let cache = &config.cache_resolved;
    if !cache.enabled {
        return Ok(Arc::new(NullCache));
    }

    let store = FileCache::open(&cache.dir, CACHE_VERSION)?.with_max_entries(cache.max_entries);
    Ok(Arc::new(store))
}
