//! `mdpdf convert` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use mdpdf_config::{CliSettings, Config};
use mdpdf_diagrams::Limits;
use mdpdf_pdf::EngineConfig;
use mdpdf_pipeline::{Converter, default_workers};

use super::{diagram_renderer, engine_tool, open_store};
use crate::error::CliError;
use crate::output::{Output, conversion_report};

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Markdown document to convert (.md or .markdown).
    input: PathBuf,

    /// Destination PDF path.
    output: PathBuf,

    /// Document title.
    #[arg(short, long)]
    title: Option<String>,

    /// Path to configuration file (default: auto-discover mdpdf.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable the rendered-diagram cache.
    #[arg(long)]
    no_cache: bool,

    /// Cache directory (overrides config).
    #[arg(long, env = "MDPDF_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Directory run workspaces are created in (overrides config).
    #[arg(long)]
    workspace_dir: Option<PathBuf>,

    /// Per-diagram render timeout in seconds (overrides config).
    #[arg(long)]
    timeout: Option<u64>,

    /// Number of parallel render workers (overrides config).
    #[arg(short, long)]
    jobs: Option<usize>,

    /// PDF engine, e.g. xelatex or lualatex (overrides config).
    #[arg(long)]
    engine: Option<String>,
}

impl ConvertArgs {
    /// Execute the convert command.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            cache_enabled: self.no_cache.then_some(false),
            cache_dir: self.cache_dir,
            workspace_root: self.workspace_dir,
            renderer_timeout_secs: self.timeout,
            workers: self.jobs,
            engine: self.engine,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let converter = build_converter(&config, self.title)?;

        output.info(&format!("Input: {}", self.input.display()));
        let result = converter.convert(&self.input, &self.output)?;

        output.lines(&conversion_report(&result));
        Ok(())
    }
}

/// Assemble a converter from loaded configuration.
fn build_converter(config: &Config, title: Option<String>) -> Result<Converter, CliError> {
    let engine_config = EngineConfig {
        engine: config.pdf.engine.clone(),
        options: config.pdf.options.clone(),
        timeout: config.pdf.timeout(),
        title,
        resource_dir: None,
    };

    let mut converter = Converter::new(diagram_renderer(config)?, Arc::new(engine_tool(config)?))
        .with_engine_config(engine_config)
        .with_store(open_store(config)?)
        .with_limits(Limits {
            max_document_size: config.document.max_size,
        })
        .with_workers(config.renderer.workers.unwrap_or_else(default_workers));

    if let Some(root) = &config.workspace_resolved.root {
        converter = converter.with_workspace_root(root);
    }
    Ok(converter)
}
