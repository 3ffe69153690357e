//! `mdpdf cache` subcommand group.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use mdpdf_config::Config;

use super::open_store;
use crate::error::CliError;
use crate::output::Output;

/// Cache maintenance commands.
#[derive(Subcommand)]
pub(crate) enum CacheCommand {
    /// Remove every cached diagram.
    Clear(CacheArgs),
    /// Evict the oldest diagrams beyond `cache.max_entries`.
    Prune(CacheArgs),
}

/// Arguments shared by cache commands.
#[derive(Args)]
pub(crate) struct CacheArgs {
    /// Path to configuration file (default: auto-discover mdpdf.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cache directory (overrides config).
    #[arg(long, env = "MDPDF_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
}

impl CacheArgs {
    fn load(&self) -> Result<Config, CliError> {
        let mut config = Config::load(self.config.as_deref(), None)?;
        if let Some(dir) = &self.cache_dir {
            config.cache_resolved.dir.clone_from(dir);
        }
        // Maintenance applies to the directory even when caching is disabled.
        config.cache_resolved.enabled = true;
        Ok(config)
    }
}

impl CacheCommand {
    /// Execute the cache subcommand.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        match self {
            Self::Clear(args) => {
                let config = args.load()?;
                let removed = open_store(&config)?.clear()?;
                output.success(&format!(
                    "Removed {removed} cached diagrams from {}",
                    config.cache_resolved.dir.display()
                ));
            }
            Self::Prune(args) => {
                let config = args.load()?;
                if config.cache_resolved.max_entries.is_none() {
                    output.warning("cache.max_entries is not set, nothing to prune");
                    return Ok(());
                }
                let removed = open_store(&config)?.prune()?;
                output.success(&format!("Evicted {removed} cached diagrams"));
            }
        }
        Ok(())
    }
}
