//! `mdpdf check` command implementation.

use std::path::PathBuf;

use clap::Args;
use mdpdf_config::Config;
use mdpdf_tool::ExternalTool;

use super::{engine_tool, renderer_tool};
use crate::error::CliError;
use crate::output::{Output, tool_status_line};

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    /// Path to configuration file (default: auto-discover mdpdf.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl CheckArgs {
    /// Probe the configured renderer and PDF engine.
    ///
    /// Every tool is probed even after one fails, so the user sees the full
    /// list of missing dependencies at once.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;

        if let Some(path) = &config.config_path {
            output.info(&format!("Config: {}", path.display()));
        }

        let tools: [(&str, Box<dyn ExternalTool>); 2] = [
            ("Diagram renderer", Box::new(renderer_tool(&config)?)),
            ("PDF converter", Box::new(engine_tool(&config)?)),
        ];

        let mut missing = Vec::new();
        for (role, tool) in &tools {
            let outcome = tool.probe();
            output.line(&tool_status_line(role, tool.name(), &outcome));
            if outcome.is_err() {
                missing.push(tool.name().to_owned());
            }
        }

        // The engine itself is a separate program pandoc shells out to.
        output.info(&format!("PDF engine: {}", config.pdf.engine));

        if missing.is_empty() {
            output.success("All dependencies found");
            Ok(())
        } else {
            Err(CliError::Validation(format!(
                "missing dependencies: {}",
                missing.join(", ")
            )))
        }
    }
}
