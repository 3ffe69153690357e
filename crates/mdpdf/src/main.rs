//! mdpdf CLI - Markdown with Mermaid diagrams to PDF.
//!
//! Provides commands for:
//! - `convert`: Convert a Markdown document to PDF
//! - `check`: Check that the diagram renderer and PDF engine are installed
//! - `cache clear` / `cache prune`: Maintain the rendered-diagram cache

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CacheCommand, CheckArgs, ConvertArgs};
use output::Output;

/// mdpdf - Markdown with Mermaid diagrams to PDF.
#[derive(Parser)]
#[command(name = "mdpdf", version, about)]
struct Cli {
    /// Enable verbose output (stage transitions and tool invocations).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a Markdown document to PDF.
    Convert(ConvertArgs),
    /// Check that the external tools are installed.
    Check(CheckArgs),
    /// Rendered-diagram cache maintenance.
    #[command(subcommand)]
    Cache(CacheCommand),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Convert(args) => args.execute(),
        Commands::Check(args) => args.execute(),
        Commands::Cache(cmd) => cmd.execute(),
    };

    if let Err(err) = result {
        output.error(&err.to_string());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert() {
        let cli = Cli::try_parse_from([
            "mdpdf", "convert", "doc.md", "doc.pdf", "--no-cache", "--jobs", "2", "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Convert(_)));
    }

    #[test]
    fn test_parse_cache_clear() {
        let cli = Cli::try_parse_from(["mdpdf", "cache", "clear"]).unwrap();

        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Cache(CacheCommand::Clear(_))));
    }

    #[test]
    fn test_convert_requires_output() {
        assert!(Cli::try_parse_from(["mdpdf", "convert", "doc.md"]).is_err());
    }
}
