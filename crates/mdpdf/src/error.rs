//! CLI error types.

use mdpdf_cache::CacheError;
use mdpdf_config::ConfigError;
use mdpdf_pipeline::ConvertError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Convert(#[from] ConvertError),

    #[error("{0}")]
    Cache(#[from] CacheError),

    #[error("{0}")]
    Validation(String),
}
