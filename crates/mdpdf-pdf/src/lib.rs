//! PDF generation for mdpdf.
//!
//! The rewritten Markdown is typeset by an external engine (`pandoc` driving
//! a LaTeX engine by default). [`PdfGenerator`] writes the document into the
//! run workspace, invokes the engine through an
//! [`ExternalTool`](mdpdf_tool::ExternalTool), and refuses to accept output
//! that does not look like a complete PDF.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mdpdf_pdf::{EngineConfig, PdfGenerator, persist};
//!
//! let generator = PdfGenerator::new(Arc::new(pandoc), EngineConfig::default());
//! let pdf = generator.generate(&rewritten, &workspace)?;
//! persist(&pdf, "out.pdf".as_ref())?;
//! ```

mod check;
mod error;
mod generator;

pub use check::{persist, validate_pdf};
pub use error::GenerationError;
pub use generator::{
    DEFAULT_ENGINE, DEFAULT_GENERATION_TIMEOUT, EngineConfig, PdfGenerator, default_options,
};
