//! Markdown-with-diagrams to PDF conversion.
//!
//! [`Converter`] wires the stages together:
//!
//! ```text
//! validate -> extract -> render (cache lookup, renderer on miss) -> rewrite -> generate
//! ```
//!
//! Rendering fans out over a bounded rayon pool; every other stage is serial.
//! Failures carry the [`Stage`] they came from and, for diagram failures, the
//! block id. The run workspace is removed whatever the outcome.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use mdpdf_diagrams::DiagramRenderer;
//! use mdpdf_pipeline::Converter;
//! use mdpdf_tool::{CommandTemplate, ProcessTool};
//!
//! let mmdc = ProcessTool::new(CommandTemplate::new("mmdc", ["-i", "{input}", "-o", "{output}"]));
//! let pandoc = ProcessTool::new(CommandTemplate::new(
//!     "pandoc",
//!     ["{input}", "-o", "{output}", "--pdf-engine={engine}"],
//! ));
//!
//! let converter = Converter::new(DiagramRenderer::new(Arc::new(mmdc)), Arc::new(pandoc));
//! let result = converter.convert(Path::new("notes.md"), Path::new("notes.pdf"))?;
//! println!("{} diagrams", result.diagrams());
//! # Ok::<(), mdpdf_pipeline::ConvertError>(())
//! ```

mod converter;
mod error;

pub use converter::{ConversionResult, Converter, MAX_DEFAULT_WORKERS, default_workers};
pub use error::{ConvertError, Stage};
