//! Diagram extraction, rendering and substitution for mdpdf.
//!
//! This crate covers everything between reading a Markdown document and
//! handing rewritten Markdown to the typesetting engine:
//! - validation of the input file and its diagram blocks
//! - extraction of Mermaid fences and `<mermaid>` tags with exact byte spans
//! - rendering through an external tool, cached by content fingerprint
//! - splicing image references back into the document
//!
//! # Architecture
//!
//! The crate is organized into modules:
//! - `document`: the immutable [`Document`]
//! - `validate`: [`validate`], [`validate_file`], path checks, [`lint_diagram`]
//! - `extract`: [`extract`] producing ordered [`DiagramBlock`]s
//! - `fingerprint`: [`FingerprintKey`] and its SHA-256 [`Fingerprint`]
//! - `renderer`: [`DiagramRenderer`], the subprocess adapter
//! - `render_cache`: [`RenderCache`], at most one render per fingerprint
//! - `rewrite`: [`rewrite`] producing a [`RewrittenDocument`]
//!
//! # Example
//!
//! ```ignore
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use mdpdf_cache::NullCache;
//! use mdpdf_diagrams::{DiagramRenderer, Document, RenderCache, extract, rewrite};
//!
//! let doc = Document::new("doc.md", "```mermaid\ngraph TD\n```\n");
//! let blocks = extract(&doc)?;
//! let cache = RenderCache::new(Arc::new(NullCache), "/tmp/ws");
//! let renderer = DiagramRenderer::new(tool);
//!
//! let mut artifacts = BTreeMap::new();
//! for block in &blocks {
//!     let outcome = cache.get_or_render(block, &renderer)?;
//!     artifacts.insert(block.id, outcome.artifact.image_path);
//! }
//! let rewritten = rewrite(&doc, &blocks, &artifacts)?;
//! ```

mod document;
mod extract;
mod fence;
mod fingerprint;
mod language;
mod render_cache;
mod renderer;
mod rewrite;
mod validate;

pub use document::Document;
pub use extract::{Delimiter, DiagramBlock, ExtractionError, extract};
pub use fingerprint::{Fingerprint, FingerprintKey};
pub use language::{DiagramFormat, DiagramKind};
pub use render_cache::{CacheOutcome, CacheStatus, RenderCache};
pub use renderer::{
    DEFAULT_RENDER_TIMEOUT, DEFAULT_SPAWN_RETRIES, DiagramRenderer, RenderError, RenderOutput,
};
pub use rewrite::{RewriteError, RewrittenDocument, rewrite};
pub use validate::{
    DEFAULT_MAX_DOCUMENT_SIZE, Limits, ValidationError, lint_diagram, validate, validate_file,
    validate_input_path, validate_output_path,
};
