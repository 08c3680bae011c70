//! # linkpdf
//!
//! PDF text extraction with inline hyperlink annotation.
//!
//! This library extracts page-level text from a PDF, matches each positioned
//! text run against the page's link annotations, and fuses both into one
//! readable content string per page. Linked stretches of text are wrapped in
//! `<a href="URL">…</a>` markup, line boundaries become `\n` tokens, and the
//! pages of a document are assembled concurrently into a deterministically
//! ordered result.
//!
//! ## Quick Start
//!
//! ```no_run
//! fn main() -> linkpdf::Result<()> {
//!     let result = linkpdf::extract_file("document.pdf")?;
//!
//!     for page in &result.pages {
//!         println!("--- page {} ---", page.page_info.num);
//!         println!("{}", page.content);
//!     }
//!
//!     println!("{}", result.to_json_pretty()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Content format
//!
//! Page content is a sequence of tokens joined by single spaces and closed by
//! one trailing newline. A run of text whose baseline origin falls inside a
//! link annotation's rectangle is wrapped in an anchor; a change of baseline
//! `y` between consecutive runs emits a `\n` token and closes any open
//! anchor. Token order is content-stream order, never spatial order.
//!
//! ## Errors
//!
//! Extraction is all-or-nothing: the first failing page (or the metadata
//! fetch) fails the whole operation and no partial document is returned.

pub mod detect;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fuse;
pub mod model;

pub use engine::{DocumentEngine, LopdfEngine, TextOptions};
pub use error::{Error, Result};
pub use extract::{extract_document, ExtractOptions};
pub use fuse::{fuse_page, LinkSpanTracker};
pub use model::{
    DocumentMeta, DocumentResult, LinkRegion, PageInfo, PageResult, TextRun,
};

use std::io::Read;
use std::path::Path;

/// Extract a PDF file with default options.
///
/// # Example
///
/// ```no_run
/// let result = linkpdf::extract_file("document.pdf").unwrap();
/// println!("{} pages", result.page_count());
/// ```
pub fn extract_file<P: AsRef<Path>>(path: P) -> Result<DocumentResult> {
    extract_file_with_options(path, &ExtractOptions::default())
}

/// Extract a PDF file with custom options.
///
/// The returned result records the source filename.
///
/// # Example
///
/// ```no_run
/// use linkpdf::ExtractOptions;
///
/// let options = ExtractOptions::new().with_first_page(2).with_last_page(4);
/// let result = linkpdf::extract_file_with_options("document.pdf", &options).unwrap();
/// ```
pub fn extract_file_with_options<P: AsRef<Path>>(
    path: P,
    options: &ExtractOptions,
) -> Result<DocumentResult> {
    let path = path.as_ref();
    detect::sniff_file(path)?;

    let engine = LopdfEngine::load_file(path)?;
    let mut result = extract_document(&engine, options)?;
    result.filename = Some(path.to_string_lossy().to_string());
    Ok(result)
}

/// Extract a PDF from bytes with default options.
pub fn extract_bytes(data: &[u8]) -> Result<DocumentResult> {
    extract_bytes_with_options(data, &ExtractOptions::default())
}

/// Extract a PDF from bytes with custom options.
pub fn extract_bytes_with_options(
    data: &[u8],
    options: &ExtractOptions,
) -> Result<DocumentResult> {
    detect::sniff_bytes(data)?;

    let engine = LopdfEngine::load_bytes(data)?;
    extract_document(&engine, options)
}

/// Extract a PDF from a reader with default options.
pub fn extract_reader<R: Read>(reader: R) -> Result<DocumentResult> {
    extract_reader_with_options(reader, &ExtractOptions::default())
}

/// Extract a PDF from a reader with custom options.
pub fn extract_reader_with_options<R: Read>(
    mut reader: R,
    options: &ExtractOptions,
) -> Result<DocumentResult> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    extract_bytes_with_options(&data, options)
}
