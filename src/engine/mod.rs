//! Document engine abstraction.
//!
//! Provides a trait-based interface for everything the fusion and assembly
//! logic consumes from a parsed document (positioned text runs, link
//! annotations, viewport geometry, page count, and document metadata)
//! without exposing any concrete PDF library types.

mod pdf;

pub use pdf::LopdfEngine;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::{LinkRegion, PageInfo, TextRun};

/// Options forwarded to the engine's text retrieval, uninterpreted by the
/// fusion and assembly logic.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextOptions {
    /// Collapse internal whitespace sequences in each run to single spaces.
    pub normalize_whitespace: bool,
    /// Emit one run per show operation instead of merging consecutive show
    /// operations that share a text position.
    pub disable_combine_text_items: bool,
}

/// Abstract interface to an already-open document.
///
/// Implementations must be shareable across page tasks; all access is through
/// `&self`.
pub trait DocumentEngine {
    /// Total number of pages in the document.
    fn page_count(&self) -> Result<u32>;

    /// Decoded entries of the document info dictionary. An absent info
    /// dictionary yields an empty map, not an error.
    fn info_dict(&self) -> Result<BTreeMap<String, String>>;

    /// Flattened XMP metadata properties, or `None` when the document has no
    /// metadata stream.
    fn xmp_metadata(&self) -> Result<Option<BTreeMap<String, String>>>;

    /// Viewport descriptor for a page (1-indexed).
    fn page_viewport(&self, page: u32) -> Result<PageInfo>;

    /// The page's positioned text runs, in content-stream order. Runs whose
    /// text is empty or whitespace-only are included.
    fn page_text_runs(&self, page: u32, options: &TextOptions) -> Result<Vec<TextRun>>;

    /// The page's hyperlink regions, pre-filtered to link annotations with a
    /// non-empty URL, in annotation-array order.
    fn page_link_regions(&self, page: u32) -> Result<Vec<LinkRegion>>;
}
