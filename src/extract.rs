//! Document assembly.
//!
//! Fans out one unit of work per requested page plus one metadata unit,
//! waits for all of them to settle, and either returns the first observed
//! failure or the sorted, assembled [`DocumentResult`]. There is no
//! concurrency cap and no cancellation: a failing task does not stop its
//! siblings, their results are simply discarded.

use rayon::prelude::*;

use crate::engine::{DocumentEngine, TextOptions};
use crate::error::Result;
use crate::fuse::fuse_page;
use crate::model::{DocumentMeta, DocumentResult, PageResult};

/// Options for document extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// First page to extract (1-indexed).
    pub first_page: u32,

    /// Last page to extract; defaults to, and is capped at, the document's
    /// page count.
    pub last_page: Option<u32>,

    /// Forwarded to the engine's text retrieval.
    pub normalize_whitespace: bool,

    /// Forwarded to the engine's text retrieval.
    pub disable_combine_text_items: bool,

    /// Whether to run page tasks in parallel.
    pub parallel: bool,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first page to extract (1-indexed).
    pub fn with_first_page(mut self, page: u32) -> Self {
        self.first_page = page;
        self
    }

    /// Set the last page to extract.
    pub fn with_last_page(mut self, page: u32) -> Self {
        self.last_page = Some(page);
        self
    }

    /// Collapse whitespace sequences inside text runs.
    pub fn normalize_whitespace(mut self) -> Self {
        self.normalize_whitespace = true;
        self
    }

    /// Keep every show operation as its own text run.
    pub fn disable_combine_text_items(mut self) -> Self {
        self.disable_combine_text_items = true;
        self
    }

    /// Disable parallel page processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    fn text_options(&self) -> TextOptions {
        TextOptions {
            normalize_whitespace: self.normalize_whitespace,
            disable_combine_text_items: self.disable_combine_text_items,
        }
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            first_page: 1,
            last_page: None,
            normalize_whitespace: false,
            disable_combine_text_items: false,
            parallel: true,
        }
    }
}

/// Extract the requested page range and document metadata from an open
/// document.
///
/// The requested range is clamped: `first_page` is at least 1, `last_page`
/// defaults to and is capped at the page count. An inverted range extracts
/// zero pages and is not an error. Pages in the returned result are sorted
/// strictly ascending by page number; the sort happens once, after all tasks
/// have settled.
pub fn extract_document<E>(engine: &E, options: &ExtractOptions) -> Result<DocumentResult>
where
    E: DocumentEngine + Sync,
{
    let total = engine.page_count()?;
    let first = options.first_page.max(1);
    let last = options.last_page.unwrap_or(total).min(total);

    let page_nums: Vec<u32> = if first > last {
        Vec::new()
    } else {
        (first..=last).collect()
    };
    log::debug!(
        "extracting {} of {} pages (range {}..={})",
        page_nums.len(),
        total,
        first,
        last
    );

    let (meta, pages) = rayon::join(
        || collect_metadata(engine),
        || join_page_tasks(engine, &page_nums, options),
    );

    // A page failure takes precedence over a metadata failure.
    let mut pages = pages?;
    let meta = meta?;

    pages.sort_by_key(|p| p.page_info.num);

    Ok(DocumentResult {
        filename: None,
        meta,
        pages,
    })
}

/// Fetch the document-level metadata as one unit of work.
fn collect_metadata<E: DocumentEngine>(engine: &E) -> Result<DocumentMeta> {
    Ok(DocumentMeta {
        info: engine.info_dict()?,
        metadata: engine.xmp_metadata()?,
    })
}

/// Run all page tasks to completion and gather their results.
///
/// Every task settles before this returns; when one or more failed, the
/// first failure in task order is the operation's error and the surviving
/// results are dropped. Cancellation, if ever added, belongs here.
fn join_page_tasks<E>(
    engine: &E,
    page_nums: &[u32],
    options: &ExtractOptions,
) -> Result<Vec<PageResult>>
where
    E: DocumentEngine + Sync,
{
    let text_options = options.text_options();

    let settled: Vec<Result<PageResult>> = if options.parallel {
        page_nums
            .par_iter()
            .map(|&num| extract_page(engine, num, &text_options))
            .collect()
    } else {
        page_nums
            .iter()
            .map(|&num| extract_page(engine, num, &text_options))
            .collect()
    };

    let mut pages = Vec::with_capacity(settled.len());
    for result in settled {
        pages.push(result?);
    }
    Ok(pages)
}

/// One page task: fetch viewport, text runs, and link regions, then fuse.
fn extract_page<E: DocumentEngine>(
    engine: &E,
    num: u32,
    text_options: &TextOptions,
) -> Result<PageResult> {
    let page_info = engine.page_viewport(num)?;
    let runs = engine.page_text_runs(num, text_options)?;
    let links = engine.page_link_regions(num)?;

    let content = fuse_page(&runs, &links);
    log::debug!(
        "page {}: {} runs, {} link regions, {} bytes of content",
        num,
        runs.len(),
        links.len(),
        content.len()
    );

    Ok(PageResult { page_info, content })
}
