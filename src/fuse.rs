//! Text–link fusion.
//!
//! Walks a page's positioned text runs in content-stream order, matches each
//! run's baseline origin against the page's link regions, and emits one
//! interleaved text/markup stream: `<a href="URL">…</a>` around linked
//! stretches, a bare `\n` token at every detected line boundary, all tokens
//! joined by single spaces, one trailing newline per page.
//!
//! Line breaks are detected by exact baseline `y` inequality between
//! consecutive runs. There is no tolerance band, and no spatial re-sorting:
//! output order is always input order.

use crate::model::{LinkRegion, TextRun};

/// Inline link span state, advanced once per text run.
///
/// A line break always closes an open span, even when the next run matches
/// the same URL again; the span then reopens as a fresh anchor. On the same
/// line, consecutive runs matching the same URL extend the open anchor.
#[derive(Debug, Default)]
pub struct LinkSpanTracker {
    current: Option<String>,
}

impl LinkSpanTracker {
    /// Create a tracker in the no-link state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the tracker with one run and append its tokens.
    pub fn feed(
        &mut self,
        is_new_line: bool,
        matched: Option<&str>,
        text: &str,
        tokens: &mut Vec<String>,
    ) {
        if is_new_line {
            if self.current.is_some() {
                close_anchor(tokens);
                self.current = None;
            }
            tokens.push("\n".to_string());
        }

        match matched {
            Some(url) if self.current.as_deref() == Some(url) => {
                tokens.push(text.to_string());
            }
            Some(url) => {
                if self.current.is_some() {
                    close_anchor(tokens);
                }
                tokens.push(format!("<a href=\"{}\">{}", url, text));
                self.current = Some(url.to_string());
            }
            None => {
                if self.current.is_some() {
                    close_anchor(tokens);
                    self.current = None;
                }
                tokens.push(text.to_string());
            }
        }
    }

    /// Flush the tracker after the final run of a page.
    pub fn finish(self, tokens: &mut Vec<String>) {
        if self.current.is_some() {
            close_anchor(tokens);
        }
    }
}

/// The closing markup attaches to the preceding token so no separator is
/// inserted between a span's last text and its `</a>`.
fn close_anchor(tokens: &mut Vec<String>) {
    match tokens.last_mut() {
        Some(last) => last.push_str("</a>"),
        None => tokens.push("</a>".to_string()),
    }
}

/// Fuse one page's text runs with its link regions into the page content
/// string.
///
/// Each run is trimmed before processing; a run that trims to empty still
/// advances the tracker (it can open, extend, or close a span). A run is
/// matched to the first region in list order whose rectangle contains its
/// baseline origin, inclusive on all four sides. Overlapping regions are not
/// arbitrated further.
pub fn fuse_page(runs: &[TextRun], links: &[LinkRegion]) -> String {
    let mut tokens: Vec<String> = Vec::with_capacity(runs.len());
    let mut tracker = LinkSpanTracker::new();
    let mut prev_y: Option<f32> = None;

    for run in runs {
        let is_new_line = prev_y.is_some_and(|y| y != run.y);
        let matched = links
            .iter()
            .find(|link| link.contains(run.x, run.y))
            .map(|link| link.url.as_str());

        tracker.feed(is_new_line, matched, run.text.trim(), &mut tokens);
        prev_y = Some(run.y);
    }

    tracker.finish(&mut tokens);

    let mut content = tokens.join(" ");
    content.push('\n');
    content
}
