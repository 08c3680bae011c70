//! Extraction result model.
//!
//! Fixed-shape records for everything the library consumes from the engine
//! and everything it hands back to the caller. The serialized shape of
//! [`DocumentResult`] (camelCase keys, `pages` ascending by `num`) is part of
//! the public contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// One positioned glyph run supplied by the engine, in content-stream order.
///
/// `x`/`y` is the run's baseline origin taken from the text matrix. The same
/// point is used both for line-break detection and link containment.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    /// Raw run text, untrimmed.
    pub text: String,
    /// Baseline origin, horizontal.
    pub x: f32,
    /// Baseline origin, vertical.
    pub y: f32,
}

impl TextRun {
    /// Create a new text run.
    pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
        }
    }
}

/// A rectangular page area associated with a link target URL.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRegion {
    /// Target URL, guaranteed non-empty by the engine.
    pub url: String,
    /// Normalized rectangle `[x1, y1, x2, y2]` with `x1 <= x2`, `y1 <= y2`.
    pub rect: [f32; 4],
}

impl LinkRegion {
    /// Create a link region, normalizing the rectangle corners.
    pub fn new(url: impl Into<String>, rect: [f32; 4]) -> Self {
        let [a, b, c, d] = rect;
        Self {
            url: url.into(),
            rect: [a.min(c), b.min(d), a.max(c), b.max(d)],
        }
    }

    /// Inclusive containment test for a baseline origin point.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let [x1, y1, x2, y2] = self.rect;
        x >= x1 && x <= x2 && y >= y1 && y <= y2
    }
}

/// Viewport descriptor for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Page number (1-indexed).
    pub num: u32,
    /// Viewport scale, always 1.0 for extraction.
    pub scale: f32,
    /// Page rotation in degrees.
    pub rotation: i32,
    /// Viewport X offset.
    pub offset_x: f32,
    /// Viewport Y offset.
    pub offset_y: f32,
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
}

/// One extracted page: its viewport plus the fused, link-annotated content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    /// Viewport descriptor.
    pub page_info: PageInfo,
    /// Fused content string (see crate docs for the token format).
    pub content: String,
}

/// Document-level metadata: the info dictionary plus the XMP packet, if any.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Decoded entries of the document info dictionary.
    pub info: BTreeMap<String, String>,
    /// Flattened XMP metadata properties, or `None` when the document
    /// carries no metadata stream.
    pub metadata: Option<BTreeMap<String, String>>,
}

impl DocumentMeta {
    /// Document creation date, parsed from the info dictionary.
    pub fn creation_date(&self) -> Option<DateTime<Utc>> {
        self.info.get("CreationDate").and_then(|s| parse_pdf_date(s))
    }

    /// Last modification date, parsed from the info dictionary.
    pub fn modification_date(&self) -> Option<DateTime<Utc>> {
        self.info.get("ModDate").and_then(|s| parse_pdf_date(s))
    }
}

/// The assembled extraction result for a document.
///
/// Invariant: `pages` is sorted strictly ascending by `page_info.num` with no
/// duplicates, and contains exactly the successfully extracted pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    /// Source filename, present when extraction started from a path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Document-level metadata.
    pub meta: DocumentMeta,
    /// Extracted pages, ascending by page number.
    pub pages: Vec<PageResult>,
}

impl DocumentResult {
    /// Number of extracted pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Look up an extracted page by its 1-indexed page number.
    pub fn page(&self, num: u32) -> Option<&PageResult> {
        self.pages.iter().find(|p| p.page_info.num == num)
    }

    /// Concatenated content of all pages, in page order.
    pub fn plain_text(&self) -> String {
        self.pages.iter().map(|p| p.content.as_str()).collect()
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialize(e.to_string()))
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialize(e.to_string()))
    }
}

/// Parse a PDF date string (`D:YYYYMMDDHHmmSSOHH'mm'`).
fn parse_pdf_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);

    if s.len() < 4 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|s| s.parse().ok()).unwrap_or(0);

    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_link_region_normalizes_rect() {
        let region = LinkRegion::new("http://x", [100.0, 110.0, 0.0, 90.0]);
        assert_eq!(region.rect, [0.0, 90.0, 100.0, 110.0]);
    }

    #[test]
    fn test_link_region_contains_inclusive_bounds() {
        let region = LinkRegion::new("http://x", [0.0, 90.0, 100.0, 110.0]);
        assert!(region.contains(0.0, 90.0));
        assert!(region.contains(100.0, 110.0));
        assert!(region.contains(50.0, 100.0));
        assert!(!region.contains(100.1, 100.0));
        assert!(!region.contains(50.0, 89.9));
    }

    #[test]
    fn test_document_result_page_lookup() {
        let result = DocumentResult {
            filename: None,
            meta: DocumentMeta::default(),
            pages: vec![PageResult {
                page_info: PageInfo {
                    num: 3,
                    scale: 1.0,
                    rotation: 0,
                    offset_x: 0.0,
                    offset_y: 0.0,
                    width: 612.0,
                    height: 792.0,
                },
                content: "x\n".to_string(),
            }],
        };
        assert_eq!(result.page_count(), 1);
        assert!(result.page(3).is_some());
        assert!(result.page(1).is_none());
    }

    #[test]
    fn test_serialized_shape_uses_camel_case() {
        let result = DocumentResult {
            filename: None,
            meta: DocumentMeta::default(),
            pages: vec![PageResult {
                page_info: PageInfo {
                    num: 1,
                    scale: 1.0,
                    rotation: 0,
                    offset_x: 0.0,
                    offset_y: 0.0,
                    width: 612.0,
                    height: 792.0,
                },
                content: String::new(),
            }],
        };

        let json = result.to_json().unwrap();
        assert!(json.contains("\"pageInfo\""));
        assert!(json.contains("\"offsetX\""));
        assert!(json.contains("\"offsetY\""));
        assert!(!json.contains("\"filename\""));
        assert!(json.contains("\"metadata\":null"));
    }

    #[test]
    fn test_parse_pdf_date() {
        let meta = DocumentMeta {
            info: BTreeMap::from([(
                "CreationDate".to_string(),
                "D:20240115103045".to_string(),
            )]),
            metadata: None,
        };
        let date = meta.creation_date().unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 15);
    }

    #[test]
    fn test_parse_pdf_date_minimal() {
        let date = parse_pdf_date("D:2024").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
    }

    #[test]
    fn test_parse_pdf_date_invalid() {
        assert!(parse_pdf_date("D:xx").is_none());
        assert!(parse_pdf_date("").is_none());
    }
}
