//! Concrete document engine backed by `lopdf`.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use lopdf::{Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};
use crate::model::{LinkRegion, PageInfo, TextRun};

use super::{DocumentEngine, TextOptions};

/// Document engine backed by `lopdf::Document`.
pub struct LopdfEngine {
    doc: LopdfDocument,
}

impl LopdfEngine {
    /// Load from a file path.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Ok(Self { doc })
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Ok(Self { doc })
    }

    /// Load from a reader.
    pub fn load_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load_bytes(&data)
    }

    /// Check if the document is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    /// Get the PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        let pages = self.doc.get_pages();
        pages
            .get(&page)
            .copied()
            .ok_or(Error::PageOutOfRange(page, pages.len() as u32))
    }

    /// Follow a reference one level; non-references pass through.
    fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        if let Object::Reference(r) = obj {
            self.doc.get_object(*r).unwrap_or(obj)
        } else {
            obj
        }
    }

    /// Concatenated content stream bytes for a page.
    fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page_dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        let contents = page_dict
            .get(b"Contents")
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        match self.resolve(contents) {
            Object::Stream(s) => Ok(stream_bytes(s)),
            Object::Array(arr) => {
                let mut content = Vec::new();
                for obj in arr {
                    let Object::Stream(s) = self.resolve(obj) else {
                        return Err(Error::PdfParse(
                            "non-stream object in Contents array".to_string(),
                        ));
                    };
                    content.extend_from_slice(&stream_bytes(s));
                    content.push(b' ');
                }
                Ok(content)
            }
            _ => Err(Error::PdfParse("invalid Contents entry".to_string())),
        }
    }
}

/// Stream payload: decoded through its filter chain when one is declared,
/// as stored otherwise.
fn stream_bytes(stream: &lopdf::Stream) -> Vec<u8> {
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

impl DocumentEngine for LopdfEngine {
    fn page_count(&self) -> Result<u32> {
        Ok(self.doc.get_pages().len() as u32)
    }

    fn info_dict(&self) -> Result<BTreeMap<String, String>> {
        let mut info = BTreeMap::new();

        let Ok(obj) = self.doc.trailer.get(b"Info") else {
            return Ok(info);
        };

        if let Object::Dictionary(dict) = self.resolve(obj) {
            for (key, value) in dict.iter() {
                if let Some(text) = decode_value(self.resolve(value)) {
                    info.insert(String::from_utf8_lossy(key).to_string(), text);
                }
            }
        }

        Ok(info)
    }

    fn xmp_metadata(&self) -> Result<Option<BTreeMap<String, String>>> {
        let catalog = self
            .doc
            .catalog()
            .map_err(|e| Error::MetadataExtract(e.to_string()))?;

        let Ok(obj) = catalog.get(b"Metadata") else {
            return Ok(None);
        };

        let Object::Stream(stream) = self.resolve(obj) else {
            return Ok(None);
        };

        let bytes = stream_bytes(stream);
        let xml = String::from_utf8_lossy(&bytes);

        Ok(Some(parse_xmp_properties(&xml)))
    }

    fn page_viewport(&self, page: u32) -> Result<PageInfo> {
        let page_id = self.page_id(page)?;

        let (mut width, mut height) = (612.0, 792.0); // Letter default
        let mut rotation = 0;

        if let Ok(page_dict) = self.doc.get_dictionary(page_id) {
            if let Ok(media_box) = page_dict.get(b"MediaBox") {
                if let Object::Array(array) = self.resolve(media_box) {
                    if array.len() >= 4 {
                        let x1 = get_number(&array[0]).unwrap_or(0.0);
                        let y1 = get_number(&array[1]).unwrap_or(0.0);
                        let x2 = get_number(&array[2]).unwrap_or(612.0);
                        let y2 = get_number(&array[3]).unwrap_or(792.0);
                        width = x2 - x1;
                        height = y2 - y1;
                    }
                }
            }
            if let Ok(rotate) = page_dict.get(b"Rotate") {
                if let Ok(r) = self.resolve(rotate).as_i64() {
                    rotation = r as i32;
                }
            }
        }

        Ok(PageInfo {
            num: page,
            scale: 1.0,
            rotation,
            offset_x: 0.0,
            offset_y: 0.0,
            width,
            height,
        })
    }

    fn page_text_runs(&self, page: u32, options: &TextOptions) -> Result<Vec<TextRun>> {
        let page_id = self.page_id(page)?;

        let fonts = self.doc.get_page_fonts(page_id).unwrap_or_default();

        let content = self
            .page_content(page_id)
            .map_err(|e| Error::TextExtract(page, e.to_string()))?;
        let content = lopdf::content::Content::decode(&content)
            .map_err(|e| Error::TextExtract(page, e.to_string()))?;

        let mut builder = RunBuilder::new(*options);
        let mut matrix = TextMatrix::default();
        let mut current_font: Vec<u8> = Vec::new();
        let mut in_text_block = false;

        for op in &content.operations {
            match op.operator.as_str() {
                "BT" => {
                    in_text_block = true;
                    matrix = TextMatrix::default();
                    builder.flush();
                }
                "ET" => {
                    in_text_block = false;
                    builder.flush();
                }
                "Tf" => {
                    if let Some(Object::Name(name)) = op.operands.first() {
                        current_font = name.clone();
                    }
                }
                "Td" => {
                    if op.operands.len() >= 2 {
                        builder.flush();
                        matrix.translate(
                            get_number(&op.operands[0]).unwrap_or(0.0),
                            get_number(&op.operands[1]).unwrap_or(0.0),
                        );
                    }
                }
                "TD" => {
                    if op.operands.len() >= 2 {
                        builder.flush();
                        let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                        let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                        matrix.leading = -ty;
                        matrix.translate(tx, ty);
                    }
                }
                "TL" => {
                    if let Some(l) = op.operands.first().and_then(get_number) {
                        matrix.leading = l;
                    }
                }
                "Tm" => {
                    if op.operands.len() >= 6 {
                        builder.flush();
                        matrix.set(
                            get_number(&op.operands[0]).unwrap_or(1.0),
                            get_number(&op.operands[1]).unwrap_or(0.0),
                            get_number(&op.operands[2]).unwrap_or(0.0),
                            get_number(&op.operands[3]).unwrap_or(1.0),
                            get_number(&op.operands[4]).unwrap_or(0.0),
                            get_number(&op.operands[5]).unwrap_or(0.0),
                        );
                    }
                }
                "T*" => {
                    builder.flush();
                    matrix.next_line();
                }
                "Tj" => {
                    if in_text_block {
                        if let Some(Object::String(bytes, _)) = op.operands.first() {
                            let text = self.decode_show_text(&fonts, &current_font, bytes);
                            builder.push_text(text, matrix.position());
                        }
                    }
                }
                "TJ" => {
                    if in_text_block {
                        if let Some(Object::Array(arr)) = op.operands.first() {
                            let text = self.decode_show_array(&fonts, &current_font, arr);
                            builder.push_text(text, matrix.position());
                        }
                    }
                }
                "'" | "\"" => {
                    builder.flush();
                    matrix.next_line();
                    if in_text_block {
                        let text_idx = if op.operator == "\"" { 2 } else { 0 };
                        if let Some(Object::String(bytes, _)) = op.operands.get(text_idx) {
                            let text = self.decode_show_text(&fonts, &current_font, bytes);
                            builder.push_text(text, matrix.position());
                        }
                    }
                }
                _ => {}
            }
        }

        builder.flush();
        Ok(builder.runs)
    }

    fn page_link_regions(&self, page: u32) -> Result<Vec<LinkRegion>> {
        let page_id = self.page_id(page)?;
        let page_dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| Error::AnnotationExtract(page, e.to_string()))?;

        let Ok(annots) = page_dict.get(b"Annots") else {
            return Ok(Vec::new());
        };

        let Object::Array(annots) = self.resolve(annots) else {
            log::warn!("Page {}: Annots is not an array, ignoring", page);
            return Ok(Vec::new());
        };

        let mut regions = Vec::new();
        for annot in annots {
            let Object::Dictionary(dict) = self.resolve(annot) else {
                continue;
            };

            let is_link = dict
                .get(b"Subtype")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| n == b"Link")
                .unwrap_or(false);
            if !is_link {
                continue;
            }

            let Some(url) = self.link_uri(dict) else {
                continue;
            };
            if url.is_empty() {
                continue;
            }

            let Some(rect) = self.annot_rect(dict) else {
                log::warn!("Page {}: link annotation without a valid Rect, skipping", page);
                continue;
            };

            regions.push(LinkRegion::new(url, rect));
        }

        Ok(regions)
    }
}

impl LopdfEngine {
    /// URI of a link annotation's action dictionary, if it has one.
    fn link_uri(&self, annot: &lopdf::Dictionary) -> Option<String> {
        let action = annot.get(b"A").ok()?;
        let Object::Dictionary(action) = self.resolve(action) else {
            return None;
        };

        let is_uri = action
            .get(b"S")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| n == b"URI")
            .unwrap_or(false);
        if !is_uri {
            return None;
        }

        match self.resolve(action.get(b"URI").ok()?) {
            Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
            _ => None,
        }
    }

    fn annot_rect(&self, annot: &lopdf::Dictionary) -> Option<[f32; 4]> {
        let Object::Array(array) = self.resolve(annot.get(b"Rect").ok()?) else {
            return None;
        };
        if array.len() < 4 {
            return None;
        }
        Some([
            get_number(&array[0])?,
            get_number(&array[1])?,
            get_number(&array[2])?,
            get_number(&array[3])?,
        ])
    }

    fn decode_show_text(
        &self,
        fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
        font_name: &[u8],
        bytes: &[u8],
    ) -> String {
        if let Some(font) = fonts.get(font_name) {
            if let Ok(enc) = font.get_font_encoding(&self.doc) {
                if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                    return text;
                }
            }
        }
        decode_pdf_string(bytes)
    }

    /// Decode a TJ array: strings are decoded and concatenated; large
    /// negative positioning adjustments (over 200/1000 em) are treated as
    /// word spaces.
    fn decode_show_array(
        &self,
        fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
        font_name: &[u8],
        arr: &[Object],
    ) -> String {
        const SPACE_THRESHOLD: f32 = 200.0;

        let mut combined = String::new();
        for item in arr {
            match item {
                Object::String(bytes, _) => {
                    combined.push_str(&self.decode_show_text(fonts, font_name, bytes));
                }
                Object::Integer(n) => {
                    if -(*n as f32) > SPACE_THRESHOLD
                        && !combined.is_empty()
                        && !combined.ends_with(' ')
                    {
                        combined.push(' ');
                    }
                }
                Object::Real(n) => {
                    if -n > SPACE_THRESHOLD && !combined.is_empty() && !combined.ends_with(' ') {
                        combined.push(' ');
                    }
                }
                _ => {}
            }
        }
        combined
    }
}

/// Text matrix state, tracked through positioning operators. The `e`/`f`
/// components are the baseline origin reported on each run.
#[derive(Debug, Clone, Copy)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
    leading: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
            leading: 0.0,
        }
    }
}

impl TextMatrix {
    fn set(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.a = a;
        self.b = b;
        self.c = c;
        self.d = d;
        self.e = e;
        self.f = f;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    fn next_line(&mut self) {
        let leading = self.leading;
        self.translate(0.0, -leading);
    }

    fn position(&self) -> (f32, f32) {
        (self.e, self.f)
    }
}

/// Accumulates show operations into text runs. Consecutive show operations
/// with no intervening positioning operator share one run unless combining
/// is disabled.
struct RunBuilder {
    runs: Vec<TextRun>,
    open: Option<TextRun>,
    options: TextOptions,
}

impl RunBuilder {
    fn new(options: TextOptions) -> Self {
        Self {
            runs: Vec::new(),
            open: None,
            options,
        }
    }

    fn push_text(&mut self, text: String, position: (f32, f32)) {
        if !self.options.disable_combine_text_items {
            if let Some(run) = self.open.as_mut() {
                run.text.push_str(&text);
                return;
            }
        } else {
            self.flush();
        }
        self.open = Some(TextRun::new(text, position.0, position.1));
    }

    fn flush(&mut self) {
        if let Some(mut run) = self.open.take() {
            if self.options.normalize_whitespace {
                run.text = normalize_whitespace(&run.text);
            }
            self.runs.push(run);
        }
    }
}

/// Collapse every whitespace sequence to a single ASCII space.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
            }
            in_whitespace = true;
        } else {
            out.push(ch);
            in_whitespace = false;
        }
    }
    out
}

/// Decode PDF string bytes: UTF-16BE with BOM, then UTF-8, then Latin-1.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    if let Ok(s) = String::from_utf8(bytes.to_vec()) {
        return s;
    }

    bytes.iter().map(|&b| b as char).collect()
}

/// Render a PDF object from the info dictionary as display text.
fn decode_value(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).to_string()),
        Object::Integer(i) => Some(i.to_string()),
        Object::Real(r) => Some(r.to_string()),
        Object::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Extract a number from an integer or real object.
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
const XMPMETA_NS: &str = "adobe:ns:meta/";

/// Namespaces whose elements and attributes are XMP structure, not
/// properties.
fn is_property_ns(ns: Option<&str>) -> bool {
    !matches!(ns, None | Some(RDF_NS) | Some(XML_NS) | Some(XMPMETA_NS))
}

fn qualified_name(node: &roxmltree::Node, local: &str, ns: Option<&str>) -> String {
    match ns.and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
        _ => local.to_string(),
    }
}

/// Flatten an XMP packet into `prefix:name` → text. Properties appear both
/// as child elements of `rdf:Description` and as attributes on it; array
/// values (`rdf:Seq`/`rdf:Alt` items) fold into the enclosing property, the
/// first item winning.
fn parse_xmp_properties(xml: &str) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            log::warn!("Unparseable XMP packet, ignoring: {}", e);
            return props;
        }
    };

    for node in doc.descendants().filter(|n| n.is_element()) {
        for attr in node.attributes() {
            if !is_property_ns(attr.namespace()) {
                continue;
            }
            let key = qualified_name(&node, attr.name(), attr.namespace());
            props.entry(key).or_insert_with(|| attr.value().to_string());
        }

        if node.children().any(|c| c.is_element()) {
            continue;
        }
        let Some(value) = node.text().map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };

        let ns = node.tag_name().namespace();
        if is_property_ns(ns) {
            let key = qualified_name(&node, node.tag_name().name(), ns);
            props.entry(key).or_insert_with(|| value.to_string());
        } else if ns == Some(RDF_NS) && node.tag_name().name() == "li" {
            let Some(owner) = node
                .ancestors()
                .find(|a| a.is_element() && is_property_ns(a.tag_name().namespace()))
            else {
                continue;
            };
            let key = qualified_name(
                &owner,
                owner.tag_name().name(),
                owner.tag_name().namespace(),
            );
            props.entry(key).or_insert_with(|| value.to_string());
        }
    }

    props
}
