use std::collections::BTreeMap;
use std::path::Path;

use encoding_rs::UTF_16BE;
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::crop::CropRegion;
use crate::table_detect::{DetectedTable, detect_tables};

/// US Letter, the fallback when no MediaBox can be resolved.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// One line of page text. `y` is the text baseline in PDF coordinates
/// (origin at the bottom-left); `None` marks lines recovered through a
/// fallback extractor that exposes no geometry.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextLine {
    pub y: Option<f32>,
    pub text: String,
}

#[derive(Debug)]
pub(crate) struct PdfPage {
    pub number: u32,
    pub width: f32,
    pub height: f32,
    pub lines: Vec<TextLine>,
}

/// View of a page restricted to a crop region. Lines without a known
/// baseline always survive the crop; the region's horizontal extent is
/// carried but not applied because line text has no x geometry (the
/// conversion always crops full-width bands anyway).
pub(crate) struct CroppedPage<'a> {
    lines: Vec<&'a TextLine>,
}

impl PdfPage {
    pub(crate) fn within_bounding_box(&self, region: &CropRegion) -> CroppedPage<'_> {
        let lines = self
            .lines
            .iter()
            .filter(|line| match line.y {
                Some(y) => {
                    let from_top = self.height - y;
                    from_top >= region.top && from_top <= region.bottom
                }
                None => true,
            })
            .collect();
        CroppedPage { lines }
    }
}

impl CroppedPage<'_> {
    pub(crate) fn extract_text(&self) -> Option<String> {
        if self.lines.is_empty() {
            return None;
        }
        let text = self
            .lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() { None } else { Some(text) }
    }

    pub(crate) fn extract_tables(&self) -> Vec<DetectedTable> {
        detect_tables(self.lines.iter().map(|line| line.text.as_str()))
    }
}

pub(crate) struct PdfDocument {
    document: Document,
    pages: BTreeMap<u32, ObjectId>,
    /// Per-page text from pdf-extract, kept only when its form-feed page
    /// split matches the page tree.
    fallback_pages: Option<Vec<String>>,
}

fn split_text_into_pages(raw_text: &str) -> Vec<String> {
    let mut pages = raw_text
        .split('\u{000C}')
        .map(str::to_string)
        .collect::<Vec<_>>();
    if pages.last().is_some_and(String::is_empty) {
        pages.pop();
    }
    pages
}

fn looks_decoding_broken(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    let total = text.chars().count();
    let replacement = text.matches('\u{FFFD}').count();
    let control = text
        .chars()
        .filter(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
        .count();

    replacement * 8 > total || control * 5 > total
}

fn decode_pdf_bytes(encoding: Option<&str>, bytes: &[u8]) -> String {
    let decoded = Document::decode_text(encoding, bytes);
    if !looks_decoding_broken(&decoded) {
        return decoded;
    }

    if bytes.starts_with(&[0xFE, 0xFF]) || bytes.starts_with(&[0xFF, 0xFE]) {
        let bytes = if bytes.len() > 2 { &bytes[2..] } else { bytes };
        let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(bytes);
        if !had_errors && !utf16.is_empty() {
            return utf16.into_owned();
        }
    }

    if let Some(name) = encoding {
        let lower = name.to_ascii_lowercase();
        if lower.contains("utf16")
            || lower.contains("ucs2")
            || lower.contains("identity-h")
            || lower.contains("unicode")
        {
            let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(bytes);
            if !had_errors && !utf16.is_empty() {
                return utf16.into_owned();
            }
        }
    }

    String::from_utf8_lossy(bytes).to_string()
}

fn object_to_f32(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

fn media_box_values(object: &Object) -> Option<[f32; 4]> {
    let Object::Array(values) = object else {
        return None;
    };
    if values.len() != 4 {
        return None;
    }
    let mut rect = [0.0_f32; 4];
    for (slot, value) in rect.iter_mut().zip(values) {
        *slot = object_to_f32(value)?;
    }
    Some(rect)
}

impl PdfDocument {
    pub(crate) fn open(path: &Path) -> Result<Self, lopdf::Error> {
        let document = Document::load(path)?;
        let pages = document.get_pages();

        let fallback_pages = match pdf_extract::extract_text(path) {
            Ok(text) => {
                let split = split_text_into_pages(&text);
                if split.len() == pages.len() {
                    Some(split)
                } else {
                    debug!(
                        extracted = split.len(),
                        actual = pages.len(),
                        "pdf-extract page split does not match the page tree; ignoring it"
                    );
                    None
                }
            }
            Err(error) => {
                debug!(%error, "pdf-extract failed; positioned extraction only");
                None
            }
        };

        Ok(Self {
            document,
            pages,
            fallback_pages,
        })
    }

    pub(crate) fn page_count(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }

    /// Load one page. Returns `None` when the page number is absent from the
    /// page tree, which only happens on documents with a broken catalog.
    pub(crate) fn page(&self, number: u32) -> Option<PdfPage> {
        let page_id = *self.pages.get(&number)?;
        let (width, height) = self.page_dimensions(page_id);

        let mut lines = self.positioned_lines(page_id);
        let joined = lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if lines.is_empty() || looks_decoding_broken(&joined) {
            let fallback = self.fallback_lines(number);
            if !fallback.is_empty() {
                warn!(
                    page = number,
                    "content-stream extraction yielded no usable text; using plain extraction without positions"
                );
                lines = fallback;
            }
        }

        Some(PdfPage {
            number,
            width,
            height,
            lines,
        })
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.document.get_object(*id).unwrap_or(object),
            _ => object,
        }
    }

    /// MediaBox from the page dictionary, inherited through the Parent
    /// chain when absent.
    fn page_dimensions(&self, page_id: ObjectId) -> (f32, f32) {
        let Ok(mut dict) = self.document.get_dictionary(page_id) else {
            return DEFAULT_PAGE_SIZE;
        };

        // Parent chains are shallow; bound the walk against cycles.
        for _ in 0..16 {
            if let Ok(object) = dict.get(b"MediaBox")
                && let Some(rect) = media_box_values(self.resolve(object))
            {
                return (rect[2] - rect[0], rect[3] - rect[1]);
            }

            let Some(parent) = dict
                .get(b"Parent")
                .ok()
                .and_then(|object| object.as_reference().ok())
            else {
                break;
            };
            match self.document.get_dictionary(parent) {
                Ok(parent_dict) => dict = parent_dict,
                Err(_) => break,
            }
        }

        DEFAULT_PAGE_SIZE
    }

    /// Walk the page content stream and collect text lines together with
    /// their baselines, tracked through the text-positioning operators.
    fn positioned_lines(&self, page_id: ObjectId) -> Vec<TextLine> {
        fn collect_text(text: &mut String, encoding: Option<&str>, operands: &[Object]) {
            for operand in operands {
                match operand {
                    Object::String(bytes, _) => {
                        text.push_str(&decode_pdf_bytes(encoding, bytes));
                    }
                    Object::Array(items) => {
                        collect_text(text, encoding, items);
                        text.push(' ');
                    }
                    Object::Integer(value) => {
                        if *value < -100 {
                            text.push(' ');
                        }
                    }
                    _ => {}
                }
            }
        }

        fn flush(lines: &mut Vec<TextLine>, current: &mut String, current_y: f32) {
            if current.trim().is_empty() {
                current.clear();
            } else {
                lines.push(TextLine {
                    y: Some(current_y),
                    text: std::mem::take(current),
                });
            }
        }

        let Ok(raw_content) = self.document.get_page_content(page_id) else {
            return Vec::new();
        };
        let Ok(content) = Content::decode(&raw_content) else {
            return Vec::new();
        };
        let encodings = self
            .document
            .get_page_fonts(page_id)
            .into_iter()
            .map(|(name, font)| (name, font.get_font_encoding()))
            .collect::<BTreeMap<Vec<u8>, &str>>();

        let mut lines = Vec::new();
        let mut current = String::new();
        let mut current_y = 0.0_f32;
        let mut y = 0.0_f32;
        let mut leading = 0.0_f32;
        let mut current_encoding = None;

        for operation in content.operations {
            let operands = &operation.operands;
            match operation.operator.as_str() {
                "BT" => {
                    flush(&mut lines, &mut current, current_y);
                    y = 0.0;
                    leading = 0.0;
                }
                "Tf" => {
                    if let Some(font_name) =
                        operands.first().and_then(|operand| operand.as_name().ok())
                    {
                        current_encoding = encodings.get(font_name).copied();
                    }
                }
                "TL" => {
                    if let Some(value) = operands.first().and_then(object_to_f32) {
                        leading = value;
                    }
                }
                "Tm" => {
                    flush(&mut lines, &mut current, current_y);
                    if let Some(value) = operands.get(5).and_then(object_to_f32) {
                        y = value;
                    }
                }
                "Td" => {
                    flush(&mut lines, &mut current, current_y);
                    if let Some(ty) = operands.get(1).and_then(object_to_f32) {
                        y += ty;
                    }
                }
                "TD" => {
                    flush(&mut lines, &mut current, current_y);
                    if let Some(ty) = operands.get(1).and_then(object_to_f32) {
                        leading = -ty;
                        y += ty;
                    }
                }
                "T*" => {
                    flush(&mut lines, &mut current, current_y);
                    y -= leading;
                }
                "Tj" | "TJ" => {
                    if current.is_empty() {
                        current_y = y;
                    }
                    collect_text(&mut current, current_encoding, operands);
                }
                "'" | "\"" => {
                    flush(&mut lines, &mut current, current_y);
                    y -= leading;
                    current_y = y;
                    collect_text(&mut current, current_encoding, operands);
                }
                "ET" => {
                    flush(&mut lines, &mut current, current_y);
                }
                _ => {}
            }
        }

        flush(&mut lines, &mut current, current_y);
        lines
    }

    /// Plain text for a page when the positioned walk comes up empty:
    /// pdf-extract's page split first, then lopdf's own extractor.
    fn fallback_lines(&self, number: u32) -> Vec<TextLine> {
        let text = self
            .fallback_pages
            .as_ref()
            .and_then(|pages| pages.get(number as usize - 1))
            .filter(|text| !text.trim().is_empty())
            .cloned()
            .or_else(|| {
                self.document
                    .extract_text(&[number])
                    .ok()
                    .filter(|text| !text.trim().is_empty())
            });

        match text {
            Some(text) => text
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| TextLine {
                    y: None,
                    text: line.to_string(),
                })
                .collect(),
            None => Vec::new(),
        }
    }
}
