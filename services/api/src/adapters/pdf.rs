//! services/api/src/adapters/pdf.rs
//!
//! Reads schedule PDFs with `lopdf` and hands their text to the core
//! `ScheduleExtractor`. Text positions come from walking each page's content
//! stream and tracking the text matrix through the positioning operators.

use std::path::Path;

use attendance_core::schedule_parser::{
    Extraction, PdfContent, ScheduleExtractor, ScheduleParseError, TextElement,
};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object};
use tracing::{debug, warn};

/// Parses the schedule PDF at `path`. Blocking; call from `spawn_blocking`.
pub fn parse_schedule_pdf(
    path: &Path,
    extractor: &ScheduleExtractor,
) -> Result<Extraction, ScheduleParseError> {
    if !path.is_file() {
        return Err(ScheduleParseError::FileNotFound(path.display().to_string()));
    }
    let content = read_pdf(path)?;
    extractor.extract(&content)
}

/// Whether the bytes carry the `%PDF` header, allowing a BOM or leading whitespace.
pub fn is_pdf_magic(bytes: &[u8]) -> bool {
    let trimmed = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let start = trimmed
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(trimmed.len());
    trimmed[start..].starts_with(b"%PDF")
}

pub fn read_pdf(path: &Path) -> Result<PdfContent, ScheduleParseError> {
    let doc = Document::load(path)
        .map_err(|e| ScheduleParseError::ParsingFailed(format!("unreadable PDF: {}", e)))?;

    let mut elements = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        let data = match doc.get_page_content(page_id) {
            Ok(data) => data,
            Err(e) => {
                warn!("Skipping page {}: {}", page_number, e);
                continue;
            }
        };
        match Content::decode(&data) {
            Ok(content) => elements.extend(page_elements(page_number, &content.operations)),
            Err(e) => warn!("Could not decode content of page {}: {}", page_number, e),
        }
    }

    let readable = elements.iter().any(|e| !e.text.trim().is_empty());
    if readable && !looks_garbled(&elements) {
        debug!("Read {} positioned text runs", elements.len());
        return Ok(PdfContent::from_elements(elements));
    }

    // Fonts with custom encodings (Identity-H and other CID fonts) decode
    // poorly above; lopdf's own text extraction is a second chance.
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    let text = doc.extract_text(&pages).unwrap_or_default();
    if !text.trim().is_empty() {
        debug!("Using lopdf text extraction ({} chars)", text.len());
        return Ok(PdfContent {
            elements: Vec::new(),
            text,
        });
    }
    if readable {
        warn!("Text runs look garbled and lopdf found nothing better; using them anyway");
        return Ok(PdfContent::from_elements(elements));
    }
    Err(ScheduleParseError::NoExtractableText)
}

/// True when fewer than half of the visible characters are letters or digits,
/// which is what raw glyph ids read as Latin-1 tend to look like.
fn looks_garbled(elements: &[TextElement]) -> bool {
    let (visible, alphanumeric) = elements
        .iter()
        .flat_map(|e| e.text.chars())
        .filter(|c| !c.is_whitespace())
        .fold((0usize, 0usize), |(visible, alnum), c| {
            (visible + 1, alnum + usize::from(c.is_alphanumeric()))
        });
    visible > 0 && alphanumeric * 2 < visible
}

//=========================================================================================
// Content Stream Walking
//=========================================================================================

#[derive(Debug, Clone, Copy)]
struct TextState {
    /// Start of the current line (text line matrix translation).
    line_x: f64,
    line_y: f64,
    /// Current pen position.
    x: f64,
    y: f64,
    leading: f64,
    font_size: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            line_x: 0.0,
            line_y: 0.0,
            x: 0.0,
            y: 0.0,
            leading: 0.0,
            font_size: 10.0,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_x += tx;
        self.line_y += ty;
        self.x = self.line_x;
        self.y = self.line_y;
    }

    fn next_line(&mut self) {
        let leading = if self.leading == 0.0 { self.font_size * 1.2 } else { self.leading };
        self.move_line(0.0, -leading);
    }

    /// Advance after drawing `chars` glyphs, using an average glyph width.
    fn advance(&mut self, chars: usize) {
        self.x += chars as f64 * self.font_size * 0.5;
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn operands(op: &Operation) -> Vec<f64> {
    op.operands.iter().filter_map(number).collect()
}

fn page_elements(page: u32, operations: &[Operation]) -> Vec<TextElement> {
    let mut elements = Vec::new();
    let mut state = TextState::default();

    let mut emit = |state: &mut TextState, text: String| {
        if text.trim().is_empty() {
            state.advance(text.chars().count());
            return;
        }
        let chars = text.chars().count();
        let mut element = TextElement::new(page, state.x, state.y, text);
        element.width = chars as f64 * state.font_size * 0.5;
        elements.push(element);
        state.advance(chars);
    };

    for op in operations {
        match op.operator.as_str() {
            "BT" => {
                let font_size = state.font_size;
                let leading = state.leading;
                state = TextState {
                    font_size,
                    leading,
                    ..TextState::default()
                };
            }
            "Tf" => {
                if let Some(size) = op.operands.get(1).and_then(number) {
                    state.font_size = size.abs().max(1.0);
                }
            }
            "TL" => {
                if let Some(leading) = op.operands.first().and_then(number) {
                    state.leading = leading;
                }
            }
            "Td" => {
                if let [tx, ty] = operands(op)[..] {
                    state.move_line(tx, ty);
                }
            }
            "TD" => {
                if let [tx, ty] = operands(op)[..] {
                    state.leading = -ty;
                    state.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let [_, _, _, _, e, f] = operands(op)[..] {
                    state.line_x = e;
                    state.line_y = f;
                    state.x = e;
                    state.y = f;
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(text) = op.operands.first().and_then(string_operand) {
                    emit(&mut state, text);
                }
            }
            "'" => {
                state.next_line();
                if let Some(text) = op.operands.first().and_then(string_operand) {
                    emit(&mut state, text);
                }
            }
            "\"" => {
                state.next_line();
                if let Some(text) = op.operands.get(2).and_then(string_operand) {
                    emit(&mut state, text);
                }
            }
            "TJ" => {
                if let Some(Object::Array(parts)) = op.operands.first() {
                    emit(&mut state, array_text(parts));
                }
            }
            _ => {}
        }
    }
    elements
}

/// Joins a `TJ` array, turning large negative kerning into a space.
fn array_text(parts: &[Object]) -> String {
    let mut text = String::new();
    for part in parts {
        match part {
            Object::String(..) => {
                if let Some(piece) = string_operand(part) {
                    text.push_str(&piece);
                }
            }
            other => {
                if number(other).is_some_and(|kern| kern < -200.0) && !text.ends_with(' ') {
                    text.push(' ');
                }
            }
        }
    }
    text
}

fn string_operand(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        _ => None,
    }
}

/// UTF-16BE when the string carries a byte order mark, Latin-1 otherwise.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes
        .iter()
        .map(|&b| char::from(b))
        .filter(|c| !c.is_control() || *c == '\t')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream, StringFormat};
    use uuid::Uuid;

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn text(value: &str) -> Object {
        Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
    }

    /// Writes a one-page PDF with the given content stream to a temp file.
    fn write_pdf(operations: Vec<Operation>) -> std::path::PathBuf {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => Object::Integer(1),
                "MediaBox" => [0, 0, 595, 842].map(Object::Integer).to_vec(),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let path = std::env::temp_dir().join(format!("attendance-{}.pdf", Uuid::new_v4()));
        doc.save(&path).unwrap();
        path
    }

    #[test]
    fn detects_pdf_headers() {
        assert!(is_pdf_magic(b"%PDF-1.4"));
        assert!(is_pdf_magic(b"\xEF\xBB\xBF%PDF-1.7"));
        assert!(is_pdf_magic(b"  %PDF-1.5"));
        assert!(!is_pdf_magic(b"PK\x03\x04"));
        assert!(!is_pdf_magic(b""));
    }

    #[test]
    fn decodes_utf16_and_latin1() {
        assert_eq!(decode_pdf_string(&[0xFE, 0xFF, 0x00, 0x4D, 0x00, 0x6F]), "Mo");
        assert_eq!(decode_pdf_string(b"Caf\xE9"), "Café");
    }

    #[test]
    fn tracks_positions_through_text_operators() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
            op("Tm", [1, 0, 0, 1, 100, 700].map(Object::Integer).to_vec()),
            op("Tj", vec![text("Monday")]),
            op("Td", vec![Object::Integer(0), Object::Integer(-20)]),
            op(
                "TJ",
                vec![Object::Array(vec![text("Phys"), Object::Integer(-10), text("ics")])],
            ),
            op("T*", vec![]),
            op("Tj", vec![text("Lab")]),
            op("ET", vec![]),
        ];
        let elements = page_elements(1, &ops);
        assert_eq!(elements.len(), 3);
        assert_eq!((elements[0].x, elements[0].y), (100.0, 700.0));
        assert_eq!(elements[1].text, "Physics");
        assert_eq!((elements[1].x, elements[1].y), (100.0, 680.0));
        assert_eq!(elements[2].y, 668.0);
    }

    #[test]
    fn wide_kerning_becomes_a_space() {
        let parts = vec![text("Room"), Object::Integer(-400), text("101")];
        assert_eq!(array_text(&parts), "Room 101");
    }

    #[test]
    fn garbled_runs_are_recognised() {
        let clean = vec![
            TextElement::new(1, 0.0, 700.0, "Monday"),
            TextElement::new(1, 0.0, 680.0, "09:00 - 10:00"),
        ];
        assert!(!looks_garbled(&clean));

        let glyph_ids = vec![TextElement::new(1, 0.0, 700.0, "!/#%&$(+)")];
        assert!(looks_garbled(&glyph_ids));
        assert!(!looks_garbled(&[]));
    }

    #[test]
    fn pdf_without_text_has_nothing_to_extract() {
        let path = write_pdf(vec![op("q", vec![]), op("Q", vec![])]);
        let result = parse_schedule_pdf(&path, &ScheduleExtractor::default());
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ScheduleParseError::NoExtractableText)));
    }

    #[test]
    fn pdf_text_runs_reach_the_extractor() {
        let path = write_pdf(vec![
            op("BT", vec![]),
            op("Tm", [1, 0, 0, 1, 20, 700].map(Object::Integer).to_vec()),
            op("Tj", vec![text("Monday 09:00-10:00 Physics")]),
            op("ET", vec![]),
        ]);
        let content = read_pdf(&path);
        std::fs::remove_file(&path).ok();
        let content = content.unwrap();
        assert_eq!(content.elements.len(), 1);
        assert!(content.text.contains("Physics"));
    }

    #[test]
    fn missing_file_is_reported_as_such() {
        let err = parse_schedule_pdf(
            Path::new("/definitely/not/here.pdf"),
            &ScheduleExtractor::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleParseError::FileNotFound(_)));
    }
}
