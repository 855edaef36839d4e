//! Positioned text extraction from page content streams.
//!
//! A small content-stream interpreter that tracks the text and graphics
//! matrices, measures each shown string with the font's advance widths and
//! groups the resulting spans into baseline-aligned lines. Coordinates are
//! reported with the origin at the top-left of the media box, the way most
//! text extractors report them.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::Result;
use crate::text::fonts::{StandardFont, decode_win_ansi};
use crate::utils::{deref, deref_dict, media_box, object_to_f32, resolve_inherited};

/// Baselines closer than this are treated as one line.
const LINE_TOLERANCE: f32 = 3.0;

/// Horizontal gap that separates two spans with a space.
const WORD_GAP: f32 = 1.0;

/// Form XObject nesting limit.
const MAX_FORM_DEPTH: usize = 8;

/// One line of text with its bounding box in top-left coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Spans joined left to right.
    pub text: String,
    /// Left edge.
    pub x0: f32,
    /// Right edge.
    pub x1: f32,
    /// Distance from the top of the page to the top of the line.
    pub top: f32,
    /// Distance from the top of the page to the bottom of the line.
    pub bottom: f32,
}

/// All lines of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// Media box width.
    pub width: f32,
    /// Top edge of the media box in user space, used to flip coordinates back.
    pub height: f32,
    /// Lines sorted top to bottom.
    pub lines: Vec<TextLine>,
}

#[derive(Debug, Clone)]
struct Span {
    text: String,
    x0: f32,
    x1: f32,
    baseline: f32,
    top: f32,
    bottom: f32,
}

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn translate(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

#[derive(Debug, Clone)]
struct FontInfo {
    metrics: Option<StandardFont>,
    first_char: u32,
    widths: Vec<f32>,
    two_byte: bool,
}

impl FontInfo {
    fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let base_font = match dict.get(b"BaseFont") {
            Ok(Object::Name(name)) => String::from_utf8_lossy(name).into_owned(),
            _ => String::new(),
        };
        let two_byte = matches!(dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Type0");
        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(object_to_f32)
            .map_or(0, |v| v as u32);
        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|obj| deref(doc, obj))
            .and_then(|obj| obj.as_array().ok())
            .map(|arr| arr.iter().filter_map(object_to_f32).collect())
            .unwrap_or_default();
        Self {
            metrics: StandardFont::from_base_font(&base_font),
            first_char,
            widths,
            two_byte,
        }
    }

    fn fallback() -> Self {
        Self {
            metrics: None,
            first_char: 0,
            widths: Vec::new(),
            two_byte: false,
        }
    }

    fn width(&self, code: u32) -> f32 {
        if let Some(w) = code
            .checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
        {
            return *w;
        }
        match (self.metrics, u8::try_from(code)) {
            (Some(font), Ok(byte)) => f32::from(font.glyph_width(byte)),
            _ => 500.0,
        }
    }

    fn ascent(&self) -> f32 {
        self.metrics.map_or(718.0, StandardFont::ascent) / 1000.0
    }

    fn descent(&self) -> f32 {
        self.metrics.map_or(-207.0, StandardFont::descent) / 1000.0
    }

    fn decode(&self, bytes: &[u8]) -> (String, Vec<u32>) {
        if self.two_byte {
            let codes: Vec<u32> = bytes
                .chunks(2)
                .map(|pair| match pair {
                    [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                    [single] => u32::from(*single),
                    _ => 0,
                })
                .collect();
            let text = codes
                .iter()
                .map(|&c| char::from_u32(c).unwrap_or('\u{FFFD}'))
                .collect();
            return (text, codes);
        }
        (
            decode_win_ansi(bytes),
            bytes.iter().map(|&b| u32::from(b)).collect(),
        )
    }
}

#[derive(Debug, Clone)]
struct State {
    ctm: Matrix,
    font: Option<String>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for State {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

struct Interpreter<'a> {
    doc: &'a Document,
    page_top: f32,
    fonts: HashMap<ObjectId, FontInfo>,
    spans: Vec<Span>,
    state: State,
    stack: Vec<State>,
    tm: Matrix,
    tlm: Matrix,
}

fn operand_f32(op: &Operation, i: usize) -> f32 {
    op.operands.get(i).and_then(object_to_f32).unwrap_or(0.0)
}

fn operand_matrix(operands: &[Object]) -> Option<Matrix> {
    let values: Vec<f32> = operands.iter().filter_map(object_to_f32).collect();
    <[f32; 6]>::try_from(values).ok()
}

impl<'a> Interpreter<'a> {
    fn new(doc: &'a Document, page_top: f32) -> Self {
        Self {
            doc,
            page_top,
            fonts: HashMap::new(),
            spans: Vec::new(),
            state: State::default(),
            stack: Vec::new(),
            tm: IDENTITY,
            tlm: IDENTITY,
        }
    }

    fn run(&mut self, content: &[u8], resources: Option<&'a Dictionary>, depth: usize) {
        let content = match Content::decode(content) {
            Ok(content) => content,
            Err(e) => {
                log::debug!("Skipping undecodable content stream: {e}");
                return;
            }
        };
        for op in &content.operations {
            self.apply(op, resources, depth);
        }
    }

    fn apply(&mut self, op: &Operation, resources: Option<&'a Dictionary>, depth: usize) {
        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.stack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = operand_matrix(&op.operands) {
                    self.state.ctm = multiply(&m, &self.state.ctm);
                }
            }
            "BT" => {
                self.tm = IDENTITY;
                self.tlm = IDENTITY;
            }
            "Tf" => {
                self.state.font = match op.operands.first() {
                    Some(Object::Name(name)) => Some(String::from_utf8_lossy(name).into_owned()),
                    _ => None,
                };
                self.state.size = operand_f32(op, 1);
            }
            "Tc" => self.state.char_spacing = operand_f32(op, 0),
            "Tw" => self.state.word_spacing = operand_f32(op, 0),
            "Tz" => self.state.scale = operand_f32(op, 0) / 100.0,
            "TL" => self.state.leading = operand_f32(op, 0),
            "Ts" => self.state.rise = operand_f32(op, 0),
            "Td" => self.move_text(operand_f32(op, 0), operand_f32(op, 1)),
            "TD" => {
                let ty = operand_f32(op, 1);
                self.state.leading = -ty;
                self.move_text(operand_f32(op, 0), ty);
            }
            "Tm" => {
                if let Some(m) = operand_matrix(&op.operands) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show(bytes, resources);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show(bytes, resources);
                }
            }
            "\"" => {
                self.state.word_spacing = operand_f32(op, 0);
                self.state.char_spacing = operand_f32(op, 1);
                self.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    self.show(bytes, resources);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(bytes, resources),
                            other => {
                                if let Some(adjust) = object_to_f32(other) {
                                    let tx =
                                        -adjust / 1000.0 * self.state.size * self.state.scale;
                                    self.tm = multiply(&translate(tx, 0.0), &self.tm);
                                }
                            }
                        }
                    }
                }
            }
            "Do" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    self.draw_form(name, resources, depth);
                }
            }
            _ => {}
        }
    }

    fn move_text(&mut self, tx: f32, ty: f32) {
        self.tlm = multiply(&translate(tx, ty), &self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.move_text(0.0, -leading);
    }

    fn font_info(&mut self, resources: Option<&'a Dictionary>) -> FontInfo {
        let doc = self.doc;
        let font_ref = self.state.font.as_deref().and_then(|name| {
            let fonts = deref_dict(doc, resources?.get(b"Font").ok()?)?;
            match fonts.get(name.as_bytes()).ok()? {
                Object::Reference(id) => Some(Ok(*id)),
                Object::Dictionary(dict) => Some(Err(dict)),
                _ => None,
            }
        });
        match font_ref {
            Some(Ok(id)) => self
                .fonts
                .entry(id)
                .or_insert_with(|| {
                    doc.get_dictionary(id)
                        .map(|dict| FontInfo::from_dict(doc, dict))
                        .unwrap_or_else(|_| FontInfo::fallback())
                })
                .clone(),
            Some(Err(dict)) => FontInfo::from_dict(doc, dict),
            None => FontInfo::fallback(),
        }
    }

    fn show(&mut self, bytes: &[u8], resources: Option<&'a Dictionary>) {
        let font = self.font_info(resources);
        let (text, codes) = font.decode(bytes);
        if text.is_empty() {
            return;
        }

        let state = &self.state;
        let params = [
            state.size * state.scale,
            0.0,
            0.0,
            state.size,
            0.0,
            state.rise,
        ];
        let start = multiply(&multiply(&params, &self.tm), &state.ctm);

        let mut advance = 0.0;
        for &code in &codes {
            let mut tx = font.width(code) / 1000.0 * state.size + state.char_spacing;
            if code == 32 && !font.two_byte {
                tx += state.word_spacing;
            }
            advance += tx * state.scale;
        }
        self.tm = multiply(&translate(advance, 0.0), &self.tm);
        let end = multiply(&multiply(&params, &self.tm), &self.state.ctm);

        let vertical = (start[2] * start[2] + start[3] * start[3]).sqrt();
        let baseline_y = start[5];
        let ascent_y = baseline_y + font.ascent() * vertical;
        let descent_y = baseline_y + font.descent() * vertical;

        self.spans.push(Span {
            text,
            x0: start[4].min(end[4]),
            x1: start[4].max(end[4]),
            baseline: self.page_top - baseline_y,
            top: self.page_top - ascent_y,
            bottom: self.page_top - descent_y,
        });
    }

    fn draw_form(&mut self, name: &[u8], resources: Option<&'a Dictionary>, depth: usize) {
        if depth >= MAX_FORM_DEPTH {
            return;
        }
        let doc = self.doc;
        let Some(stream) = resources
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|obj| deref_dict(doc, obj))
            .and_then(|xobjects| xobjects.get(name).ok())
            .and_then(|obj| deref(doc, obj))
            .and_then(|obj| obj.as_stream().ok())
        else {
            return;
        };
        if !matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Form") {
            return;
        }

        let form_resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|obj| deref_dict(doc, obj))
            .or(resources);
        let content = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        self.stack.push(self.state.clone());
        if let Some(m) = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| operand_matrix(arr))
        {
            self.state.ctm = multiply(&m, &self.state.ctm);
        }
        let (tm, tlm) = (self.tm, self.tlm);
        self.run(&content, form_resources, depth + 1);
        self.tm = tm;
        self.tlm = tlm;
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }
}

fn group_lines(mut spans: Vec<Span>) -> Vec<TextLine> {
    spans.sort_by(|a, b| a.baseline.total_cmp(&b.baseline).then(a.x0.total_cmp(&b.x0)));

    let mut groups: Vec<(f32, Vec<Span>)> = Vec::new();
    for span in spans {
        match groups.last_mut() {
            Some((baseline, members)) if (span.baseline - *baseline).abs() <= LINE_TOLERANCE => {
                members.push(span);
            }
            _ => groups.push((span.baseline, vec![span])),
        }
    }

    groups
        .into_iter()
        .filter_map(|(_, mut members)| {
            members.sort_by(|a, b| a.x0.total_cmp(&b.x0));
            let mut text = String::new();
            let mut last_x1: Option<f32> = None;
            for span in &members {
                if let Some(x1) = last_x1
                    && span.x0 - x1 > WORD_GAP
                    && !text.ends_with(' ')
                    && !span.text.starts_with(' ')
                {
                    text.push(' ');
                }
                text.push_str(&span.text);
                last_x1 = Some(last_x1.map_or(span.x1, |x1: f32| x1.max(span.x1)));
            }
            if text.trim().is_empty() {
                return None;
            }
            Some(TextLine {
                text,
                x0: members.iter().map(|s| s.x0).fold(f32::INFINITY, f32::min),
                x1: members.iter().map(|s| s.x1).fold(f32::NEG_INFINITY, f32::max),
                top: members.iter().map(|s| s.top).fold(f32::INFINITY, f32::min),
                bottom: members
                    .iter()
                    .map(|s| s.bottom)
                    .fold(f32::NEG_INFINITY, f32::max),
            })
        })
        .collect()
}

/// Extract positioned text lines from one page.
pub fn extract_page_text(doc: &Document, page_id: ObjectId) -> Result<PageText> {
    let [x0, _, x1, y1] = media_box(doc, page_id);
    let resources = resolve_inherited(doc, page_id, b"Resources").and_then(|obj| deref_dict(doc, obj));

    let content = match doc.get_page_content(page_id) {
        Ok(content) => content,
        Err(e) => {
            log::debug!("Page {page_id:?} has no readable content: {e}");
            Vec::new()
        }
    };

    let mut interpreter = Interpreter::new(doc, y1);
    interpreter.run(&content, resources, 0);

    Ok(PageText {
        width: x1 - x0,
        height: y1,
        lines: group_lines(interpreter.spans),
    })
}
