//! A minimal content-stream builder for generated pages.

use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};

use crate::error::Result;
use crate::text::fonts::encode_win_ansi;

/// Fill colour of drawn text and shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    /// Grey level, 0 black to 1 white.
    Gray(f32),
    /// RGB components in 0..=1.
    Rgb(f32, f32, f32),
}

impl Paint {
    /// Black.
    pub const BLACK: Paint = Paint::Gray(0.0);
    /// White.
    pub const WHITE: Paint = Paint::Gray(1.0);
    /// Red, for the confidentiality banner.
    pub const RED: Paint = Paint::Rgb(1.0, 0.0, 0.0);

    fn fill_op(self) -> Operation {
        match self {
            Self::Gray(g) => Operation::new("g", vec![g.into()]),
            Self::Rgb(r, g, b) => Operation::new("rg", vec![r.into(), g.into(), b.into()]),
        }
    }

    fn stroke_op(self) -> Operation {
        match self {
            Self::Gray(g) => Operation::new("G", vec![g.into()]),
            Self::Rgb(r, g, b) => Operation::new("RG", vec![r.into(), g.into(), b.into()]),
        }
    }
}

/// Accumulates drawing operations for one page.
#[derive(Debug, Default)]
pub struct Canvas {
    operations: Vec<Operation>,
}

impl Canvas {
    /// Empty canvas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-size path so the page always has a non-empty content stream.
    pub fn mark(&mut self) {
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("re", vec![0.into(), 0.into(), 0.into(), 0.into()]),
            Operation::new("n", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    /// Filled rectangle with its lower-left corner at `(x, y)`.
    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, paint: Paint) {
        self.operations.extend([
            Operation::new("q", vec![]),
            paint.fill_op(),
            Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()]),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    /// Horizontal rule from `x0` to `x1` at height `y`.
    pub fn hline(&mut self, x0: f32, x1: f32, y: f32, line_width: f32) {
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("w", vec![line_width.into()]),
            Paint::BLACK.stroke_op(),
            Operation::new("m", vec![x0.into(), y.into()]),
            Operation::new("l", vec![x1.into(), y.into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    /// Text with its baseline origin at `(x, y)`.
    pub fn text(&mut self, font: &str, size: f32, x: f32, y: f32, text: &str, paint: Paint) {
        self.operations.extend([
            Operation::new("q", vec![]),
            paint.fill_op(),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![win_ansi_string(text)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    /// Text drawn filled and stroked (render mode 2) with the given outline.
    #[allow(clippy::too_many_arguments)]
    pub fn outlined_text(
        &mut self,
        font: &str,
        size: f32,
        x: f32,
        y: f32,
        text: &str,
        fill: Paint,
        stroke: Paint,
        line_width: f32,
    ) {
        self.operations.extend([
            Operation::new("q", vec![]),
            fill.fill_op(),
            stroke.stroke_op(),
            Operation::new("w", vec![line_width.into()]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), size.into()]),
            Operation::new("Tr", vec![2.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![win_ansi_string(text)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    /// Encode the accumulated operations as a content stream.
    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(Content {
            operations: self.operations,
        }
        .encode()?)
    }
}

fn win_ansi_string(text: &str) -> Object {
    Object::String(encode_win_ansi(text), StringFormat::Literal)
}

/// Greedy word wrap of `text` into lines no wider than `max_width`.
///
/// Words wider than a whole line are split between characters.
pub fn wrap_text(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if measure(word) <= max_width {
            current = word.to_string();
            continue;
        }
        for ch in word.chars() {
            let mut extended = current.clone();
            extended.push(ch);
            if !current.is_empty() && measure(&extended) > max_width {
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            } else {
                current = extended;
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
