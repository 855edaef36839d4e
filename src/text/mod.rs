//! Font metrics and positioned text extraction.
//!
//! The same width tables drive layout of generated pages (TOC, footers)
//! and measurement of text read back from them, so extracted boxes line
//! up with what was drawn.

pub mod canvas;
pub mod extract;
pub mod fonts;

pub use canvas::{Canvas, Paint, wrap_text};
pub use extract::{PageText, TextLine, extract_page_text};
pub use fonts::{FontSet, StandardFont, Typeface, footer_typeface};
