//! Page-number footers.
//!
//! Content pages are numbered by building a separate stamp document (one
//! footer-only page per content page, see [`stamp`]) and compositing it onto
//! the content ([`overlay`]). The TOC draws the same footer directly.

pub mod overlay;
pub mod stamp;

pub use overlay::overlay_stamp;
pub use stamp::build_stamp;

use crate::config::{Alignment, BundleConfig, PageNumStyle};
use crate::text::fonts::{Typeface, footer_typeface};
use crate::text::{Canvas, Paint};
use crate::utils::CM;

/// Footer point size.
pub const FOOTER_FONT_SIZE: f32 = 16.0;

/// Distance of left- and right-aligned footers from the page edge.
pub const FOOTER_SIDE_MARGIN: f32 = 50.0;

/// Width of the white outline drawn around footer glyphs.
pub const FOOTER_STROKE_WIDTH: f32 = 0.35;

/// Format the footer text of one page.
///
/// `page` is the 1-based content-relative page; the displayed number is
/// `page + offset`. A non-empty `prefix` is trimmed and joined with a space.
pub fn format_footer(
    style: PageNumStyle,
    page: usize,
    offset: usize,
    total: usize,
    prefix: &str,
) -> String {
    let n = page + offset;
    let number = match style {
        PageNumStyle::X => n.to_string(),
        PageNumStyle::XOfY => format!("{n} of {total}"),
        PageNumStyle::PageX => format!("Page {n}"),
        PageNumStyle::PageXOfY => format!("Page {n} of {total}"),
        PageNumStyle::XSlashY => format!("{n} / {total}"),
    };
    if prefix.is_empty() {
        number
    } else {
        format!("{} {number}", prefix.trim())
    }
}

/// How footers look on every page of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct FooterStyle {
    /// Face the number is set in.
    pub typeface: Typeface,
    /// Number format.
    pub style: PageNumStyle,
    /// Horizontal placement.
    pub align: Alignment,
    /// Literal text before the number.
    pub prefix: String,
}

impl FooterStyle {
    /// Footer settings of a run.
    pub fn from_config(config: &BundleConfig) -> Self {
        Self {
            typeface: footer_typeface(&config.footer_font),
            style: config.page_num_style,
            align: config.page_num_align,
            prefix: config.footer_prefix.clone(),
        }
    }

    /// Text of the footer on 1-based content page `page`.
    pub fn text(&self, page: usize, offset: usize, total: usize) -> String {
        format_footer(self.style, page, offset, total, &self.prefix)
    }

    /// Left edge of `text` on a page `page_width` wide.
    pub fn x_position(&self, text: &str, page_width: f32) -> f32 {
        let width = self.typeface.text_width(text, FOOTER_FONT_SIZE);
        match self.align {
            Alignment::Left => FOOTER_SIDE_MARGIN,
            Alignment::Centre => (page_width - width) / 2.0,
            Alignment::Right => page_width - FOOTER_SIDE_MARGIN - width,
        }
    }

    /// Draw `text` 1 cm above the bottom edge, using font resource `font`.
    pub fn draw(&self, canvas: &mut Canvas, font: &str, page_width: f32, text: &str) {
        canvas.outlined_text(
            font,
            FOOTER_FONT_SIZE,
            self.x_position(text, page_width),
            CM,
            text,
            Paint::BLACK,
            Paint::WHITE,
            FOOTER_STROKE_WIDTH,
        );
    }
}
