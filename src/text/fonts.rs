//! Standard Type1 font metrics and WinAnsi encoding.
//!
//! Generated pages only use non-embedded standard fonts, so layout needs
//! nothing more than the AFM advance widths for printable ASCII plus a
//! fallback for the rest of the WinAnsi range.

use lopdf::{Document, Object, ObjectId, dictionary};

use crate::config::FontChoice;

/// Advance widths for codes 32..=126, in thousandths of an em.
type WidthTable = [u16; 95];

#[rustfmt::skip]
const HELVETICA: WidthTable = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: WidthTable = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: WidthTable = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: WidthTable = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

/// One of the standard fonts whose metrics are built in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    /// Helvetica.
    Helvetica,
    /// Helvetica-Bold.
    HelveticaBold,
    /// Times-Roman.
    TimesRoman,
    /// Times-Bold.
    TimesBold,
    /// Courier.
    Courier,
    /// Courier-Bold.
    CourierBold,
}

impl StandardFont {
    /// The PostScript name of the font.
    pub fn base_font(self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
        }
    }

    /// Match a `/BaseFont` name, ignoring a subset tag.
    pub fn from_base_font(name: &str) -> Option<Self> {
        let name = name.split_once('+').map_or(name, |(_, rest)| rest);
        match name {
            "Helvetica" | "Arial" | "ArialMT" => Some(Self::Helvetica),
            "Helvetica-Bold" | "Arial-Bold" | "Arial-BoldMT" => Some(Self::HelveticaBold),
            "Times-Roman" | "TimesNewRoman" | "TimesNewRomanPSMT" => Some(Self::TimesRoman),
            "Times-Bold" | "TimesNewRoman-Bold" | "TimesNewRomanPS-BoldMT" => {
                Some(Self::TimesBold)
            }
            "Courier" | "CourierNew" | "CourierNewPSMT" => Some(Self::Courier),
            "Courier-Bold" | "CourierNew-Bold" | "CourierNewPS-BoldMT" => Some(Self::CourierBold),
            _ => None,
        }
    }

    /// Advance width of a WinAnsi code in thousandths of an em.
    pub fn glyph_width(self, code: u8) -> u16 {
        let table = match self {
            Self::Courier | Self::CourierBold => return 600,
            Self::Helvetica => &HELVETICA,
            Self::HelveticaBold => &HELVETICA_BOLD,
            Self::TimesRoman => &TIMES_ROMAN,
            Self::TimesBold => &TIMES_BOLD,
        };
        match code {
            32..=126 => table[(code - 32) as usize],
            0xA0 => table[0],
            // en dash, em dash
            0x96 => table[(b'-' - 32) as usize].max(500),
            0x97 => 1000,
            _ => table[(b'n' - 32) as usize],
        }
    }

    /// Ascender height in thousandths of an em.
    pub fn ascent(self) -> f32 {
        match self {
            Self::Helvetica | Self::HelveticaBold => 718.0,
            Self::TimesRoman | Self::TimesBold => 683.0,
            Self::Courier | Self::CourierBold => 629.0,
        }
    }

    /// Descender depth in thousandths of an em (negative).
    pub fn descent(self) -> f32 {
        match self {
            Self::Helvetica | Self::HelveticaBold => -207.0,
            Self::TimesRoman | Self::TimesBold => -217.0,
            Self::Courier | Self::CourierBold => -157.0,
        }
    }
}

/// A font as written into a generated page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Typeface {
    /// Name written to `/BaseFont`.
    pub base_font: &'static str,
    /// Metrics used for layout.
    pub metrics: StandardFont,
    /// Whether the face is a standard font (no `/Widths` needed).
    pub standard: bool,
}

impl Typeface {
    /// A standard font.
    pub const fn standard(metrics: StandardFont) -> Self {
        Self {
            base_font: match metrics {
                StandardFont::Helvetica => "Helvetica",
                StandardFont::HelveticaBold => "Helvetica-Bold",
                StandardFont::TimesRoman => "Times-Roman",
                StandardFont::TimesBold => "Times-Bold",
                StandardFont::Courier => "Courier",
                StandardFont::CourierBold => "Courier-Bold",
            },
            metrics,
            standard: true,
        }
    }

    /// Width of `text` at `size` points.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .into_iter()
            .map(|code| u32::from(self.metrics.glyph_width(code)))
            .sum();
        units as f32 * size / 1000.0
    }

    /// Add a font dictionary for this face to `doc`.
    pub fn add_to(&self, doc: &mut Document) -> ObjectId {
        let mut font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => self.base_font,
            "Encoding" => "WinAnsiEncoding",
        };
        if !self.standard {
            let widths: Vec<Object> = (32u8..=255)
                .map(|code| Object::Integer(i64::from(self.metrics.glyph_width(code))))
                .collect();
            let descriptor = doc.add_object(dictionary! {
                "Type" => "FontDescriptor",
                "FontName" => self.base_font,
                "Flags" => 34,
                "FontBBox" => vec![
                    Object::Integer(-168),
                    Object::Integer(-218),
                    Object::Integer(1000),
                    Object::Integer(898),
                ],
                "ItalicAngle" => 0,
                "Ascent" => self.metrics.ascent() as i64,
                "Descent" => self.metrics.descent() as i64,
                "CapHeight" => 662,
                "StemV" => 84,
            });
            font.set("FirstChar", 32);
            font.set("LastChar", 255);
            font.set("Widths", widths);
            font.set("FontDescriptor", descriptor);
        }
        doc.add_object(font)
    }
}

/// Regular and bold faces plus the base size of the TOC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSet {
    /// Body text face.
    pub regular: Typeface,
    /// Headings and emphasis.
    pub bold: Typeface,
    /// Base point size.
    pub size: f32,
}

const CHARTER_REGULAR: Typeface = Typeface {
    base_font: "CharterBT-Roman",
    metrics: StandardFont::TimesRoman,
    standard: false,
};

const CHARTER_BOLD: Typeface = Typeface {
    base_font: "CharterBT-Bold",
    metrics: StandardFont::TimesBold,
    standard: false,
};

impl FontSet {
    /// Faces for the TOC. Unknown choices use sans with a warning.
    pub fn for_index(choice: &FontChoice) -> Self {
        let (regular, bold, size) = match choice {
            FontChoice::Serif => (StandardFont::TimesRoman, StandardFont::TimesBold, 12.0),
            FontChoice::Sans => (StandardFont::Helvetica, StandardFont::HelveticaBold, 12.0),
            FontChoice::Mono => (StandardFont::Courier, StandardFont::CourierBold, 10.0),
            FontChoice::Traditional => {
                return Self {
                    regular: CHARTER_REGULAR,
                    bold: CHARTER_BOLD,
                    size: 12.0,
                };
            }
            FontChoice::Other(name) => {
                log::warn!("Unknown index font '{name}', using sans");
                (StandardFont::Helvetica, StandardFont::HelveticaBold, 12.0)
            }
        };
        Self {
            regular: Typeface::standard(regular),
            bold: Typeface::standard(bold),
            size,
        }
    }
}

/// Face for footer stamps: the bold member of the chosen family.
///
/// Unknown choices fall back to Times-Roman with a warning.
pub fn footer_typeface(choice: &FontChoice) -> Typeface {
    match choice {
        FontChoice::Serif => Typeface::standard(StandardFont::TimesBold),
        FontChoice::Sans => Typeface::standard(StandardFont::HelveticaBold),
        FontChoice::Mono => Typeface::standard(StandardFont::CourierBold),
        FontChoice::Traditional => CHARTER_BOLD,
        FontChoice::Other(name) => {
            log::warn!("Unknown footer font '{name}', using Times-Roman");
            Typeface::standard(StandardFont::TimesRoman)
        }
    }
}

const WIN_ANSI_HIGH: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('\u{2018}', 0x91),
    ('\u{2019}', 0x92),
    ('\u{201C}', 0x93),
    ('\u{201D}', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

/// Encode text as WinAnsi bytes. Unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u8,
            _ => WIN_ANSI_HIGH
                .iter()
                .find(|(ch, _)| *ch == c)
                .map_or(b'?', |(_, code)| *code),
        })
        .collect()
}

/// Decode WinAnsi bytes.
pub fn decode_win_ansi(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => WIN_ANSI_HIGH
                .iter()
                .find(|(_, code)| *code == b)
                .map_or('\u{FFFD}', |(ch, _)| *ch),
            _ => b as char,
        })
        .collect()
}
