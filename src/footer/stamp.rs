//! Footer-only stamp documents.

use lopdf::{Document, Object, ObjectId, dictionary};

use crate::error::Result;
use crate::footer::FooterStyle;
use crate::merge::pages::push_page;
use crate::text::Canvas;
use crate::utils::new_document;

/// Font resource name of the footer face inside stamp pages.
const FOOTER_FONT: &str = "FS";

/// Build one footer-only page per entry of `page_sizes`.
///
/// Page `i` (0-based) carries the footer for content page `i + 1`, displayed
/// as `i + 1 + offset`. Every page starts with a zero-size path so it is
/// never treated as blank.
pub fn build_stamp(
    page_sizes: &[(f32, f32)],
    footer: &FooterStyle,
    offset: usize,
    total: usize,
) -> Result<Document> {
    let (mut doc, _) = new_document();
    let resources = footer_resources(&mut doc, footer);

    for (i, &(width, height)) in page_sizes.iter().enumerate() {
        let mut canvas = Canvas::new();
        canvas.mark();
        let text = footer.text(i + 1, offset, total);
        footer.draw(&mut canvas, FOOTER_FONT, width, &text);
        push_page(&mut doc, (width, height), canvas.finish()?, resources)?;
    }
    Ok(doc)
}

/// A resource dictionary exposing the footer face as [`FOOTER_FONT`].
fn footer_resources(doc: &mut Document, footer: &FooterStyle) -> ObjectId {
    let font = footer.typeface.add_to(doc);
    doc.add_object(dictionary! {
        "Font" => dictionary! { FOOTER_FONT => Object::Reference(font) },
    })
}

/// Add the footer face to an existing resource dictionary under [`FOOTER_FONT`].
pub(crate) fn register_footer_font(
    doc: &mut Document,
    fonts: &mut lopdf::Dictionary,
    footer: &FooterStyle,
) -> &'static str {
    let font = footer.typeface.add_to(doc);
    fonts.set(FOOTER_FONT, Object::Reference(font));
    FOOTER_FONT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BundleConfig, PageNumStyle};
    use crate::text::extract_page_text;
    use crate::utils::{A4, page_ids};

    #[test]
    fn test_stamp_has_one_page_per_content_page() {
        let footer = FooterStyle::from_config(&BundleConfig::default());
        let stamp = build_stamp(&[A4; 4], &footer, 0, 4).unwrap();
        assert_eq!(stamp.get_pages().len(), 4);
    }

    #[test]
    fn test_stamp_text_includes_offset() {
        let footer = FooterStyle {
            style: PageNumStyle::PageXOfY,
            ..FooterStyle::from_config(&BundleConfig::default())
        };
        let stamp = build_stamp(&[A4; 3], &footer, 2, 12).unwrap();
        let last = page_ids(&stamp)[2];
        let text = extract_page_text(&stamp, last).unwrap();
        assert_eq!(text.lines.len(), 1);
        assert_eq!(text.lines[0].text, "Page 5 of 12");
    }

    #[test]
    fn test_stamp_pages_are_never_empty() {
        let footer = FooterStyle::from_config(&BundleConfig::default());
        let stamp = build_stamp(&[A4], &footer, 0, 1).unwrap();
        let page = page_ids(&stamp)[0];
        let content = stamp.get_page_content(page).unwrap();
        assert!(content.starts_with(b"q"));
    }
}
