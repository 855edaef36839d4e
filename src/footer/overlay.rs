//! Compositing a stamp document onto content pages.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use crate::error::{BundleError, Result};
use crate::merge::pages::import_pages;
use crate::utils::{deref, deref_dict, media_box, page_ids};

/// Key set on stamp pages pointing at the form built from them. Object
/// references survive the renumbering done on import; ids held aside would not.
const FORM_KEY: &[u8] = b"PdfBundleStampForm";

/// Base name of the stamp XObject in each page's resources.
const STAMP_NAME: &str = "FooterStamp";

/// Overlay page `i` of `stamp` onto page `i` of `target`.
///
/// Each stamp page becomes a Form XObject drawn after the page's own content,
/// which is wrapped in `q`/`Q` so its graphics state cannot leak into the
/// footer.
///
/// # Errors
///
/// Returns [`BundleError::StampMismatch`] if the page counts differ.
pub fn overlay_stamp(target: &mut Document, mut stamp: Document) -> Result<usize> {
    let target_pages = page_ids(target);
    let stamp_pages = page_ids(&stamp);
    if target_pages.len() != stamp_pages.len() {
        return Err(BundleError::StampMismatch {
            stamp_pages: stamp_pages.len(),
            content_pages: target_pages.len(),
        });
    }

    for &page_id in &stamp_pages {
        let form = page_to_form(&stamp, page_id)?;
        let form_id = stamp.add_object(form);
        stamp
            .get_dictionary_mut(page_id)?
            .set(FORM_KEY, Object::Reference(form_id));
    }

    let imported = import_pages(target, stamp, None);
    for (&page_id, &stamp_page) in target_pages.iter().zip(&imported) {
        let form_id = target
            .get_dictionary(stamp_page)?
            .get(FORM_KEY)
            .and_then(Object::as_reference)
            .map_err(|_| BundleError::pagination("stamp page lost its form reference"))?;
        attach_form(target, page_id, form_id)?;
    }
    Ok(target_pages.len())
}

/// A Form XObject with the page's content, resources and media box.
fn page_to_form(doc: &Document, page_id: ObjectId) -> Result<Stream> {
    let content = doc.get_page_content(page_id)?;
    let [x0, y0, x1, y1] = media_box(doc, page_id);
    let resources = doc
        .get_dictionary(page_id)?
        .get(b"Resources")
        .cloned()
        .unwrap_or_else(|_| Object::Dictionary(Dictionary::new()));

    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![Object::Real(x0), Object::Real(y0), Object::Real(x1), Object::Real(y1)],
            "Resources" => resources,
        },
        content,
    ))
}

/// Give `page_id` its own resources with the form added, and draw the form last.
fn attach_form(doc: &mut Document, page_id: ObjectId, form_id: ObjectId) -> Result<()> {
    let [x0, y0, _, _] = media_box(doc, page_id);
    let page = doc.get_dictionary(page_id)?;

    let mut resources = page
        .get(b"Resources")
        .ok()
        .and_then(|r| deref_dict(doc, r))
        .cloned()
        .unwrap_or_default();
    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|x| deref_dict(doc, x))
        .cloned()
        .unwrap_or_default();

    let mut name = STAMP_NAME.to_string();
    let mut suffix = 1;
    while xobjects.has(name.as_bytes()) {
        name = format!("{STAMP_NAME}{suffix}");
        suffix += 1;
    }
    xobjects.set(name.as_bytes(), Object::Reference(form_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut contents: Vec<Object> = match page.get(b"Contents").ok().and_then(|c| deref(doc, c)) {
        Some(Object::Array(parts)) => parts.clone(),
        Some(Object::Stream(_)) => page.get(b"Contents").cloned().into_iter().collect(),
        _ => Vec::new(),
    };

    let open = Content {
        operations: vec![Operation::new("q", vec![])],
    };
    let close = Content {
        operations: vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    Object::Real(x0),
                    Object::Real(y0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ],
    };
    let open_id = doc.add_object(Stream::new(Dictionary::new(), open.encode()?));
    // Streams of a /Contents array are joined without a separator.
    let mut close_bytes = b"\n".to_vec();
    close_bytes.extend(close.encode()?);
    let close_id = doc.add_object(Stream::new(Dictionary::new(), close_bytes));
    contents.insert(0, Object::Reference(open_id));
    contents.push(Object::Reference(close_id));

    let page = doc.get_dictionary_mut(page_id)?;
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Array(contents));
    Ok(())
}
