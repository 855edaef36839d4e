//! Shared helpers: input globbing and small lopdf object utilities.

use std::collections::HashMap;
use std::path::PathBuf;

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};

use crate::error::{BundleError, Result};

/// A4 portrait in points.
pub const A4: (f32, f32) = (595.2756, 841.8898);

/// Points per centimetre.
pub const CM: f32 = 72.0 / 2.54;

/// Expand each pattern with `glob`, keeping literal paths that match nothing.
///
/// Results keep the order of the patterns; matches within one pattern are
/// in the order `glob` yields them.
pub fn collect_paths_for_patterns<T>(patterns: T) -> Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut resolved_paths = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        let paths = glob::glob(pattern).map_err(|err| BundleError::Other {
            message: format!("Invalid pattern '{pattern}': {err}"),
        })?;

        let mut matched = false;
        for entry in paths {
            let path = entry.map_err(|err| BundleError::Other {
                message: err.to_string(),
            })?;
            matched = true;
            resolved_paths.push(path);
        }

        if !matched {
            resolved_paths.push(PathBuf::from(pattern));
        }
    }

    Ok(resolved_paths)
}

/// Read a number that may be stored as an integer or a real.
pub(crate) fn object_to_f32(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

/// Follow a reference one level, returning the object itself otherwise.
pub(crate) fn deref<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Resolve a dictionary value that may be an indirect reference.
pub(crate) fn deref_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    deref(doc, obj)?.as_dict().ok()
}

/// Look up a key in the page dictionary, walking up the page tree via
/// `/Parent` when the page itself does not carry it.
pub(crate) fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current_id = page_id;
    for _ in 0..64 {
        let dict = doc.get_dictionary(current_id).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current_id = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// A page's media box as `[x0, y0, x1, y1]`, defaulting to A4.
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let parsed = resolve_inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| deref(doc, obj))
        .and_then(|obj| obj.as_array().ok())
        .and_then(|arr| {
            let values: Vec<f32> = arr.iter().filter_map(object_to_f32).collect();
            <[f32; 4]>::try_from(values).ok()
        });
    parsed.unwrap_or([0.0, 0.0, A4.0, A4.1])
}

/// Page object ids in document order.
pub(crate) fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Map from page object id to 0-based page index.
pub(crate) fn page_index_map(doc: &Document) -> HashMap<ObjectId, usize> {
    doc.get_pages()
        .into_iter()
        .map(|(number, id)| (id, number as usize - 1))
        .collect()
}

/// The catalog's `/Pages` root.
pub(crate) fn pages_root(doc: &Document) -> Result<ObjectId> {
    Ok(doc.catalog()?.get(b"Pages")?.as_reference()?)
}

/// Create an empty document with a catalog and an empty page tree.
pub(crate) fn new_document() -> (Document, ObjectId) {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    (doc, pages_id)
}

/// Decode a PDF text string (UTF-16BE with BOM, or PDFDocEncoding treated as Latin-1).
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Encode a string as a PDF text string, using UTF-16BE only when needed.
pub(crate) fn encode_text_string(text: &str) -> Object {
    if text.chars().all(|c| (c as u32) < 0x80) {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, lopdf::StringFormat::Hexadecimal)
}
