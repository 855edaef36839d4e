//! Bookmark (outline) extraction from source documents.
//!
//! A source's outline is flattened depth-first into [`SubBookmark`]s whose
//! page indices are relative to that source's own first page. Destinations
//! are resolved here, once; nothing past this module sees a raw PDF
//! destination.

use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;

use crate::utils::{decode_text_string, deref, deref_dict, page_index_map};

/// Deepest outline nesting followed before giving up on a branch.
const MAX_OUTLINE_DEPTH: usize = 64;

/// One item of a source document's own outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubBookmark {
    /// Outline title as shown in the navigation pane.
    pub title: String,
    /// 0-based page within the source document.
    pub page_index: usize,
    /// 0 for top-level items, +1 per nesting depth.
    pub level: usize,
}

/// Flattened outline of one source, plus how many items had to be dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkExtraction {
    /// Resolved items in depth-first pre-order.
    pub bookmarks: Vec<SubBookmark>,
    /// Items whose destination could not be resolved to a page.
    pub dropped: usize,
}

/// Where an outline item points, before mapping to a page index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Destination {
    /// A page object reference.
    Page(ObjectId),
    /// A raw 0-based page number.
    Index(i64),
    /// Missing, named without a lookup, or otherwise unusable.
    Unresolved,
}

/// Flatten the outline of `doc`.
///
/// Items whose destination cannot be resolved are logged and dropped; their
/// children are kept and take the dropped item's level.
pub fn extract_bookmarks(doc: &Document) -> BookmarkExtraction {
    let mut extraction = BookmarkExtraction::default();
    let Some(first) = first_outline_item(doc) else {
        return extraction;
    };

    let pages = page_index_map(doc);
    let mut visited = HashSet::new();
    // Pre-order: the sibling goes on the stack before the child so the child is popped first.
    // Entries are (item, nesting depth in the source, level to emit at).
    let mut stack = vec![(first, 0usize, 0usize)];

    while let Some((item_id, depth, level)) = stack.pop() {
        if !visited.insert(item_id) {
            log::warn!("Outline item {item_id:?} visited twice, skipping cycle");
            continue;
        }
        let Ok(item) = doc.get_dictionary(item_id) else {
            continue;
        };

        let title = item_title(doc, item);
        let destination = item_destination(doc, item, &pages);
        let child_level = match resolve(destination, &pages) {
            Some(page_index) => {
                extraction.bookmarks.push(SubBookmark {
                    title,
                    page_index,
                    level,
                });
                level + 1
            }
            None => {
                log::warn!("Dropping bookmark '{title}': destination does not resolve to a page");
                extraction.dropped += 1;
                level
            }
        };

        if let Ok(next) = item.get(b"Next").and_then(Object::as_reference) {
            stack.push((next, depth, level));
        }
        if let Ok(child) = item.get(b"First").and_then(Object::as_reference) {
            if depth + 1 < MAX_OUTLINE_DEPTH {
                stack.push((child, depth + 1, child_level));
            } else {
                log::warn!("Outline nested deeper than {MAX_OUTLINE_DEPTH} levels, truncating");
            }
        }
    }

    extraction
}

fn first_outline_item(doc: &Document) -> Option<ObjectId> {
    let outlines = doc.catalog().ok()?.get(b"Outlines").ok()?;
    deref_dict(doc, outlines)?
        .get(b"First")
        .and_then(Object::as_reference)
        .ok()
}

fn item_title(doc: &Document, item: &Dictionary) -> String {
    match item.get(b"Title").ok().and_then(|t| deref(doc, t)) {
        Some(Object::String(bytes, _)) => decode_text_string(bytes),
        _ => String::new(),
    }
}

fn item_destination(
    doc: &Document,
    item: &Dictionary,
    pages: &HashMap<ObjectId, usize>,
) -> Destination {
    if let Ok(dest) = item.get(b"Dest") {
        return classify(doc, dest, pages, true);
    }
    let Some(action) = item.get(b"A").ok().and_then(|a| deref_dict(doc, a)) else {
        return Destination::Unresolved;
    };
    let is_goto = action
        .get(b"S")
        .and_then(Object::as_name)
        .is_ok_and(|name| name == b"GoTo");
    match action.get(b"D") {
        Ok(dest) if is_goto => classify(doc, dest, pages, true),
        _ => Destination::Unresolved,
    }
}

fn classify(
    doc: &Document,
    dest: &Object,
    pages: &HashMap<ObjectId, usize>,
    allow_named: bool,
) -> Destination {
    if let Object::Reference(id) = dest
        && pages.contains_key(id)
    {
        return Destination::Page(*id);
    }

    match deref(doc, dest) {
        Some(Object::Array(array)) => match array.first() {
            Some(Object::Reference(id)) => Destination::Page(*id),
            Some(Object::Integer(n)) => Destination::Index(*n),
            _ => Destination::Unresolved,
        },
        Some(Object::Integer(n)) => Destination::Index(*n),
        Some(Object::Dictionary(dict)) => match dict.get(b"D") {
            Ok(inner) => classify(doc, inner, pages, false),
            Err(_) => Destination::Unresolved,
        },
        Some(Object::Name(name)) | Some(Object::String(name, _)) if allow_named => {
            named_destination(doc, name)
                .map_or(Destination::Unresolved, |inner| {
                    classify(doc, inner, pages, false)
                })
        }
        _ => Destination::Unresolved,
    }
}

/// Look a name up in the catalog's `/Dests` dictionary.
fn named_destination<'a>(doc: &'a Document, name: &[u8]) -> Option<&'a Object> {
    let dests = deref_dict(doc, doc.catalog().ok()?.get(b"Dests").ok()?)?;
    dests.get(name).ok()
}

fn resolve(destination: Destination, pages: &HashMap<ObjectId, usize>) -> Option<usize> {
    match destination {
        Destination::Page(id) => pages.get(&id).copied(),
        Destination::Index(n) => usize::try_from(n).ok().filter(|&n| n < pages.len()),
        Destination::Unresolved => None,
    }
}
