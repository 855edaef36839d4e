//! Page tree manipulation.
//!
//! Every concatenation in the pipeline (content merge, frontmatter assembly)
//! goes through [`append_document`], so all of them flatten inherited page
//! attributes and renumber objects the same way.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use crate::error::{BundleError, Result};
use crate::utils::{page_ids, pages_root, resolve_inherited};

/// Page attributes that may be inherited from an ancestor `/Pages` node.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Append every page of `source` to the end of `target`'s page tree.
///
/// `source` is renumbered above `target`'s highest object id. Its catalog and
/// intermediate page-tree nodes are discarded, so attributes those nodes
/// passed down are copied onto each page first. Objects only reachable from
/// the discarded catalog (outlines, names) are left for the writer to prune.
///
/// Returns the ids the appended pages have in `target`, in page order.
///
/// # Errors
///
/// Returns an error if `target` has no usable page tree root.
pub fn append_document(target: &mut Document, source: Document) -> Result<Vec<ObjectId>> {
    let root = pages_root(target)?;
    let appended = import_pages(target, source, Some(root));
    add_pages_to_tree(target, root, &appended)?;
    Ok(appended)
}

/// Move the objects of `source` into `target` without touching its page tree.
///
/// Returns the imported page ids in page order. Each page is flattened and
/// re-parented to `parent` when given. The source catalog and `/Pages`
/// nodes are not imported.
pub fn import_pages(
    target: &mut Document,
    mut source: Document,
    parent: Option<ObjectId>,
) -> Vec<ObjectId> {
    source.renumber_objects_with(target.max_id + 1);
    let imported = page_ids(&source);
    for &page_id in &imported {
        flatten_inherited(&mut source, page_id);
        if let Some(parent) = parent
            && let Ok(page) = source.get_dictionary_mut(page_id)
        {
            page.set("Parent", parent);
        }
    }

    let skipped: HashSet<ObjectId> = source
        .objects
        .iter()
        .filter(|(_, object)| {
            object.as_dict().is_ok_and(|dict| {
                dict.get(b"Type")
                    .and_then(Object::as_name)
                    .is_ok_and(|ty| ty == b"Catalog" || ty == b"Pages")
            })
        })
        .map(|(&id, _)| id)
        .collect();

    target.max_id = target.max_id.max(source.max_id);
    target.objects.extend(
        source
            .objects
            .into_iter()
            .filter(|(id, _)| !skipped.contains(id)),
    );
    imported
}

/// Add a new page to the end of the page tree.
pub fn push_page(
    doc: &mut Document,
    size: (f32, f32),
    content: Vec<u8>,
    resources: ObjectId,
) -> Result<ObjectId> {
    let root = pages_root(doc)?;
    let contents = doc.add_object(Stream::new(Dictionary::new(), content));
    let page = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => root,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(size.0),
            Object::Real(size.1),
        ],
        "Contents" => contents,
        "Resources" => resources,
    });
    add_pages_to_tree(doc, root, &[page])?;
    Ok(page)
}

/// Copy inherited attributes onto the page itself.
fn flatten_inherited(doc: &mut Document, page_id: ObjectId) {
    let inherited: Vec<(&[u8], Object)> = INHERITABLE
        .iter()
        .filter(|key| {
            doc.get_dictionary(page_id)
                .is_ok_and(|page| !page.has(key))
        })
        .filter_map(|&key| resolve_inherited(doc, page_id, key).map(|value| (key, value.clone())))
        .collect();

    if let Ok(page) = doc.get_dictionary_mut(page_id) {
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }
}

/// Push page references onto the root `/Kids` and bump `/Count`.
fn add_pages_to_tree(doc: &mut Document, root: ObjectId, page_ids: &[ObjectId]) -> Result<()> {
    let dict = doc
        .get_dictionary_mut(root)
        .map_err(|e| BundleError::merge(format!("Failed to get pages object: {e}")))?;

    let kids = dict
        .get_mut(b"Kids")
        .and_then(Object::as_array_mut)
        .map_err(|_| BundleError::merge("Pages dictionary missing Kids array"))?;
    kids.extend(page_ids.iter().map(|&id| Object::Reference(id)));

    let current_count = dict.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
    dict.set("Count", current_count + page_ids.len() as i64);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{media_box, new_document};

    fn source_with_inherited_box(pages: usize) -> Document {
        let (mut doc, pages_id) = new_document();
        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                Object::Reference(doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                }))
            })
            .collect();
        let tree = doc.get_dictionary_mut(pages_id).unwrap();
        tree.set("Kids", kids);
        tree.set("Count", pages as i64);
        tree.set(
            "MediaBox",
            vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        );
        doc
    }

    #[test]
    fn test_append_preserves_order_and_count() {
        let (mut target, _) = new_document();
        let first = append_document(&mut target, source_with_inherited_box(2)).unwrap();
        let second = append_document(&mut target, source_with_inherited_box(3)).unwrap();

        let pages = page_ids(&target);
        assert_eq!(pages.len(), 5);
        assert_eq!(&pages[..2], first.as_slice());
        assert_eq!(&pages[2..], second.as_slice());
    }

    #[test]
    fn test_append_flattens_inherited_media_box() {
        let (mut target, _) = new_document();
        let appended = append_document(&mut target, source_with_inherited_box(1)).unwrap();
        assert_eq!(media_box(&target, appended[0]), [0.0, 0.0, 612.0, 792.0]);
        let page = target.get_dictionary(appended[0]).unwrap();
        assert!(page.has(b"MediaBox"));
    }

    #[test]
    fn test_append_discards_source_catalog() {
        let (mut target, _) = new_document();
        append_document(&mut target, source_with_inherited_box(1)).unwrap();
        let catalogs = target
            .objects
            .values()
            .filter(|object| {
                object
                    .as_dict()
                    .is_ok_and(|d| d.get(b"Type").and_then(Object::as_name).is_ok_and(|t| t == b"Catalog"))
            })
            .count();
        assert_eq!(catalogs, 1);
    }
}
