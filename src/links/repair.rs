//! Re-targeting the internal TOC links of nested bundles.
//!
//! A nested bundle's TOC links point at its own pages. During merge those
//! destinations are rewritten to `[index /Fit]` with `index` relative to the
//! nested bundle's first page ([`normalize_toc_links`]); numbers survive the
//! renumbering of every later concatenation, references would not. Once the
//! final page order is fixed, [`repair_nested_links`] turns each into a
//! reference to the absolute page.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;

use crate::error::{BundleError, Result};
use crate::utils::{deref, deref_dict, page_ids, page_index_map};

/// A merged source that carries its own table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedBundle {
    /// Index key of the source.
    pub source_key: String,
    /// Content-relative page the source starts on.
    pub content_start: usize,
    /// Number of TOC pages at the start of the source.
    pub toc_pages: usize,
}

/// Outcome of a repair pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// Links re-targeted to an absolute page.
    pub repaired: usize,
    /// Links whose rebased target fell outside the bundle.
    pub out_of_range: usize,
}

/// Rewrite link destinations on the first `toc_pages` pages of a source to
/// source-relative page indices.
///
/// Returns the number of links rewritten. Links that do not resolve to a
/// page of this document are left as they are.
pub fn normalize_toc_links(doc: &mut Document, toc_pages: usize) -> usize {
    let pages = page_index_map(doc);
    let mut rewrites = Vec::new();

    for page_id in page_ids(doc).into_iter().take(toc_pages) {
        for annot_id in link_annotations(doc, page_id) {
            let Ok(annot) = doc.get_dictionary(annot_id) else {
                continue;
            };
            match link_target(doc, annot, &pages) {
                Some(index) => rewrites.push((annot_id, index)),
                None => log::debug!("Nested TOC link {annot_id:?} has no page destination"),
            }
        }
    }

    let count = rewrites.len();
    for (annot_id, index) in rewrites {
        if let Ok(annot) = doc.get_dictionary_mut(annot_id) {
            annot.remove(b"A");
            annot.set("Dest", fit_destination(Object::Integer(index as i64)));
        }
    }
    count
}

/// Rebase normalized links on every nested bundle's TOC pages.
///
/// `frontmatter_len` is the assembled coversheet plus TOC length. Only
/// integer destinations are touched, so links already pointing at a page
/// object are never moved twice.
///
/// # Errors
///
/// Returns [`BundleError::LinkRepair`] if a nested bundle's TOC pages lie
/// outside the document.
pub fn repair_nested_links(
    doc: &mut Document,
    nested: &[NestedBundle],
    frontmatter_len: usize,
) -> Result<RepairReport> {
    let pages = page_ids(doc);
    let mut report = RepairReport::default();
    let mut rewrites: Vec<(ObjectId, ObjectId)> = Vec::new();

    for bundle in nested {
        let start = bundle.content_start + frontmatter_len;
        let end = start + bundle.toc_pages;
        if end > pages.len() {
            return Err(BundleError::link_repair(format!(
                "TOC pages {}..{} of nested bundle '{}' exceed the {} page bundle",
                start + 1,
                end,
                bundle.source_key,
                pages.len()
            )));
        }

        for &page_id in &pages[start..end] {
            for annot_id in link_annotations(doc, page_id) {
                let Some(relative) = doc
                    .get_dictionary(annot_id)
                    .ok()
                    .and_then(relative_destination)
                else {
                    continue;
                };
                match pages.get(start + relative) {
                    Some(&target) => rewrites.push((annot_id, target)),
                    None => {
                        log::warn!(
                            "Link in nested bundle '{}' points past the end of the bundle",
                            bundle.source_key
                        );
                        report.out_of_range += 1;
                    }
                }
            }
        }
    }

    for (annot_id, target) in rewrites {
        if let Ok(annot) = doc.get_dictionary_mut(annot_id) {
            annot.set("Dest", fit_destination(Object::Reference(target)));
            report.repaired += 1;
        }
    }
    Ok(report)
}

/// `[target /Fit]`
pub(crate) fn fit_destination(target: Object) -> Object {
    Object::Array(vec![target, Object::Name(b"Fit".to_vec())])
}

/// Ids of indirect `/Link` annotations on a page.
pub(crate) fn link_annotations(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let Some(annots) = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Annots").ok())
        .and_then(|annots| deref(doc, annots))
        .and_then(|annots| annots.as_array().ok())
    else {
        return Vec::new();
    };

    annots
        .iter()
        .filter_map(|annot| annot.as_reference().ok())
        .filter(|&id| {
            doc.get_dictionary(id).is_ok_and(|dict| {
                dict.get(b"Subtype")
                    .and_then(Object::as_name)
                    .is_ok_and(|subtype| subtype == b"Link")
            })
        })
        .collect()
}

/// The 0-based page a link in `doc` jumps to.
fn link_target(doc: &Document, annot: &Dictionary, pages: &HashMap<ObjectId, usize>) -> Option<usize> {
    let dest = match annot.get(b"Dest") {
        Ok(dest) => dest,
        Err(_) => {
            let action = deref_dict(doc, annot.get(b"A").ok()?)?;
            if !action.get(b"S").and_then(Object::as_name).is_ok_and(|s| s == b"GoTo") {
                return None;
            }
            action.get(b"D").ok()?
        }
    };
    let first = match deref(doc, dest)? {
        Object::Array(array) => array.first()?,
        other => other,
    };
    match first {
        Object::Reference(id) => pages.get(id).copied(),
        Object::Integer(n) => usize::try_from(*n).ok().filter(|&n| n < pages.len()),
        _ => None,
    }
}

/// A normalized destination's source-relative index.
fn relative_destination(annot: &Dictionary) -> Option<usize> {
    let dest = annot.get(b"Dest").ok()?.as_array().ok()?;
    match dest.first()? {
        Object::Integer(n) => usize::try_from(*n).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::new_document;
    use lopdf::dictionary;

    fn document_with_pages(count: usize) -> Document {
        let (mut doc, pages_id) = new_document();
        let kids: Vec<Object> = (0..count)
            .map(|_| {
                Object::Reference(doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                }))
            })
            .collect();
        let tree = doc.get_dictionary_mut(pages_id).unwrap();
        tree.set("Kids", kids);
        tree.set("Count", count as i64);
        doc
    }

    fn add_link(doc: &mut Document, page_index: usize, dest: Object) -> ObjectId {
        let page_id = page_ids(doc)[page_index];
        let link = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(10), Object::Integer(10)],
            "Dest" => dest,
        });
        doc.get_dictionary_mut(page_id)
            .unwrap()
            .set("Annots", vec![Object::Reference(link)]);
        link
    }

    fn dest_of(doc: &Document, link: ObjectId) -> Object {
        doc.get_dictionary(link).unwrap().get(b"Dest").unwrap().as_array().unwrap()[0].clone()
    }

    #[test]
    fn test_normalize_turns_page_refs_into_indices() {
        let mut doc = document_with_pages(4);
        let target = page_ids(&doc)[2];
        let link = add_link(&mut doc, 0, fit_destination(Object::Reference(target)));

        assert_eq!(normalize_toc_links(&mut doc, 1), 1);
        assert_eq!(dest_of(&doc, link), Object::Integer(2));
    }

    #[test]
    fn test_normalize_ignores_pages_after_toc() {
        let mut doc = document_with_pages(3);
        let target = page_ids(&doc)[0];
        add_link(&mut doc, 2, fit_destination(Object::Reference(target)));
        assert_eq!(normalize_toc_links(&mut doc, 1), 0);
    }

    #[test]
    fn test_repair_rebases_by_start_and_frontmatter() {
        // 1 frontmatter page + content where the nested bundle starts at content page 2.
        let mut doc = document_with_pages(8);
        let link = add_link(&mut doc, 3, fit_destination(Object::Integer(2)));
        let nested = [NestedBundle {
            source_key: "inner.pdf".into(),
            content_start: 2,
            toc_pages: 1,
        }];

        let report = repair_nested_links(&mut doc, &nested, 1).unwrap();
        assert_eq!(report.repaired, 1);
        assert_eq!(dest_of(&doc, link), Object::Reference(page_ids(&doc)[5]));

        // Already-absolute destinations are not moved again.
        let again = repair_nested_links(&mut doc, &nested, 1).unwrap();
        assert_eq!(again.repaired, 0);
        assert_eq!(dest_of(&doc, link), Object::Reference(page_ids(&doc)[5]));
    }

    #[test]
    fn test_repair_rejects_toc_outside_document() {
        let mut doc = document_with_pages(2);
        let nested = [NestedBundle {
            source_key: "inner.pdf".into(),
            content_start: 1,
            toc_pages: 3,
        }];
        let err = repair_nested_links(&mut doc, &nested, 0).unwrap_err();
        assert!(matches!(err, BundleError::LinkRepair { .. }));
    }

    #[test]
    fn test_repair_counts_out_of_range_targets() {
        let mut doc = document_with_pages(3);
        add_link(&mut doc, 1, fit_destination(Object::Integer(9)));
        let nested = [NestedBundle {
            source_key: "inner.pdf".into(),
            content_start: 0,
            toc_pages: 1,
        }];
        let report = repair_nested_links(&mut doc, &nested, 1).unwrap();
        assert_eq!(report, RepairReport { repaired: 0, out_of_range: 1 });
    }
}
