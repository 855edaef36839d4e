//! TOC hyperlinks.
//!
//! Text is read back from the rendered TOC pages, each content row's tab
//! label is searched for, and a borderless link over the matching line is
//! pointed at the row's document.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use lopdf::{Document, Object, ObjectId, dictionary};
use serde::Serialize;
use tokio::task;

use crate::error::{BundleError, Result};
use crate::frontmatter::AssembledBundle;
use crate::links::repair::fit_destination;
use crate::text::{PageText, extract_page_text};
use crate::toc::TocEntry;
use crate::utils::page_ids;

/// One link to place on a TOC page.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Absolute index of the TOC page the link sits on.
    pub toc_page: usize,
    /// `[x0, y0, x1, y1]` in PDF user space.
    pub rect: [f32; 4],
    /// Absolute index of the page the link jumps to.
    pub dest_page: usize,
}

/// Outcome of hyperlink synthesis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    /// Rows that received a link.
    pub matched: usize,
    /// Tab labels no TOC line started with.
    pub unmatched: Vec<String>,
}

/// Convert a top-left-origin box to a bottom-left-origin rectangle.
pub fn flip_rect(x0: f32, top: f32, x1: f32, bottom: f32, page_height: f32) -> [f32; 4] {
    [x0, page_height - bottom, x1, page_height - top]
}

/// Find the TOC line of every content row.
///
/// `pages` pairs absolute page indices with their extracted text, in page
/// order. Only lines whose left edge lies in `tab_column` are candidates; the
/// first of them starting with a row's tab label wins.
pub fn match_entries(
    entries: &[TocEntry],
    pages: &[(usize, PageText)],
    tab_column: &Range<f32>,
    frontmatter_len: usize,
) -> (Vec<Annotation>, Vec<String>) {
    let mut annotations = Vec::new();
    let mut unmatched = Vec::new();

    for entry in entries {
        let TocEntry::Content { tab, dest_page, .. } = entry else {
            continue;
        };
        let found = pages.iter().find_map(|(page, text)| {
            text.lines
                .iter()
                .find(|line| {
                    tab_column.contains(&line.x0) && line.text.trim_start().starts_with(tab.as_str())
                })
                .map(|line| Annotation {
                    toc_page: *page,
                    rect: flip_rect(line.x0, line.top, line.x1, line.bottom, text.height),
                    dest_page: dest_page + frontmatter_len,
                })
        });
        match found {
            Some(annotation) => annotations.push(annotation),
            None => {
                log::warn!("No TOC line found for tab {tab}; it will not be hyperlinked");
                unmatched.push(tab.clone());
            }
        }
    }
    (annotations, unmatched)
}

/// Add links from the TOC rows of `bundle` to their documents.
///
/// TOC pages are extracted concurrently, `workers` at a time. A page that
/// fails to extract only costs the links on it. `tab_column` is the
/// horizontal extent of the rendered Tab column.
///
/// # Errors
///
/// Returns [`BundleError::Hyperlinking`] if annotations cannot be written.
pub async fn synthesize_links(
    bundle: &mut AssembledBundle,
    entries: &[TocEntry],
    tab_column: Range<f32>,
    workers: usize,
) -> Result<LinkReport> {
    let frontmatter_len = bundle.length_of_frontmatter();
    let toc_range = bundle.coversheet_len..frontmatter_len;

    let document = Arc::new(std::mem::replace(&mut bundle.document, Document::new()));
    let pages = page_ids(&document);
    let jobs: Vec<(usize, ObjectId)> = toc_range.filter_map(|i| pages.get(i).map(|&id| (i, id))).collect();

    let results: Vec<Option<(usize, PageText)>> = stream::iter(jobs)
        .map(|(index, page_id)| {
            let document = Arc::clone(&document);
            async move {
                let extracted = task::spawn_blocking(move || extract_page_text(&document, page_id))
                    .await
                    .map_err(BundleError::from)
                    .and_then(|text| text);
                match extracted {
                    Ok(text) => Some((index, text)),
                    Err(e) => {
                        log::warn!("Text extraction failed on TOC page {}: {e}", index + 1);
                        None
                    }
                }
            }
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    bundle.document = Arc::try_unwrap(document)
        .map_err(|_| BundleError::hyperlinking("TOC text extraction still holds the document"))?;

    let mut texts: Vec<(usize, PageText)> = results.into_iter().flatten().collect();
    texts.sort_by_key(|(index, _)| *index);

    let (annotations, unmatched) = match_entries(entries, &texts, &tab_column, frontmatter_len);
    let matched = write_annotations(&mut bundle.document, &annotations)?;
    log::info!("Hyperlinked {matched} TOC row(s), {} unmatched", unmatched.len());
    Ok(LinkReport { matched, unmatched })
}

/// Write link annotations, returning how many were placed.
fn write_annotations(doc: &mut Document, annotations: &[Annotation]) -> Result<usize> {
    let pages = page_ids(doc);
    let mut by_page: BTreeMap<usize, Vec<ObjectId>> = BTreeMap::new();

    for annotation in annotations {
        let Some(&target) = pages.get(annotation.dest_page) else {
            log::warn!(
                "Link target page {} is past the end of the bundle",
                annotation.dest_page + 1
            );
            continue;
        };
        let rect: Vec<Object> = annotation.rect.iter().map(|&v| Object::Real(v)).collect();
        let id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => rect,
            "Border" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)],
            "Dest" => fit_destination(Object::Reference(target)),
        });
        by_page.entry(annotation.toc_page).or_default().push(id);
    }

    let mut placed = 0;
    for (page, ids) in by_page {
        let page_id = pages
            .get(page)
            .copied()
            .ok_or_else(|| BundleError::hyperlinking(format!("TOC page {} does not exist", page + 1)))?;
        placed += ids.len();
        append_annots(doc, page_id, ids)?;
    }
    Ok(placed)
}

/// Extend a page's `/Annots`, which may be missing, direct or indirect.
fn append_annots(doc: &mut Document, page_id: ObjectId, ids: Vec<ObjectId>) -> Result<()> {
    let new_refs = ids.into_iter().map(Object::Reference);
    let existing = doc
        .get_dictionary(page_id)?
        .get(b"Annots")
        .ok()
        .cloned();

    match existing {
        Some(Object::Reference(array_id)) => {
            doc.get_object_mut(array_id)?.as_array_mut()?.extend(new_refs);
        }
        Some(Object::Array(mut annots)) => {
            annots.extend(new_refs);
            doc.get_dictionary_mut(page_id)?.set("Annots", annots);
        }
        _ => {
            doc.get_dictionary_mut(page_id)?
                .set("Annots", new_refs.collect::<Vec<Object>>());
        }
    }
    Ok(())
}
