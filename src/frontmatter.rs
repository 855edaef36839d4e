//! Joining coversheet, TOC and paginated content into the bundle.
//!
//! The assembled bundle moves through two states. [`AssembledBundle`] has
//! fixed page positions and is where links and bookmarks are added.
//! [`AssembledBundle::finalize`] consumes it, repairs nested-bundle links
//! and yields a [`FinalBundle`], which has no way to repair them again.

use lopdf::Document;

use crate::error::{BundleError, Result, Stage};
use crate::links::repair::{NestedBundle, RepairReport, repair_nested_links};
use crate::merge::pages::append_document;
use crate::utils::new_document;

/// Coversheet + TOC + content with permanent page positions.
#[derive(Debug)]
pub struct AssembledBundle {
    /// The combined document.
    pub document: Document,
    /// Coversheet pages at the front (0 without a coversheet).
    pub coversheet_len: usize,
    /// TOC pages following the coversheet.
    pub toc_len: usize,
    /// Paginated content pages.
    pub content_len: usize,
}

impl AssembledBundle {
    /// Coversheet plus TOC length; the offset of content page 0.
    pub fn length_of_frontmatter(&self) -> usize {
        self.coversheet_len + self.toc_len
    }

    /// Total page count.
    pub fn page_count(&self) -> usize {
        self.length_of_frontmatter() + self.content_len
    }

    /// Rebase the TOC links of nested bundles and close the bundle.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::LinkRepair`] if a nested bundle's TOC lies
    /// outside the document.
    pub fn finalize(mut self, nested: &[NestedBundle]) -> Result<(FinalBundle, RepairReport)> {
        let frontmatter = self.length_of_frontmatter();
        let report = repair_nested_links(&mut self.document, nested, frontmatter)
            .map_err(|e| e.in_stage(Stage::LinkRepair))?;
        if report.repaired > 0 {
            log::debug!("Repaired {} nested bundle link(s)", report.repaired);
        }
        Ok((
            FinalBundle {
                document: self.document,
                length_of_frontmatter: frontmatter,
                page_count: frontmatter + self.content_len,
            },
            report,
        ))
    }
}

/// A bundle whose page targets are final.
#[derive(Debug)]
pub struct FinalBundle {
    /// The finished document.
    pub document: Document,
    /// Coversheet plus TOC length.
    pub length_of_frontmatter: usize,
    /// Total page count.
    pub page_count: usize,
}

/// Concatenate coversheet, TOC and content.
///
/// `expected_frontmatter` is the size probe's prediction. When given, the
/// assembled frontmatter must match it; pass `None` when frontmatter pages
/// are numbered independently of content.
///
/// # Errors
///
/// Returns [`BundleError::FrontMatterMismatch`] when the frontmatter length
/// disagrees with the probe, or a [`BundleError::FrontMatter`] if appending
/// pages fails.
pub fn assemble(
    coversheet: Option<Document>,
    toc: Document,
    content: Document,
    expected_frontmatter: Option<usize>,
) -> Result<AssembledBundle> {
    let (mut document, _) = new_document();

    let coversheet_len = match coversheet {
        Some(cover) => append(&mut document, cover)?,
        None => {
            log::info!("No coversheet specified. TOC is the only frontmatter.");
            0
        }
    };
    let toc_len = append(&mut document, toc)?;

    let actual = coversheet_len + toc_len;
    if let Some(expected) = expected_frontmatter
        && expected != actual
    {
        return Err(BundleError::FrontMatterMismatch { expected, actual });
    }

    let content_len = append(&mut document, content)?;
    log::debug!("Frontmatter of {actual} page(s) joined with {content_len} content page(s)");

    Ok(AssembledBundle {
        document,
        coversheet_len,
        toc_len,
        content_len,
    })
}

fn append(target: &mut Document, source: Document) -> Result<usize> {
    append_document(target, source)
        .map(|pages| pages.len())
        .map_err(|e| BundleError::front_matter(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{A4, page_ids};
    use crate::merge::pages::push_page;
    use lopdf::dictionary;

    fn blank(pages: usize) -> Document {
        let (mut doc, _) = new_document();
        let resources = doc.add_object(dictionary! {});
        for _ in 0..pages {
            push_page(&mut doc, A4, b"q Q".to_vec(), resources).unwrap();
        }
        doc
    }

    #[test]
    fn test_assemble_orders_and_counts() {
        let bundle = assemble(Some(blank(1)), blank(2), blank(4), Some(3)).unwrap();
        assert_eq!(bundle.coversheet_len, 1);
        assert_eq!(bundle.toc_len, 2);
        assert_eq!(bundle.length_of_frontmatter(), 3);
        assert_eq!(page_ids(&bundle.document).len(), 7);
        assert_eq!(bundle.page_count(), 7);
    }

    #[test]
    fn test_probe_mismatch_is_fatal() {
        let err = assemble(None, blank(2), blank(1), Some(1)).unwrap_err();
        assert!(matches!(
            err,
            BundleError::FrontMatterMismatch {
                expected: 1,
                actual: 2
            }
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_mismatch_tolerated_without_expectation() {
        let bundle = assemble(None, blank(2), blank(1), None).unwrap();
        assert_eq!(bundle.length_of_frontmatter(), 2);
    }

    #[test]
    fn test_finalize_without_nested_bundles() {
        let bundle = assemble(None, blank(1), blank(2), Some(1)).unwrap();
        let (final_bundle, report) = bundle.finalize(&[]).unwrap();
        assert_eq!(report, RepairReport::default());
        assert_eq!(final_bundle.page_count, 3);
        assert_eq!(final_bundle.length_of_frontmatter, 1);
    }
}
