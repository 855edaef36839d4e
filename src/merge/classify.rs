//! Detection of sources that are themselves bundles.

use lopdf::Document;

use crate::text::extract_page_text;
use crate::utils::page_ids;

/// Header rows a rendered TOC page carries, with and without the date column.
pub const TOC_HEADER_ROWS: [&str; 2] = ["Tab Title Date Page", "Tab Title Page"];

/// Decides how many leading pages of a source are its own table of contents.
pub trait TocClassifier: Send + Sync {
    /// Number of consecutive TOC pages at the start of `doc` (0 if it is not a bundle).
    fn toc_page_count(&self, doc: &Document) -> usize;
}

/// Recognises TOC pages by the header row this crate renders on every TOC page.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderRowClassifier {
    /// Only the first `max_pages` pages are examined.
    pub max_pages: Option<usize>,
}

impl HeaderRowClassifier {
    /// Classifier that examines every leading page.
    pub fn new() -> Self {
        Self::default()
    }

    fn is_toc_page(doc: &Document, page_id: lopdf::ObjectId) -> bool {
        match extract_page_text(doc, page_id) {
            Ok(text) => text.lines.iter().any(|line| {
                let normalized = line.text.split_whitespace().collect::<Vec<_>>().join(" ");
                TOC_HEADER_ROWS.contains(&normalized.as_str())
            }),
            Err(e) => {
                log::debug!("Text extraction failed while classifying page: {e}");
                false
            }
        }
    }
}

impl TocClassifier for HeaderRowClassifier {
    fn toc_page_count(&self, doc: &Document) -> usize {
        let limit = self.max_pages.unwrap_or(usize::MAX);
        page_ids(doc)
            .into_iter()
            .take(limit)
            .take_while(|&id| Self::is_toc_page(doc, id))
            .count()
    }
}
