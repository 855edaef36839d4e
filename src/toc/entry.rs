//! Rows of the table of contents.

use serde::Serialize;

/// Sequential label of the `n`th merged document, e.g. `001.`.
pub fn tab_label(n: usize) -> String {
    format!("{n:03}.")
}

/// One TOC row.
///
/// `dest_page` is 0-based and relative to the first page of main content.
/// The frontmatter offset is added by whoever consumes the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TocEntry {
    /// A merged document.
    Content {
        /// Tab label, e.g. `003.`.
        tab: String,
        /// Display title.
        title: String,
        /// Formatted date, possibly empty.
        date: String,
        /// Content-relative page the document starts on.
        dest_page: usize,
    },
    /// A heading grouping the documents that follow it.
    Section {
        /// 1-based section counter.
        number: usize,
        /// Heading text.
        title: String,
    },
}

impl TocEntry {
    /// The row's title.
    pub fn title(&self) -> &str {
        match self {
            Self::Content { title, .. } | Self::Section { title, .. } => title,
        }
    }

    /// The content-relative destination, for content rows.
    pub fn dest_page(&self) -> Option<usize> {
        match self {
            Self::Content { dest_page, .. } => Some(*dest_page),
            Self::Section { .. } => None,
        }
    }

    /// The tab label, for content rows.
    pub fn tab(&self) -> Option<&str> {
        match self {
            Self::Content { tab, .. } => Some(tab),
            Self::Section { .. } => None,
        }
    }

    /// Whether this is a section heading.
    pub fn is_section(&self) -> bool {
        matches!(self, Self::Section { .. })
    }
}

/// Destination of the first content row at or after `position`.
///
/// Section headings have no page of their own and borrow this one.
pub fn next_content_dest(entries: &[TocEntry], position: usize) -> Option<usize> {
    entries
        .get(position..)?
        .iter()
        .find_map(TocEntry::dest_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_label() {
        assert_eq!(tab_label(1), "001.");
        assert_eq!(tab_label(42), "042.");
        assert_eq!(tab_label(1203), "1203.");
    }

    #[test]
    fn test_next_content_dest_skips_sections() {
        let entries = vec![
            TocEntry::Section { number: 1, title: "Pleadings".into() },
            TocEntry::Section { number: 2, title: "Orders".into() },
            TocEntry::Content {
                tab: tab_label(1),
                title: "Order".into(),
                date: String::new(),
                dest_page: 7,
            },
        ];
        assert_eq!(next_content_dest(&entries, 0), Some(7));
        assert_eq!(next_content_dest(&entries, 3), None);
    }
}
