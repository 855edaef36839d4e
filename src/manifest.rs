//! Per-run diagnostics handed back with the finished bundle.

use serde::Serialize;

use crate::links::{LinkReport, NestedBundle, RepairReport};
use crate::merge::{EntryReport, EntryStatus};
use crate::outline::OutlineReport;

/// Page counts of the finished bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageCounts {
    /// Coversheet pages.
    pub coversheet: usize,
    /// TOC pages.
    pub toc: usize,
    /// Coversheet plus TOC.
    pub frontmatter: usize,
    /// Merged content pages.
    pub main: usize,
    /// Every page of the bundle.
    pub total: usize,
}

/// What a bundle run produced and what it had to leave out.
#[derive(Debug, Clone, Serialize)]
pub struct BundleManifest {
    /// Correlation identifier of the run.
    pub session_id: String,
    /// Page counts.
    pub pages: PageCounts,
    /// Outcome of each index row, in index order.
    pub entries: Vec<EntryReport>,
    /// Merged sources that carried their own TOC.
    pub nested_bundles: Vec<NestedBundle>,
    /// TOC hyperlinks placed and missed.
    pub links: LinkReport,
    /// Bookmarks written and dropped.
    pub bookmarks: OutlineReport,
    /// Nested-bundle links re-targeted.
    pub nested_links: RepairReport,
    /// Whether the office-document TOC was produced.
    pub docx_exported: bool,
}

impl BundleManifest {
    /// Content rows that could not be merged.
    pub fn skipped(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, EntryStatus::Missing | EntryStatus::Failed { .. }))
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> BundleManifest {
        BundleManifest {
            session_id: "a1b2c3d4".into(),
            pages: PageCounts {
                coversheet: 0,
                toc: 1,
                frontmatter: 1,
                main: 2,
                total: 3,
            },
            entries: vec![
                EntryReport {
                    source_key: "a.pdf".into(),
                    title: "A".into(),
                    status: EntryStatus::Merged { pages: 2, start: 0 },
                },
                EntryReport {
                    source_key: "b.pdf".into(),
                    title: "B".into(),
                    status: EntryStatus::Missing,
                },
            ],
            nested_bundles: Vec::new(),
            links: LinkReport {
                matched: 1,
                unmatched: Vec::new(),
            },
            bookmarks: OutlineReport::default(),
            nested_links: RepairReport::default(),
            docx_exported: true,
        }
    }

    #[test]
    fn test_skipped_lists_missing_and_failed() {
        let manifest = manifest();
        let skipped: Vec<&str> = manifest.skipped().map(|e| e.source_key.as_str()).collect();
        assert_eq!(skipped, ["b.pdf"]);
    }

    #[test]
    fn test_json_shape() {
        let json: serde_json::Value = serde_json::from_str(&manifest().to_json().unwrap()).unwrap();
        assert_eq!(json["session_id"], "a1b2c3d4");
        assert_eq!(json["pages"]["total"], 3);
        assert_eq!(json["entries"][0]["status"], "merged");
        assert_eq!(json["entries"][0]["start"], 0);
        assert_eq!(json["entries"][1]["status"], "missing");
        assert_eq!(json["docx_exported"], true);
    }
}
