//! User-facing output for the bundle binary.
//!
//! Status messages go through [`OutputFormatter`]; the summary helpers
//! here turn a [`BundleManifest`] into a short report.

pub mod formatter;

pub use formatter::{MessageLevel, OutputFormatter};

use crate::manifest::BundleManifest;
use crate::merge::EntryStatus;

/// Display what the run left out.
///
/// Skipped documents and unmatched TOC rows are printed as warnings so they
/// survive quiet mode.
pub fn display_skipped(formatter: &OutputFormatter, manifest: &BundleManifest) {
    for entry in manifest.skipped() {
        let reason = match &entry.status {
            EntryStatus::Failed { reason } => reason.as_str(),
            _ => "not supplied",
        };
        formatter.warning(&format!("Skipped {} ({}): {reason}", entry.title, entry.source_key));
    }
    if !manifest.links.unmatched.is_empty() {
        formatter.warning(&format!(
            "No TOC link for tab(s): {}",
            manifest.links.unmatched.join(", ")
        ));
    }
    if manifest.bookmarks.orphaned > 0 {
        formatter.warning(&format!(
            "{} sub-bookmark(s) had no parent and were dropped",
            manifest.bookmarks.orphaned
        ));
    }
}

/// Display page and link totals. Details are verbose-only.
pub fn display_manifest_summary(formatter: &OutputFormatter, manifest: &BundleManifest) {
    let pages = &manifest.pages;
    formatter.info(&format!(
        "Bundle of {} page(s): {} frontmatter, {} content",
        pages.total, pages.frontmatter, pages.main
    ));

    if formatter.is_verbose() {
        formatter.section("Statistics");
        formatter.detail("Session", &manifest.session_id);
        formatter.detail("Coversheet pages", &pages.coversheet.to_string());
        formatter.detail("TOC pages", &pages.toc.to_string());
        formatter.detail("TOC links", &manifest.links.matched.to_string());
        formatter.detail("Bookmarks", &manifest.bookmarks.bookmarks.to_string());
        formatter.detail("Sub-bookmarks", &manifest.bookmarks.sub_bookmarks.to_string());
        formatter.detail("Nested bundles", &manifest.nested_bundles.len().to_string());
        formatter.detail("Nested links repaired", &manifest.nested_links.repaired.to_string());
        for (i, nested) in manifest.nested_bundles.iter().enumerate() {
            formatter.list_item(
                i + 1,
                &format!(
                    "{} ({} TOC page(s), content page {})",
                    nested.source_key,
                    nested.toc_pages,
                    nested.content_start + 1
                ),
            );
        }
        formatter.detail(
            "DOCX",
            if manifest.docx_exported { "Exported" } else { "Not exported" },
        );
    }
}
