//! Merging indexed sources into one working document.

pub mod bookmarks;
pub mod classify;
pub mod merger;
pub mod pages;

pub use bookmarks::{BookmarkExtraction, SubBookmark, extract_bookmarks};
pub use classify::{HeaderRowClassifier, TocClassifier};
pub use merger::{
    BookmarkGroup, EntryReport, EntryStatus, MergeOutput, MergeStatistics, MergedDocument, Merger,
};
pub use pages::{append_document, import_pages, push_page};
