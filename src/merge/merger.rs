//! Page-accounting merge of indexed source documents.
//!
//! Sources are opened and inspected concurrently (page count, nested TOC
//! detection, outline extraction), then appended one by one in index order.
//! Only the append mutates the merged document, and it never runs in parallel:
//! index order is the page-numbering contract.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use lopdf::{Document, Object};
use serde::Serialize;
use tokio::task;

use crate::error::{BundleError, Result, Stage};
use crate::index::Index;
use crate::io::{LoadStatistics, LoadedPdf, PdfReader, SourceSet, format_file_size};
use crate::links::repair::{NestedBundle, normalize_toc_links};
use crate::merge::bookmarks::{BookmarkExtraction, SubBookmark, extract_bookmarks};
use crate::merge::classify::{HeaderRowClassifier, TocClassifier};
use crate::merge::pages::append_document;
use crate::toc::entry::{TocEntry, tab_label};
use crate::utils::{decode_text_string, deref_dict, new_document};

/// Literal date that asks for the source's own creation date.
const UNKNOWN_DATE: &str = "Unknown";

/// The working document pages are appended to.
#[derive(Debug)]
pub struct MergedDocument {
    /// The concatenated pages.
    pub document: Document,
    /// Sum of the page counts of every merged source.
    pub page_count: usize,
}

/// What happened to one index row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    /// Pages were appended.
    Merged {
        /// Pages contributed.
        pages: usize,
        /// Content-relative first page.
        start: usize,
    },
    /// Section heading, no pages.
    Section,
    /// No source with this key was supplied.
    Missing,
    /// The source could not be opened.
    Failed {
        /// Why loading failed.
        reason: String,
    },
}

/// Per-row merge outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    /// Index key (empty for section rows).
    pub source_key: String,
    /// Display title.
    pub title: String,
    /// Outcome.
    #[serde(flatten)]
    pub status: EntryStatus,
}

/// Sub-bookmarks of one merged source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkGroup {
    /// Position of the owning content row in [`MergeOutput::toc_entries`].
    pub entry: usize,
    /// Content-relative page the source starts on.
    pub content_start: usize,
    /// The source's flattened outline, relative to its own first page.
    pub bookmarks: Vec<SubBookmark>,
}

/// Statistics about a merge operation.
#[derive(Debug, Clone, Default)]
pub struct MergeStatistics {
    /// Number of sources merged.
    pub files_merged: usize,
    /// Number of content rows skipped (missing or failed).
    pub files_skipped: usize,
    /// Total pages in the merged document.
    pub total_pages: usize,
    /// Time spent appending pages.
    pub merge_time: Duration,
    /// Parse figures of the parallel inspection.
    pub load: LoadStatistics,
}

/// Everything the later stages need from the merge.
#[derive(Debug)]
pub struct MergeOutput {
    /// The concatenated content.
    pub merged: MergedDocument,
    /// One row per section and per merged document, in index order.
    pub toc_entries: Vec<TocEntry>,
    /// Outlines of merged sources that had one.
    pub bookmark_groups: Vec<BookmarkGroup>,
    /// TOC page count per merged source key; non-zero means nested bundle.
    pub toc_page_counts: HashMap<String, usize>,
    /// Merged sources that carry their own TOC.
    pub nested_bundles: Vec<NestedBundle>,
    /// Outcome of every index row.
    pub entries: Vec<EntryReport>,
    /// Timing and size figures.
    pub statistics: MergeStatistics,
}

impl MergeOutput {
    /// Whether the source merged under `key` is itself a bundle.
    pub fn is_bundle(&self, key: &str) -> bool {
        self.toc_page_counts.get(key).is_some_and(|&pages| pages > 0)
    }
}

/// Result of opening and examining one source.
#[derive(Debug)]
struct Inspection {
    loaded: LoadedPdf,
    toc_pages: usize,
    outline: BookmarkExtraction,
    creation_date: Option<String>,
}

/// Merges the documents an [`Index`] names.
#[derive(Clone)]
pub struct Merger {
    reader: PdfReader,
    classifier: Arc<dyn TocClassifier>,
    workers: usize,
}

impl std::fmt::Debug for Merger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Merger")
            .field("reader", &self.reader)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl Merger {
    /// Create a merger inspecting at most `workers` sources at a time.
    pub fn new(workers: usize) -> Self {
        Self {
            reader: PdfReader::new(),
            classifier: Arc::new(HeaderRowClassifier::new()),
            workers: workers.max(1),
        }
    }

    /// Replace the nested-bundle detector.
    pub fn with_classifier(mut self, classifier: Arc<dyn TocClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Merge every content row of `index` whose source is in `sources`.
    ///
    /// Missing or unreadable sources are logged and skipped; tab numbers are
    /// only consumed by documents that were actually merged.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::EmptyBundle`] if no pages were merged, or a
    /// [`BundleError::Merge`] if appending pages fails.
    pub async fn merge(&self, index: &Index, sources: &SourceSet) -> Result<MergeOutput> {
        let start = Instant::now();
        let mut inspections = self.inspect_all(index, sources).await;
        let mut load = LoadStatistics {
            total_time: start.elapsed(),
            ..Default::default()
        };
        for inspection in inspections.values() {
            match inspection {
                Ok(inspection) => load.record_loaded(&inspection.loaded),
                Err(_) => load.record_failure(),
            }
        }
        log::debug!(
            "Opened {} source(s) ({}, {} pages) in {:.2?}, {} unreadable",
            load.success_count,
            format_file_size(load.total_size),
            load.total_pages,
            load.total_time,
            load.failure_count
        );

        let merge_start = Instant::now();
        let (mut document, _) = new_document();
        let mut statistics = MergeStatistics {
            load,
            ..Default::default()
        };
        let mut toc_entries = Vec::new();
        let mut bookmark_groups = Vec::new();
        let mut toc_page_counts = HashMap::new();
        let mut nested_bundles = Vec::new();
        let mut entries = Vec::with_capacity(index.len());
        let mut running_total = 0usize;
        let mut tab_count = 0usize;
        let mut section_count = 0usize;

        for entry in index {
            if entry.is_section_break {
                section_count += 1;
                toc_entries.push(TocEntry::Section {
                    number: section_count,
                    title: entry.display_title.clone(),
                });
                entries.push(EntryReport {
                    source_key: entry.source_key.clone(),
                    title: entry.display_title.clone(),
                    status: EntryStatus::Section,
                });
                continue;
            }

            let status = match inspections.remove(&entry.source_key) {
                None => {
                    log::warn!("File {} not found. Skipping.", entry.source_key);
                    statistics.files_skipped += 1;
                    EntryStatus::Missing
                }
                Some(Err(e)) => {
                    log::warn!("File {} failed to process: {e}. Skipping.", entry.source_key);
                    statistics.files_skipped += 1;
                    EntryStatus::Failed {
                        reason: e.to_string(),
                    }
                }
                Some(Ok(inspection)) => {
                    tab_count += 1;
                    let date = if entry.display_date == UNKNOWN_DATE {
                        inspection
                            .creation_date
                            .clone()
                            .unwrap_or_else(|| UNKNOWN_DATE.to_string())
                    } else {
                        entry.display_date.clone()
                    };
                    toc_entries.push(TocEntry::Content {
                        tab: tab_label(tab_count),
                        title: entry.display_title.clone(),
                        date,
                        dest_page: running_total,
                    });

                    if !inspection.outline.bookmarks.is_empty() {
                        bookmark_groups.push(BookmarkGroup {
                            entry: toc_entries.len() - 1,
                            content_start: running_total,
                            bookmarks: inspection.outline.bookmarks,
                        });
                    }
                    if inspection.toc_pages > 0 {
                        nested_bundles.push(NestedBundle {
                            source_key: entry.source_key.clone(),
                            content_start: running_total,
                            toc_pages: inspection.toc_pages,
                        });
                    }
                    toc_page_counts.insert(entry.source_key.clone(), inspection.toc_pages);

                    let pages = inspection.loaded.page_count;
                    append_document(&mut document, inspection.loaded.document)
                        .map_err(|e| e.in_stage(Stage::Merge))?;

                    let status = EntryStatus::Merged {
                        pages,
                        start: running_total,
                    };
                    running_total += pages;
                    statistics.files_merged += 1;
                    status
                }
            };

            entries.push(EntryReport {
                source_key: entry.source_key.clone(),
                title: entry.display_title.clone(),
                status,
            });
        }

        if running_total == 0 {
            return Err(BundleError::EmptyBundle);
        }

        let actual = document.get_pages().len();
        if actual != running_total {
            return Err(BundleError::merge(format!(
                "Merged document has {actual} pages, expected {running_total}"
            )));
        }

        statistics.total_pages = running_total;
        statistics.merge_time = merge_start.elapsed();
        log::info!(
            "Merged {} documents ({} pages) in {:.2?}, skipped {}",
            statistics.files_merged,
            running_total,
            statistics.merge_time,
            statistics.files_skipped
        );

        Ok(MergeOutput {
            merged: MergedDocument {
                document,
                page_count: running_total,
            },
            toc_entries,
            bookmark_groups,
            toc_page_counts,
            nested_bundles,
            entries,
            statistics,
        })
    }

    /// Open and examine every supplied content source, `workers` at a time.
    async fn inspect_all(
        &self,
        index: &Index,
        sources: &SourceSet,
    ) -> HashMap<String, Result<Inspection>> {
        let jobs: Vec<(String, Arc<[u8]>)> = index
            .content_keys()
            .filter_map(|key| sources.get(key).map(|bytes| (key.to_string(), bytes)))
            .collect();

        stream::iter(jobs)
            .map(|(key, bytes)| {
                let reader = self.reader.clone();
                let classifier = Arc::clone(&self.classifier);
                async move {
                    let job_key = key.clone();
                    let result = task::spawn_blocking(move || {
                        inspect(&reader, classifier.as_ref(), &job_key, &bytes)
                    })
                    .await
                    .map_err(BundleError::from)
                    .and_then(|inspection| inspection);
                    (key, result)
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await
    }
}

fn inspect(
    reader: &PdfReader,
    classifier: &dyn TocClassifier,
    key: &str,
    bytes: &[u8],
) -> Result<Inspection> {
    let mut loaded = reader.parse(key, bytes)?;

    let toc_pages = classifier.toc_page_count(&loaded.document);
    if toc_pages > 0 {
        let normalized = normalize_toc_links(&mut loaded.document, toc_pages);
        log::debug!("{key} is a bundle with {toc_pages} TOC page(s), {normalized} internal link(s)");
    }

    let outline = extract_bookmarks(&loaded.document);
    if outline.dropped > 0 {
        log::warn!("{key}: dropped {} bookmark(s) without a page", outline.dropped);
    }

    Ok(Inspection {
        creation_date: creation_date(&loaded.document),
        loaded,
        toc_pages,
        outline,
    })
}

/// `/Info /CreationDate` formatted as `DD.MM.YYYY`.
fn creation_date(doc: &Document) -> Option<String> {
    let info = deref_dict(doc, doc.trailer.get(b"Info").ok()?)?;
    let Object::String(raw, _) = info.get(b"CreationDate").ok()? else {
        return None;
    };
    let raw = decode_text_string(raw);
    let digits = raw.strip_prefix("D:").unwrap_or(&raw).get(..8)?;
    let date = NaiveDate::parse_from_str(digits, "%Y%m%d").ok()?;
    Some(date.format("%d.%m.%Y").to_string())
}
