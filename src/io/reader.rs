//! PDF reading and loading operations.
//!
//! Sources arrive as named byte streams ([`SourceSet`]). Parsing is
//! synchronous; async callers run it on tokio's blocking pool.
//!
//! # Examples
//!
//! ```no_run
//! use pdfbundle::io::PdfReader;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("a.pdf")?;
//! let loaded = PdfReader::new().parse("a.pdf", &bytes)?;
//! println!("{} pages", loaded.page_count);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lopdf::Document;

use crate::error::{BundleError, Result};

/// Named input byte streams, keyed by the identifier the index uses.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    sources: HashMap<String, Arc<[u8]>>,
}

impl SourceSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a source.
    pub fn insert(&mut self, key: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.sources.insert(key.into(), bytes.into());
    }

    /// Bytes of a source, if present.
    pub fn get(&self, key: &str) -> Option<Arc<[u8]>> {
        self.sources.get(key).cloned()
    }

    /// Whether a source is present.
    pub fn contains(&self, key: &str) -> bool {
        self.sources.contains_key(key)
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Read files from disk, keying each by its file name.
    ///
    /// Unreadable files are skipped with a warning; the index decides later
    /// whether the gap matters.
    pub async fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut set = Self::new();
        for path in paths {
            let path = path.as_ref();
            let Some(key) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                log::warn!("Skipping input without a file name: {}", path.display());
                continue;
            };
            match tokio::fs::read(path).await {
                Ok(bytes) => set.insert(key, bytes),
                Err(e) => log::warn!("Skipping unreadable input {}: {e}", path.display()),
            }
        }
        set
    }
}

/// A loaded PDF document with metadata.
#[derive(Debug)]
pub struct LoadedPdf {
    /// Key the document was loaded under.
    pub key: String,

    /// The PDF document.
    pub document: Document,

    /// Number of pages in the document.
    pub page_count: usize,

    /// Time taken to parse the document.
    pub load_time: Duration,

    /// Size of the source in bytes.
    pub file_size: u64,
}

/// Result of a load operation (success or failure).
pub type LoadResult = Result<LoadedPdf>;

/// Statistics for a batch load operation.
#[derive(Debug, Clone, Default)]
pub struct LoadStatistics {
    /// Number of PDFs successfully loaded.
    pub success_count: usize,

    /// Number of PDFs that failed to load.
    pub failure_count: usize,

    /// Wall-clock time for the batch.
    pub total_time: Duration,

    /// Sum of per-document parse times.
    pub parse_time: Duration,

    /// Total size of successfully loaded sources.
    pub total_size: u64,

    /// Total number of pages loaded.
    pub total_pages: usize,
}

impl LoadStatistics {
    /// Count a source that parsed.
    pub fn record_loaded(&mut self, loaded: &LoadedPdf) {
        self.success_count += 1;
        self.total_size += loaded.file_size;
        self.total_pages += loaded.page_count;
        self.parse_time += loaded.load_time;
    }

    /// Count a source that could not be opened.
    pub fn record_failure(&mut self) {
        self.failure_count += 1;
    }
}

/// Parses source bytes into documents.
#[derive(Debug, Clone, Default)]
pub struct PdfReader;

impl PdfReader {
    /// Create a new PDF reader.
    pub fn new() -> Self {
        Self
    }

    /// Parse bytes on the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::FailedToLoadPdf`] if the bytes are not a PDF,
    /// the PDF is encrypted, or it has no pages.
    pub fn parse(&self, key: &str, bytes: &[u8]) -> LoadResult {
        let start = Instant::now();
        let document = Document::load_mem(bytes).map_err(|e| {
            let msg = e.to_string();
            if msg.contains("encrypt") || msg.contains("password") {
                BundleError::failed_to_load_pdf(key, "PDF is encrypted")
            } else {
                BundleError::failed_to_load_pdf(key, msg)
            }
        })?;

        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(BundleError::failed_to_load_pdf(key, "PDF has no pages"));
        }

        Ok(LoadedPdf {
            key: key.to_string(),
            document,
            page_count,
            load_time: start.elapsed(),
            file_size: bytes.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::new_document;
    use lopdf::{Object, dictionary};

    fn pdf_bytes(pages: usize) -> Vec<u8> {
        let (mut doc, pages_id) = new_document();
        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                Object::Reference(doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(612),
                        Object::Integer(792),
                    ],
                }))
            })
            .collect();
        let tree = doc.get_dictionary_mut(pages_id).unwrap();
        tree.set("Count", pages as i64);
        tree.set("Kids", kids);
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_parse_counts_pages() {
        let loaded = PdfReader::new().parse("three.pdf", &pdf_bytes(3)).unwrap();
        assert_eq!(loaded.key, "three.pdf");
        assert_eq!(loaded.page_count, 3);
        assert!(loaded.file_size > 0);
    }

    #[test]
    fn test_source_set_lookup() {
        let mut sources = SourceSet::new();
        sources.insert("a.pdf", pdf_bytes(1));
        assert!(sources.contains("a.pdf"));
        assert!(sources.get("absent.pdf").is_none());
        assert_eq!(sources.len(), 1);
    }

    #[test]
    fn test_parse_garbage_is_recoverable() {
        let err = PdfReader::new().parse("junk.pdf", b"not a pdf").unwrap_err();
        assert!(matches!(err, BundleError::FailedToLoadPdf { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_empty_documents_rejected() {
        let err = PdfReader::new().parse("empty.pdf", &pdf_bytes(0)).unwrap_err();
        assert!(err.to_string().contains("no pages"));
    }

    #[test]
    fn test_statistics() {
        let mut stats = LoadStatistics::default();
        for result in [
            PdfReader::new().parse("a.pdf", &pdf_bytes(2)),
            PdfReader::new().parse("b.pdf", b"%PDF-garbage"),
        ] {
            match result {
                Ok(loaded) => stats.record_loaded(&loaded),
                Err(_) => stats.record_failure(),
            }
        }
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.failure_count, 1);
        assert_eq!(stats.total_pages, 2);
        assert!(stats.total_size > 0);
    }
}
