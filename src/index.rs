//! The bundle index: an ordered roadmap of documents and section breaks.
//!
//! Iteration order of the index is the page order of the bundle. Content
//! rows are keyed by the identifier of an uploaded document; section rows
//! only introduce a heading.
//!
//! # Examples
//!
//! ```
//! use pdfbundle::config::DateSetting;
//! use pdfbundle::index::Index;
//!
//! let csv = "filename,title,date,section\n\
//!            SECTION,Pleadings,,1\n\
//!            claim.pdf,Claim Form,2024-01-31,0\n";
//! let index = Index::from_csv(csv, DateSetting::UkLong).unwrap();
//! assert_eq!(index.len(), 2);
//! assert_eq!(index.entries()[1].display_date, "31 January 2024");
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::DateSetting;
use crate::error::{BundleError, Result};

/// One row of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Identifier of the source document (ignored for section breaks).
    pub source_key: String,
    /// Title shown in the TOC and the outline.
    pub display_title: String,
    /// Pre-formatted date, or empty.
    #[serde(default)]
    pub display_date: String,
    /// Heading row with no document of its own.
    #[serde(default)]
    pub is_section_break: bool,
}

impl IndexEntry {
    /// A content row.
    pub fn document(
        source_key: impl Into<String>,
        title: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            source_key: source_key.into(),
            display_title: title.into(),
            display_date: date.into(),
            is_section_break: false,
        }
    }

    /// A section heading row.
    pub fn section(title: impl Into<String>) -> Self {
        Self {
            source_key: String::new(),
            display_title: title.into(),
            display_date: String::new(),
            is_section_break: true,
        }
    }
}

/// Ordered, immutable collection of index entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<IndexEntry>", into = "Vec<IndexEntry>")]
pub struct Index {
    entries: Vec<IndexEntry>,
}

impl TryFrom<Vec<IndexEntry>> for Index {
    type Error = BundleError;

    fn try_from(entries: Vec<IndexEntry>) -> Result<Self> {
        Self::new(entries)
    }
}

impl From<Index> for Vec<IndexEntry> {
    fn from(index: Index) -> Self {
        index.entries
    }
}

impl Index {
    /// Build an index, rejecting duplicate content keys.
    pub fn new(entries: Vec<IndexEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (i, entry) in entries.iter().enumerate() {
            if entry.is_section_break {
                continue;
            }
            if entry.source_key.is_empty() {
                return Err(BundleError::invalid_index(i + 1, "document row has no file name"));
            }
            if !seen.insert(entry.source_key.as_str()) {
                return Err(BundleError::invalid_index(
                    i + 1,
                    format!("duplicate document '{}'", entry.source_key),
                ));
            }
        }
        Ok(Self { entries })
    }

    /// Build an index from already-split rows of `filename, title[, date[, section]]`.
    ///
    /// Row numbers in errors are 1-based positions among the data rows.
    pub fn from_rows<I, R>(rows: I, date_setting: DateSetting) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[String]>,
    {
        let mut entries = Vec::new();
        for (i, row) in rows.into_iter().enumerate() {
            let row = row.as_ref();
            let row_number = i + 1;
            let entry = match row {
                [] => continue,
                [only] if only.trim().is_empty() => continue,
                [_] => {
                    return Err(BundleError::invalid_index(
                        row_number,
                        "expected at least 2 columns (filename, title)",
                    ));
                }
                [filename, title] => IndexEntry::document(filename.trim(), title.trim(), ""),
                [filename, title, date] => {
                    IndexEntry::document(filename.trim(), title.trim(), date_setting.format_date(date))
                }
                [filename, title, date, section, ..] => {
                    if is_section_flag(section) {
                        IndexEntry::section(title.trim())
                    } else {
                        IndexEntry::document(
                            filename.trim(),
                            title.trim(),
                            date_setting.format_date(date),
                        )
                    }
                }
            };
            entries.push(entry);
        }
        log::debug!("Loaded index with {} entries", entries.len());
        Self::new(entries)
    }

    /// Parse CSV text. The first row is a header and is skipped.
    pub fn from_csv(csv: &str, date_setting: DateSetting) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(csv.as_bytes());
        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record
                .map_err(|e| BundleError::invalid_index(i + 1, format!("malformed CSV: {e}")))?;
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }
        Self::from_rows(rows, date_setting)
    }

    /// Parse a JSON array of entries.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| BundleError::invalid_index(0, e.to_string()))
    }

    /// Entries in bundle order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Iterate entries in bundle order.
    pub fn iter(&self) -> std::slice::Iter<'_, IndexEntry> {
        self.entries.iter()
    }

    /// Number of rows including section breaks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no rows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of all content rows, in order.
    pub fn content_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| !e.is_section_break)
            .map(|e| e.source_key.as_str())
    }
}

impl<'a> IntoIterator for &'a Index {
    type Item = &'a IndexEntry;
    type IntoIter = std::slice::Iter<'a, IndexEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn is_section_flag(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}
