//! The mutable accumulator shared by pipeline stages within one run.
//!
//! Stages run in strict sequence and each writes only the fields named
//! on its `record_*` method. Later stages only read.

use serde::Serialize;

/// Computed totals of a single bundle run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildContext {
    /// Correlation identifier for logs and errors.
    pub session_id: String,
    /// Coversheet page count. Written by [`BuildContext::record_probe`].
    coversheet_pages: usize,
    /// Merged content page count. Written by [`BuildContext::record_merge`].
    main_page_count: usize,
    /// Coversheet plus probed TOC length. Written by [`BuildContext::record_probe`].
    expected_length_of_frontmatter: usize,
    /// Main content plus expected frontmatter. Written by [`BuildContext::record_probe`].
    total_page_count: usize,
    /// Assembled frontmatter length. Written by [`BuildContext::record_frontmatter`].
    length_of_frontmatter: Option<usize>,
}

impl BuildContext {
    /// Create a context with a fresh 8-character session id.
    pub fn new() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        Self::with_session_id(&uuid[..8])
    }

    /// Create a context with a caller-supplied session id.
    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    /// Merge stage: record the concatenated content length.
    pub fn record_merge(&mut self, main_page_count: usize) {
        self.main_page_count = main_page_count;
    }

    /// Size-probe stage: record coversheet and probed TOC lengths.
    pub fn record_probe(&mut self, coversheet_pages: usize, probed_toc_pages: usize) {
        self.coversheet_pages = coversheet_pages;
        self.expected_length_of_frontmatter = coversheet_pages + probed_toc_pages;
        self.total_page_count = self.main_page_count + self.expected_length_of_frontmatter;
    }

    /// Frontmatter stage: record the authoritative frontmatter length.
    pub fn record_frontmatter(&mut self, length_of_frontmatter: usize) {
        self.length_of_frontmatter = Some(length_of_frontmatter);
    }

    /// Pages in the coversheet.
    pub fn coversheet_pages(&self) -> usize {
        self.coversheet_pages
    }

    /// Pages of merged content.
    pub fn main_page_count(&self) -> usize {
        self.main_page_count
    }

    /// Frontmatter length predicted by the size probe.
    pub fn expected_length_of_frontmatter(&self) -> usize {
        self.expected_length_of_frontmatter
    }

    /// Predicted final page count.
    pub fn total_page_count(&self) -> usize {
        self.total_page_count
    }

    /// Authoritative frontmatter length, falling back to the probe's estimate
    /// before assembly has run.
    pub fn length_of_frontmatter(&self) -> usize {
        self.length_of_frontmatter
            .unwrap_or(self.expected_length_of_frontmatter)
    }
}
