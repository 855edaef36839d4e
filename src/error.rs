//! Error types for pdfbundle.
//!
//! Every pipeline stage reports failures through its own variant so the
//! caller can tell which stage broke without inspecting messages.
//!
//! # Error Categories
//!
//! - **Input Errors**: unreadable index rows, invalid configuration
//! - **Structural Errors**: footer or frontmatter page counts that disagree
//! - **Stage Errors**: a stage could not complete (TOC render, pagination, ...)
//! - **I/O and PDF Errors**: wrapped from `std::io` and `lopdf`

use std::io;
use std::path::PathBuf;

use serde::Serialize;

/// Result type alias for pdfbundle operations.
pub type Result<T> = std::result::Result<T, BundleError>;

/// The pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Reading the index or the configuration.
    Input,
    /// Loading sources and concatenating pages.
    Merge,
    /// Laying out the table of contents.
    TocRender,
    /// Building or overlaying footer stamps.
    Pagination,
    /// Joining coversheet, TOC and content.
    FrontMatter,
    /// Placing TOC link annotations.
    Hyperlinking,
    /// Writing the outline tree.
    Bookmarking,
    /// Writing the page label ranges.
    PageLabels,
    /// Re-targeting links inside nested bundles.
    LinkRepair,
    /// The office-document TOC export.
    DocxExport,
    /// Serialising the finished bundle.
    Output,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Merge => "merge",
            Self::TocRender => "toc-render",
            Self::Pagination => "pagination",
            Self::FrontMatter => "frontmatter",
            Self::Hyperlinking => "hyperlinking",
            Self::Bookmarking => "bookmarking",
            Self::PageLabels => "page-labels",
            Self::LinkRepair => "link-repair",
            Self::DocxExport => "docx-export",
            Self::Output => "output",
        };
        f.write_str(name)
    }
}

/// Main error type for pdfbundle operations.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// A source document could not be loaded.
    #[error("Failed to load PDF '{key}'\n  Reason: {reason}")]
    FailedToLoadPdf {
        /// Index key of the source.
        key: String,
        /// Reason for the failure.
        reason: String,
    },

    /// The merged document has no pages.
    #[error("Bundle has no pages: none of the indexed documents could be merged")]
    EmptyBundle,

    /// The index could not be parsed.
    #[error("Invalid index at row {row}\n  Details: {details}")]
    InvalidIndex {
        /// 1-based data row number.
        row: usize,
        /// What is wrong with the row.
        details: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// Merge stage failure.
    #[error("Merge failed: {reason}")]
    Merge {
        /// Description of what went wrong.
        reason: String,
    },

    /// TOC render failure.
    #[error("Failed to create table of contents: {reason}")]
    TocRender {
        /// Description of what went wrong.
        reason: String,
    },

    /// Footer stamp generation or overlay failure.
    #[error("Pagination failed: {reason}")]
    Pagination {
        /// Description of what went wrong.
        reason: String,
    },

    /// The footer stamp and the content document disagree on page count.
    #[error(
        "Pagination failed: footer stamp has {stamp_pages} page(s) but content has {content_pages}"
    )]
    StampMismatch {
        /// Pages in the stamp document.
        stamp_pages: usize,
        /// Pages in the content document.
        content_pages: usize,
    },

    /// Frontmatter assembly failure.
    #[error("Frontmatter assembly failed: {reason}")]
    FrontMatter {
        /// Description of what went wrong.
        reason: String,
    },

    /// The assembled frontmatter length differs from the size probe.
    #[error(
        "Frontmatter length mismatch: expected {expected} page(s) from the size probe, assembled {actual}"
    )]
    FrontMatterMismatch {
        /// Length predicted by the probe pass.
        expected: usize,
        /// Length actually assembled.
        actual: usize,
    },

    /// Hyperlink synthesis failure.
    #[error("Hyperlinking failed: {reason}")]
    Hyperlinking {
        /// Description of what went wrong.
        reason: String,
    },

    /// Outline composition failure.
    #[error("Bookmarking failed: {reason}")]
    Bookmarking {
        /// Description of what went wrong.
        reason: String,
    },

    /// Page label failure.
    #[error("Failed to write page labels: {reason}")]
    PageLabels {
        /// Description of what went wrong.
        reason: String,
    },

    /// Nested bundle link repair failure.
    #[error("Nested bundle link repair failed: {reason}")]
    LinkRepair {
        /// Description of what went wrong.
        reason: String,
    },

    /// Office-document export failure.
    #[error("DOCX export failed: {reason}")]
    DocxExport {
        /// Description of what went wrong.
        reason: String,
    },

    /// Serialising the finished bundle failed.
    #[error("Failed to serialise bundle: {reason}")]
    Serialize {
        /// Description of what went wrong.
        reason: String,
    },

    /// Failed to write an output file.
    #[error("Failed to write to output file: {}\n  Reason: {source}", .path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A blocking worker panicked or was cancelled.
    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error raised by the PDF object layer.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl From<anyhow::Error> for BundleError {
    fn from(err: anyhow::Error) -> Self {
        Self::other(err.to_string())
    }
}

impl BundleError {
    /// Create a FailedToLoadPdf error.
    pub fn failed_to_load_pdf(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FailedToLoadPdf {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidIndex error.
    pub fn invalid_index(row: usize, details: impl Into<String>) -> Self {
        Self::InvalidIndex {
            row,
            details: details.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a Merge error.
    pub fn merge(reason: impl Into<String>) -> Self {
        Self::Merge {
            reason: reason.into(),
        }
    }

    /// Create a TocRender error.
    pub fn toc_render(reason: impl Into<String>) -> Self {
        Self::TocRender {
            reason: reason.into(),
        }
    }

    /// Create a Pagination error.
    pub fn pagination(reason: impl Into<String>) -> Self {
        Self::Pagination {
            reason: reason.into(),
        }
    }

    /// Create a FrontMatter error.
    pub fn front_matter(reason: impl Into<String>) -> Self {
        Self::FrontMatter {
            reason: reason.into(),
        }
    }

    /// Create a Hyperlinking error.
    pub fn hyperlinking(reason: impl Into<String>) -> Self {
        Self::Hyperlinking {
            reason: reason.into(),
        }
    }

    /// Create a Bookmarking error.
    pub fn bookmarking(reason: impl Into<String>) -> Self {
        Self::Bookmarking {
            reason: reason.into(),
        }
    }

    /// Create a PageLabels error.
    pub fn page_labels(reason: impl Into<String>) -> Self {
        Self::PageLabels {
            reason: reason.into(),
        }
    }

    /// Create a LinkRepair error.
    pub fn link_repair(reason: impl Into<String>) -> Self {
        Self::LinkRepair {
            reason: reason.into(),
        }
    }

    /// Create a DocxExport error.
    pub fn docx_export(reason: impl Into<String>) -> Self {
        Self::DocxExport {
            reason: reason.into(),
        }
    }

    /// Create a Serialize error.
    pub fn serialize(reason: impl Into<String>) -> Self {
        Self::Serialize {
            reason: reason.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// The stage this error belongs to.
    ///
    /// Generic I/O, PDF and worker errors are attributed to the merge stage
    /// unless a stage wrapped them first with [`BundleError::in_stage`].
    pub fn stage(&self) -> Stage {
        match self {
            Self::InvalidIndex { .. } | Self::InvalidConfig { .. } => Stage::Input,
            Self::FailedToLoadPdf { .. } | Self::EmptyBundle | Self::Merge { .. } => Stage::Merge,
            Self::TocRender { .. } => Stage::TocRender,
            Self::Pagination { .. } | Self::StampMismatch { .. } => Stage::Pagination,
            Self::FrontMatter { .. } | Self::FrontMatterMismatch { .. } => Stage::FrontMatter,
            Self::Hyperlinking { .. } => Stage::Hyperlinking,
            Self::Bookmarking { .. } => Stage::Bookmarking,
            Self::PageLabels { .. } => Stage::PageLabels,
            Self::LinkRepair { .. } => Stage::LinkRepair,
            Self::DocxExport { .. } => Stage::DocxExport,
            Self::Serialize { .. } | Self::FailedToWrite { .. } => Stage::Output,
            Self::Join(_) | Self::Io(_) | Self::Pdf(_) | Self::Other { .. } => Stage::Merge,
        }
    }

    /// Re-wrap a generic error into the given stage's variant.
    ///
    /// Errors that already carry a stage are returned unchanged.
    pub fn in_stage(self, stage: Stage) -> Self {
        if !matches!(
            self,
            Self::Join(_) | Self::Io(_) | Self::Pdf(_) | Self::Other { .. }
        ) {
            return self;
        }
        let reason = self.to_string();
        match stage {
            Stage::Input => Self::invalid_config(reason),
            Stage::Merge => Self::merge(reason),
            Stage::TocRender => Self::toc_render(reason),
            Stage::Pagination => Self::pagination(reason),
            Stage::FrontMatter => Self::front_matter(reason),
            Stage::Hyperlinking => Self::hyperlinking(reason),
            Stage::Bookmarking => Self::bookmarking(reason),
            Stage::PageLabels => Self::page_labels(reason),
            Stage::LinkRepair => Self::link_repair(reason),
            Stage::DocxExport => Self::docx_export(reason),
            Stage::Output => Self::serialize(reason),
        }
    }

    /// Check if this error is recoverable (the run can continue without the item).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FailedToLoadPdf { .. } | Self::DocxExport { .. }
        )
    }

    /// Check if this error invalidates the page-offset bookkeeping.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::EmptyBundle
                | Self::StampMismatch { .. }
                | Self::FrontMatterMismatch { .. }
                | Self::TocRender { .. }
        )
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidIndex { .. } | Self::InvalidConfig { .. } => 1,
            Self::FailedToLoadPdf { .. } => 3,
            Self::EmptyBundle => 1,
            Self::Serialize { .. } | Self::FailedToWrite { .. } | Self::Io(_) => 5,
            Self::StampMismatch { .. } | Self::FrontMatterMismatch { .. } => 7,
            _ => 6,
        }
    }
}

/// A failed bundle run, tagged with the run's correlation identifier.
#[derive(Debug, thiserror::Error)]
#[error("[session {session_id}] {stage} stage failed: {source}")]
pub struct RunError {
    /// Session identifier of the failed run.
    pub session_id: String,
    /// Stage that failed.
    pub stage: Stage,
    /// Underlying error.
    #[source]
    pub source: BundleError,
}

impl RunError {
    /// Tag an error with its session id.
    pub fn new(session_id: impl Into<String>, source: BundleError) -> Self {
        Self {
            session_id: session_id.into(),
            stage: source.stage(),
            source,
        }
    }

    /// Get the exit code for the wrapped error.
    pub fn exit_code(&self) -> i32 {
        self.source.exit_code()
    }
}
