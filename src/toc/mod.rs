//! The table of contents: row model, PDF layout and office export.

pub mod docx;
pub mod entry;
pub mod render;

pub use docx::{DocxExporter, TocExporter};
pub use entry::{TocEntry, next_content_dest, tab_label};
pub use render::{
    PROBE_PLACEHOLDER, RenderedToc, TocNumbering, TocOptions, TocRenderer, tab_column_extent,
};
