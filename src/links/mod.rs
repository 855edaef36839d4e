//! Link annotations: TOC hyperlinks and nested-bundle repair.

pub mod hyperlinks;
pub mod repair;

pub use hyperlinks::{Annotation, LinkReport, flip_rect, match_entries, synthesize_links};
pub use repair::{NestedBundle, RepairReport, normalize_toc_links, repair_nested_links};
