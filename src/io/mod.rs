//! Input loading and output writing.

pub mod reader;
pub mod writer;

pub use reader::{LoadResult, LoadStatistics, LoadedPdf, PdfReader, SourceSet};
pub use writer::{PdfWriter, WriteOptions, WriteStatistics, format_file_size};
