//! PDF serialization and saving.
//!
//! A bundle is serialized once to bytes; the bytes are then written to disk
//! with an atomic rename so a failed run never leaves a half-written file
//! under the final name.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use lopdf::Document;
use tokio::task;

use crate::error::{BundleError, Result};

/// Options for serializing and writing PDFs.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Write to a temporary sibling, then rename.
    pub atomic: bool,

    /// Compress streams before serializing.
    pub compress: bool,

    /// Drop objects unreachable from the trailer.
    pub prune: bool,

    /// Buffer size for file writes (in bytes).
    pub buffer_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            atomic: true,
            compress: true,
            prune: true,
            buffer_size: 8192,
        }
    }
}

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to write the file.
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// PDF writer with configurable behavior.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    options: WriteOptions,
}

impl PdfWriter {
    /// Create a new PDF writer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with custom options.
    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Serialize a document in memory.
    ///
    /// The document is consumed because pruning and compression mutate it.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::Io`] if lopdf fails to serialize the object graph.
    pub fn to_bytes(&self, mut doc: Document) -> Result<Vec<u8>> {
        if self.options.prune {
            let pruned = doc.prune_objects();
            if !pruned.is_empty() {
                log::debug!("Pruned {} unreachable objects", pruned.len());
            }
        }
        if self.options.compress {
            doc.compress();
        }

        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        Ok(out)
    }

    /// Write serialized bytes to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::FailedToWrite`] if the file cannot be created,
    /// written, or renamed into place.
    pub async fn save(&self, bytes: Vec<u8>, path: &Path) -> Result<WriteStatistics> {
        let path_buf = path.to_path_buf();
        let options = self.options.clone();

        task::spawn_blocking(move || {
            let start = Instant::now();
            let write_path = if options.atomic {
                path_buf.with_extension("tmp")
            } else {
                path_buf.clone()
            };

            let failed = |path: &Path| {
                let path = path.to_path_buf();
                move |source| BundleError::FailedToWrite { path, source }
            };

            let file = std::fs::File::create(&write_path).map_err(failed(&write_path))?;
            let mut writer = std::io::BufWriter::with_capacity(options.buffer_size, file);
            writer.write_all(&bytes).map_err(failed(&write_path))?;
            writer.flush().map_err(failed(&write_path))?;
            drop(writer);

            if options.atomic {
                std::fs::rename(&write_path, &path_buf).map_err(failed(&path_buf))?;
            }

            Ok(WriteStatistics {
                write_time: start.elapsed(),
                file_size: bytes.len() as u64,
                output_path: path_buf,
            })
        })
        .await?
    }

    /// Check whether a path can be written (its directory exists).
    pub fn can_write(path: &Path) -> bool {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.is_dir(),
            _ => true,
        }
    }
}

/// Format file size as human-readable string.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} bytes")
    }
}
