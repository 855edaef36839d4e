//! pdfbundle - Assemble indexed PDF documents into a paginated bundle.
//!
//! A bundle is the set of documents named by an index, concatenated behind
//! an optional coversheet and a generated table of contents. The library:
//!
//! - Merges sources in index order, skipping missing or unreadable ones
//! - Renders the TOC, probing its size first so page numbers are final
//! - Stamps page-number footers onto every content page
//! - Links each TOC row to its document and writes a bookmark outline
//! - Repairs the internal TOC links of bundles nested inside the bundle
//! - Exports the TOC as an office document
//!
//! # Examples
//!
//! ```no_run
//! use pdfbundle::{BundleConfig, Bundler, Index, SourceSet};
//! use pdfbundle::config::DateSetting;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let index = Index::from_csv(
//!     "filename,title,date\nclaim.pdf,Claim Form,2024-01-31\n",
//!     DateSetting::default(),
//! )?;
//! let sources = SourceSet::from_paths(&["claim.pdf"]).await;
//!
//! let bundler = Bundler::new(BundleConfig::default())?;
//! let output = bundler.build(&index, &sources, None).await?;
//! println!("{} pages", output.manifest.pages.total);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod error;
pub mod footer;
pub mod frontmatter;
pub mod index;
pub mod io;
pub mod links;
pub mod manifest;
pub mod merge;
pub mod outline;
pub mod output;
pub mod pipeline;
pub mod text;
pub mod toc;
pub mod utils;

// Re-export commonly used types
pub use config::BundleConfig;
pub use context::BuildContext;
pub use error::{BundleError, Result, RunError, Stage};
pub use index::{Index, IndexEntry};
pub use io::SourceSet;
pub use manifest::BundleManifest;
pub use pipeline::{BundleOutput, Bundler};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
