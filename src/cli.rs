//! CLI argument parsing for pdfbundle.
//!
//! Formatting flags override the values of the `--options` JSON file, which
//! in turn override the defaults.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};

use pdfbundle::config::{BundleConfig, DateSetting};
use pdfbundle::error::{BundleError, Result};
use pdfbundle::utils::collect_paths_for_patterns;

/// Assemble indexed PDF documents into a single paginated bundle.
///
/// The index decides the order of the bundle. Each content row names one of
/// the FILES by file name; section rows add a heading to the TOC and outline.
#[derive(Parser, Debug)]
#[command(name = "pdfbundle")]
#[command(version)]
#[command(about = "Assemble indexed PDF documents into a paginated bundle", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Source PDF files (glob patterns are expanded)
    ///
    /// Files are matched to index rows by file name, so their order here
    /// does not matter.
    ///
    /// Examples:
    ///   pdfbundle --index index.csv -o bundle.pdf docs/*.pdf
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<String>,

    /// Index of the bundle (CSV, or JSON when the extension is .json)
    ///
    /// CSV rows are `filename,title[,date[,section]]` after a header row.
    /// A truthy section column turns the row into a section break.
    #[arg(long, value_name = "FILE")]
    pub index: PathBuf,

    /// Output PDF file path
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Coversheet PDF placed before the TOC
    #[arg(short, long, value_name = "FILE")]
    pub coversheet: Option<PathBuf>,

    /// Also write the TOC as a DOCX document
    #[arg(long, value_name = "FILE")]
    pub docx: Option<PathBuf>,

    /// Write the run manifest as JSON
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// JSON option file with bundle formatting settings
    #[arg(long, value_name = "FILE", env = "PDFBUNDLE_OPTIONS")]
    pub options: Option<PathBuf>,

    /// Bundle title shown in the TOC header
    #[arg(long, value_name = "TEXT")]
    pub bundle_title: Option<String>,

    /// Claim number shown in the TOC header
    #[arg(long, value_name = "TEXT")]
    pub claim_no: Option<String>,

    /// Case name shown in the TOC header
    #[arg(long, value_name = "TEXT")]
    pub case_name: Option<String>,

    /// Mark the bundle title CONFIDENTIAL
    #[arg(long)]
    pub confidential: bool,

    /// Date column format
    #[arg(long, value_name = "FORMAT")]
    #[arg(value_parser = [
        "YYYY-MM-DD", "DD-MM-YYYY", "MM-DD-YYYY", "uk_longdate", "us_longdate",
        "uk_abbreviated_date", "us_abbreviated_date", "hide_date",
    ])]
    pub date_setting: Option<String>,

    /// Bookmark label layout (tab-title, tab-title-date, tab-title-page, tab-title-date-page)
    #[arg(long, value_name = "LAYOUT")]
    pub bookmark_setting: Option<String>,

    /// TOC typeface (serif, sans, mono, traditional)
    #[arg(long, value_name = "FONT")]
    pub index_font: Option<String>,

    /// Footer typeface (serif, sans, mono, traditional)
    #[arg(long, value_name = "FONT")]
    pub footer_font: Option<String>,

    /// Footer alignment (left, centre, right)
    #[arg(long, value_name = "ALIGN")]
    pub page_num_align: Option<String>,

    /// Footer format (x, x_of_y, page_x, page_x_of_y, x_slash_y)
    #[arg(long, value_name = "STYLE")]
    pub page_num_style: Option<String>,

    /// Text prepended to every footer
    #[arg(long, value_name = "TEXT")]
    pub footer_prefix: Option<String>,

    /// Number the coversheet and TOC in lowercase Roman numerals
    #[arg(long)]
    pub roman_for_preface: bool,

    /// Leave content streams of the bundle uncompressed
    #[arg(long)]
    pub no_compress: bool,

    /// Number of parallel jobs (defaults to the number of CPU cores)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Validate arguments that need no file I/O.
    ///
    /// # Errors
    ///
    /// Returns an error if the job count is zero or the output would
    /// overwrite an input.
    pub fn validate(&self) -> Result<()> {
        if let Some(jobs) = self.jobs
            && jobs == 0
        {
            return Err(BundleError::invalid_config(
                "Number of jobs must be at least 1",
            ));
        }
        if self.coversheet.as_deref() == Some(self.output.as_path()) {
            return Err(BundleError::invalid_config(
                "Output path must differ from the coversheet",
            ));
        }
        Ok(())
    }

    /// Apply the formatting flags on top of `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the date format is unknown or the result fails
    /// validation.
    pub fn apply_to(&self, mut config: BundleConfig) -> Result<BundleConfig> {
        let details = &mut config.case_details;
        if let Some(title) = &self.bundle_title {
            details.bundle_title = title.clone();
        }
        if let Some(claim_no) = &self.claim_no {
            details.claim_no = claim_no.clone();
        }
        if let Some(case_name) = &self.case_name {
            details.case_name = case_name.clone();
        }

        if let Some(date) = &self.date_setting {
            config.date_setting = date.parse::<DateSetting>()?;
        }
        if let Some(setting) = &self.bookmark_setting {
            config.bookmark_setting = setting.as_str().into();
        }
        if let Some(font) = &self.index_font {
            config.index_font = font.as_str().into();
        }
        if let Some(font) = &self.footer_font {
            config.footer_font = font.as_str().into();
        }
        if let Some(align) = &self.page_num_align {
            config.page_num_align = align.as_str().into();
        }
        if let Some(style) = &self.page_num_style {
            config.page_num_style = style.as_str().into();
        }
        if let Some(prefix) = &self.footer_prefix {
            config.footer_prefix = prefix.clone();
        }

        config.confidential |= self.confidential;
        config.roman_for_preface |= self.roman_for_preface;
        if self.no_compress {
            config.compress = false;
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load the option file, if any, and apply the flags on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the option file cannot be read or parsed.
    pub async fn to_config(&self) -> Result<BundleConfig> {
        let base = match &self.options {
            Some(path) => {
                let json = tokio::fs::read_to_string(path).await.map_err(|e| {
                    BundleError::invalid_config(format!(
                        "Cannot read option file {}: {e}",
                        path.display()
                    ))
                })?;
                BundleConfig::from_json(&json)?
            }
            None => BundleConfig::default(),
        };
        self.apply_to(base)
    }

    /// Expand the FILE patterns into paths.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is malformed.
    pub fn input_paths(&self) -> Result<Vec<PathBuf>> {
        collect_paths_for_patterns(&self.files)
    }

    /// Whether the index should be parsed as JSON.
    pub fn index_is_json(&self) -> bool {
        is_json(&self.index)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
