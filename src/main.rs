//! pdfbundle - Assemble indexed PDF documents into a paginated bundle.

mod cli;

use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use crate::cli::Cli;
use pdfbundle::io::{PdfWriter, SourceSet};
use pdfbundle::output::{OutputFormatter, display_manifest_summary, display_skipped};
use pdfbundle::{Bundler, Index, RunError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let formatter = OutputFormatter::new(cli.quiet, cli.verbose > 0);

    if let Err(err) = run(cli, &formatter).await {
        formatter.error(&format!("Error: {err:#}"));
        let code = err
            .downcast_ref::<RunError>()
            .map(RunError::exit_code)
            .or_else(|| err.downcast_ref::<pdfbundle::BundleError>().map(|e| e.exit_code()))
            .unwrap_or(1);
        process::exit(code);
    }
}

/// `warn` by default, raised by `-v`; `RUST_LOG` wins when set.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    cli.validate()?;
    if !PdfWriter::can_write(&cli.output) {
        anyhow::bail!("Output directory of {} does not exist", cli.output.display());
    }
    let config = cli.to_config().await?;

    if formatter.should_print() {
        formatter.section(&format!("{} v{}", pdfbundle::NAME, pdfbundle::VERSION));
        formatter.blank_line();
    }

    let index_text = tokio::fs::read_to_string(&cli.index)
        .await
        .with_context(|| format!("Failed to read index {}", cli.index.display()))?;
    let index = if cli.index_is_json() {
        Index::from_json(&index_text)?
    } else {
        Index::from_csv(&index_text, config.date_setting)?
    };

    let paths = cli.input_paths()?;
    formatter.info(&format!(
        "Loading {} source file(s) for {} index row(s)...",
        paths.len(),
        index.len()
    ));
    let sources = SourceSet::from_paths(&paths).await;
    for key in index.content_keys().filter(|key| !sources.contains(key)) {
        formatter.debug(&format!("No file supplied for {key}"));
    }

    let coversheet = match &cli.coversheet {
        Some(path) => Some(
            tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read coversheet {}", path.display()))?,
        ),
        None => None,
    };

    let mut bundler = Bundler::new(config)?;
    if cli.docx.is_none() {
        bundler = bundler.without_docx();
    }

    formatter.info("Building bundle...");
    let output = bundler
        .build(&index, &sources, coversheet.as_deref())
        .await?;

    display_skipped(formatter, &output.manifest);
    display_manifest_summary(formatter, &output.manifest);

    let writer = PdfWriter::new();
    let stats = writer.save(output.pdf, &cli.output).await?;
    formatter.success(&format!(
        "Created {} ({})",
        cli.output.display(),
        stats.format_file_size()
    ));
    formatter.debug(&format!(
        "Wrote {} in {:.2?}",
        stats.output_path.display(),
        stats.write_time
    ));

    if let Some(path) = &cli.docx {
        match &output.docx {
            Some(bytes) => {
                tokio::fs::write(path, bytes)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                formatter.success(&format!("Created {}", path.display()));
            }
            None => formatter.warning("DOCX export failed; no office document was written"),
        }
    }

    if let Some(path) = &cli.manifest {
        let json = output.manifest.to_json()?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        formatter.detail("Manifest", &path.display().to_string());
    }

    Ok(())
}
