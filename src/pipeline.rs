//! The bundle run, stage by stage.
//!
//! ```text
//! merge -> size probe -> { TOC | pagination | DOCX } -> frontmatter
//!       -> hyperlinks -> outline -> page labels -> nested link repair -> bytes
//! ```
//!
//! The real TOC pass and pagination run concurrently and both must succeed.
//! The DOCX export runs alongside them and may fail without failing the run.

use std::sync::Arc;

use lopdf::Document;
use tokio::task;

use crate::config::BundleConfig;
use crate::context::BuildContext;
use crate::error::{BundleError, Result, RunError, Stage};
use crate::footer::{FooterStyle, build_stamp, overlay_stamp};
use crate::frontmatter::assemble;
use crate::index::Index;
use crate::io::{PdfReader, PdfWriter, SourceSet, WriteOptions};
use crate::links::synthesize_links;
use crate::manifest::{BundleManifest, PageCounts};
use crate::merge::{Merger, TocClassifier};
use crate::outline::{OutlinePlacement, compose_outline, write_outline, write_page_labels};
use crate::toc::{
    DocxExporter, RenderedToc, TocEntry, TocExporter, TocNumbering, TocOptions, TocRenderer,
    tab_column_extent,
};
use crate::utils::{media_box, page_ids};

/// Everything a successful run hands back.
#[derive(Debug)]
pub struct BundleOutput {
    /// The finished bundle.
    pub pdf: Vec<u8>,
    /// The office-document TOC, when exported.
    pub docx: Option<Vec<u8>>,
    /// Diagnostics.
    pub manifest: BundleManifest,
    /// Totals computed during the run.
    pub context: BuildContext,
}

/// Builds bundles for one configuration.
pub struct Bundler {
    config: Arc<BundleConfig>,
    merger: Merger,
    reader: PdfReader,
    writer: PdfWriter,
    exporter: Option<Arc<dyn TocExporter>>,
}

impl std::fmt::Debug for Bundler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundler")
            .field("config", &self.config)
            .field("merger", &self.merger)
            .field("docx", &self.exporter.is_some())
            .finish_non_exhaustive()
    }
}

impl Bundler {
    /// A bundler for `config`, exporting a DOCX TOC alongside the PDF.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: BundleConfig) -> Result<Self> {
        config.validate()?;
        let writer = PdfWriter::with_options(WriteOptions {
            compress: config.compress,
            ..Default::default()
        });
        Ok(Self {
            merger: Merger::new(config.effective_jobs()),
            reader: PdfReader::new(),
            writer,
            exporter: Some(Arc::new(DocxExporter::new(&config))),
            config: Arc::new(config),
        })
    }

    /// Replace the nested-bundle detector.
    pub fn with_classifier(mut self, classifier: Arc<dyn TocClassifier>) -> Self {
        self.merger = self.merger.with_classifier(classifier);
        self
    }

    /// Replace the office-document exporter.
    pub fn with_exporter(mut self, exporter: Arc<dyn TocExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Skip the office-document export.
    pub fn without_docx(mut self) -> Self {
        self.exporter = None;
        self
    }

    /// The configuration this bundler was built with.
    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Build a bundle from `index`, its `sources` and an optional coversheet.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] naming the failed stage and the run's session id.
    pub async fn build(
        &self,
        index: &Index,
        sources: &SourceSet,
        coversheet: Option<&[u8]>,
    ) -> std::result::Result<BundleOutput, RunError> {
        let mut context = BuildContext::new();
        log::info!(
            "[{}] Building bundle of {} index row(s) from {} source(s)",
            context.session_id,
            index.len(),
            sources.len()
        );
        let result = self.run(&mut context, index, sources, coversheet).await;
        result.map_err(|e| {
            log::error!("[{}] {} stage failed: {e}", context.session_id, e.stage());
            RunError::new(context.session_id.clone(), e)
        })
    }

    async fn run(
        &self,
        context: &mut BuildContext,
        index: &Index,
        sources: &SourceSet,
        coversheet: Option<&[u8]>,
    ) -> Result<BundleOutput> {
        let session = context.session_id.clone();
        let config = Arc::clone(&self.config);
        let roman = config.roman_for_preface;

        enter(&session, Stage::Merge);
        let merge = self
            .merger
            .merge(index, sources)
            .await
            .map_err(|e| e.in_stage(Stage::Merge))?;
        context.record_merge(merge.merged.page_count);
        leave(&session, Stage::Merge);

        let cover = match coversheet {
            Some(bytes) => self.load_coversheet(bytes).await,
            None => None,
        };
        let coversheet_len = cover.as_ref().map_or(0, |doc| doc.get_pages().len());

        let entries: Arc<[TocEntry]> = merge.toc_entries.into();
        let renderer = Arc::new(TocRenderer::new(&config));
        let mut options = TocOptions {
            confidential: config.confidential,
            date_setting: config.date_setting,
            probe: true,
            suppress_footer: roman,
        };

        enter(&session, Stage::TocRender);
        let probe = render(&renderer, &entries, options, TocNumbering::default()).await?;
        context.record_probe(coversheet_len, probe.page_count);
        log::debug!(
            "[{session}] Size probe: {} TOC page(s), {} expected frontmatter page(s)",
            probe.page_count,
            context.expected_length_of_frontmatter()
        );

        // Roman-numbered frontmatter restarts content numbering at 1.
        let (page_offset, display_total) = if roman {
            (0, context.main_page_count())
        } else {
            (context.expected_length_of_frontmatter(), context.total_page_count())
        };
        options.probe = false;
        let numbering = TocNumbering {
            page_offset,
            coversheet_len,
            total_pages: display_total,
        };

        let footer = FooterStyle::from_config(&config);
        let content = merge.merged.document;
        let toc_task = render(&renderer, &entries, options, numbering);
        let pagination_task = paginate(content, footer, page_offset, display_total);
        let docx_task = self.export_docx(&entries, page_offset);

        let (core, docx) = tokio::join!(
            async { tokio::try_join!(toc_task, pagination_task) },
            docx_task
        );
        let (toc, paginated) = core?;
        leave(&session, Stage::TocRender);
        leave(&session, Stage::Pagination);

        enter(&session, Stage::FrontMatter);
        let expected = (!roman).then(|| context.expected_length_of_frontmatter());
        let mut bundle = assemble(cover, toc.document, paginated, expected)
            .map_err(|e| e.in_stage(Stage::FrontMatter))?;
        let frontmatter_len = bundle.length_of_frontmatter();
        context.record_frontmatter(frontmatter_len);
        leave(&session, Stage::FrontMatter);

        enter(&session, Stage::Hyperlinking);
        let tab_column = tab_column_extent(config.date_setting.column());
        let links = synthesize_links(&mut bundle, &entries, tab_column, config.effective_jobs())
            .await
            .map_err(|e| e.in_stage(Stage::Hyperlinking))?;
        leave(&session, Stage::Hyperlinking);

        enter(&session, Stage::Bookmarking);
        let placement = OutlinePlacement {
            frontmatter_len,
            coversheet_len,
            page_offset,
        };
        let (outline, bookmarks) = compose_outline(
            &entries,
            &merge.bookmark_groups,
            config.bookmark_setting,
            placement,
        );
        write_outline(&mut bundle.document, &outline).map_err(|e| e.in_stage(Stage::Bookmarking))?;
        leave(&session, Stage::Bookmarking);

        if roman {
            enter(&session, Stage::PageLabels);
            write_page_labels(&mut bundle.document, frontmatter_len)
                .map_err(|e| e.in_stage(Stage::PageLabels))?;
            leave(&session, Stage::PageLabels);
        }

        enter(&session, Stage::LinkRepair);
        let toc_len = bundle.toc_len;
        let main_len = bundle.content_len;
        let (final_bundle, nested_links) = bundle.finalize(&merge.nested_bundles)?;
        leave(&session, Stage::LinkRepair);

        enter(&session, Stage::Output);
        let writer = self.writer.clone();
        let document = final_bundle.document;
        let pdf = task::spawn_blocking(move || writer.to_bytes(document))
            .await
            .map_err(BundleError::from)
            .and_then(|bytes| bytes)
            .map_err(|e| e.in_stage(Stage::Output))?;
        leave(&session, Stage::Output);

        let manifest = BundleManifest {
            session_id: session.clone(),
            pages: PageCounts {
                coversheet: coversheet_len,
                toc: toc_len,
                frontmatter: frontmatter_len,
                main: main_len,
                total: final_bundle.page_count,
            },
            entries: merge.entries,
            nested_bundles: merge.nested_bundles,
            links,
            bookmarks,
            nested_links,
            docx_exported: docx.is_some(),
        };
        log::info!(
            "[{session}] Bundle complete: {} page(s), {} link(s), {} skipped document(s)",
            manifest.pages.total,
            manifest.links.matched,
            manifest.skipped().count()
        );

        Ok(BundleOutput {
            pdf,
            docx,
            manifest,
            context: context.clone(),
        })
    }

    /// Parse the coversheet; an unreadable one is left out with a warning.
    async fn load_coversheet(&self, bytes: &[u8]) -> Option<Document> {
        let reader = self.reader.clone();
        let bytes = bytes.to_vec();
        let loaded = task::spawn_blocking(move || reader.parse("coversheet", &bytes))
            .await
            .map_err(BundleError::from)
            .and_then(|loaded| loaded);
        match loaded {
            Ok(loaded) => Some(loaded.document),
            Err(e) => {
                log::warn!("Coversheet could not be used: {e}. Continuing without it.");
                None
            }
        }
    }

    /// Run the exporter on the blocking pool; failures are logged and dropped.
    async fn export_docx(&self, entries: &Arc<[TocEntry]>, page_offset: usize) -> Option<Vec<u8>> {
        let exporter = Arc::clone(self.exporter.as_ref()?);
        let entries = Arc::clone(entries);
        let exported = task::spawn_blocking(move || exporter.export(&entries, page_offset))
            .await
            .map_err(BundleError::from)
            .and_then(|bytes| bytes);
        match exported {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::warn!("DOCX export failed: {e}. Continuing without it.");
                None
            }
        }
    }
}

fn enter(session: &str, stage: Stage) {
    log::debug!("[{session}] {stage}: started");
}

fn leave(session: &str, stage: Stage) {
    log::debug!("[{session}] {stage}: finished");
}

/// One TOC pass on the blocking pool.
async fn render(
    renderer: &Arc<TocRenderer>,
    entries: &Arc<[TocEntry]>,
    options: TocOptions,
    numbering: TocNumbering,
) -> Result<RenderedToc> {
    let renderer = Arc::clone(renderer);
    let entries = Arc::clone(entries);
    task::spawn_blocking(move || renderer.render(&entries, &options, &numbering))
        .await
        .map_err(BundleError::from)
        .and_then(|toc| toc)
        .map_err(|e| e.in_stage(Stage::TocRender))
}

/// Stamp footers onto every content page on the blocking pool.
async fn paginate(
    mut content: Document,
    footer: FooterStyle,
    offset: usize,
    total: usize,
) -> Result<Document> {
    task::spawn_blocking(move || {
        let sizes: Vec<(f32, f32)> = page_ids(&content)
            .into_iter()
            .map(|id| {
                let [x0, y0, x1, y1] = media_box(&content, id);
                (x1 - x0, y1 - y0)
            })
            .collect();
        let stamp = build_stamp(&sizes, &footer, offset, total)?;
        let stamped = overlay_stamp(&mut content, stamp)?;
        log::debug!("Stamped footers on {stamped} content page(s)");
        Ok(content)
    })
    .await
    .map_err(BundleError::from)
    .and_then(|paginated| paginated)
    .map_err(|e| e.in_stage(Stage::Pagination))
}
