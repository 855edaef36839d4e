//! Failures that abort a run and degradations that only shrink it.

use std::sync::Arc;

use pdfbundle::config::DateSetting;
use pdfbundle::merge::EntryStatus;
use pdfbundle::toc::{TocEntry, TocExporter};
use pdfbundle::{BundleConfig, BundleError, Bundler, Index, Stage};

use crate::common::{load, page_contains, page_ids, plain_pdf, sources, test_config};

struct FailingExporter;

impl TocExporter for FailingExporter {
    fn export(&self, _entries: &[TocEntry], _frontmatter_len: usize) -> pdfbundle::Result<Vec<u8>> {
        Err(BundleError::docx_export("template missing"))
    }
}

fn single_row_index() -> Index {
    Index::from_csv("filename,title\na.pdf,Doc A\n", DateSetting::Hidden).unwrap()
}

#[tokio::test]
async fn test_no_documents_is_an_empty_bundle() {
    let set = sources(&[]);
    let err = Bundler::new(test_config())
        .unwrap()
        .build(&single_row_index(), &set, None)
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Merge);
    assert!(matches!(err.source, BundleError::EmptyBundle));
    assert_eq!(err.session_id.len(), 8);
    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains(&err.session_id));
}

#[test]
fn test_zero_jobs_rejected() {
    let config = BundleConfig {
        jobs: Some(0),
        ..Default::default()
    };
    let err = Bundler::new(config).unwrap_err();
    assert!(matches!(err, BundleError::InvalidConfig { .. }));
}

#[tokio::test]
async fn test_unreadable_source_is_skipped() {
    let set = sources(&[
        ("bad.pdf", b"this is not a pdf".to_vec()),
        ("a.pdf", plain_pdf(1, "Doc A")),
    ]);
    let index = Index::from_csv(
        "filename,title\nbad.pdf,Broken\na.pdf,Doc A\n",
        DateSetting::Hidden,
    )
    .unwrap();

    let output = Bundler::new(test_config())
        .unwrap()
        .without_docx()
        .build(&index, &set, None)
        .await
        .unwrap();

    assert!(matches!(
        output.manifest.entries[0].status,
        EntryStatus::Failed { .. }
    ));
    assert_eq!(
        output.manifest.entries[1].status,
        EntryStatus::Merged { pages: 1, start: 0 }
    );
    let doc = load(&output.pdf);
    assert_eq!(page_ids(&doc).len(), 2);
    assert!(page_contains(&doc, 0, "001."));
}

#[tokio::test]
async fn test_unreadable_coversheet_is_left_out() {
    let set = sources(&[("a.pdf", plain_pdf(1, "Doc A"))]);
    let output = Bundler::new(test_config())
        .unwrap()
        .without_docx()
        .build(&single_row_index(), &set, Some(b"garbage".as_slice()))
        .await
        .unwrap();

    assert_eq!(output.manifest.pages.coversheet, 0);
    assert_eq!(output.manifest.pages.total, 2);
}

#[tokio::test]
async fn test_docx_failure_does_not_fail_the_run() {
    let set = sources(&[("a.pdf", plain_pdf(1, "Doc A"))]);
    let output = Bundler::new(test_config())
        .unwrap()
        .with_exporter(Arc::new(FailingExporter))
        .build(&single_row_index(), &set, None)
        .await
        .unwrap();

    assert!(output.docx.is_none());
    assert!(!output.manifest.docx_exported);
    assert_eq!(output.manifest.pages.total, 2);
}

#[test]
fn test_duplicate_index_rows_rejected() {
    let err = Index::from_csv("filename,title\na.pdf,A\na.pdf,Again\n", DateSetting::Hidden)
        .unwrap_err();
    assert!(matches!(err, BundleError::InvalidIndex { row: 2, .. }));
    assert_eq!(err.stage(), Stage::Input);
}

#[test]
fn test_unknown_date_setting_rejected() {
    let err = "weekday".parse::<DateSetting>().unwrap_err();
    assert!(matches!(err, BundleError::InvalidConfig { .. }));
}
