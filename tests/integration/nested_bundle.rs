//! Bundles merged into bundles keep working TOC links.

use pdfbundle::config::DateSetting;
use pdfbundle::{Bundler, Index};

use crate::common::{PdfBuilder, link_targets, load, page_contains, plain_pdf, sources, test_config};

/// A three-page bundle whose TOC page links to its last page.
fn inner_bundle() -> Vec<u8> {
    PdfBuilder::new()
        .page(&["Inner Bundle", "Tab Title Page", "001. Witness Statement 2"])
        .page(&["Exhibit page 1"])
        .page(&["Witness statement page 1"])
        .link(0, 2)
        .build()
}

#[tokio::test]
async fn test_nested_toc_links_point_into_the_outer_bundle() {
    let set = sources(&[
        ("a.pdf", plain_pdf(2, "Doc A")),
        ("inner.pdf", inner_bundle()),
    ]);
    let index = Index::from_csv(
        "filename,title\na.pdf,Doc A\ninner.pdf,Earlier Bundle\n",
        DateSetting::Hidden,
    )
    .unwrap();

    let output = Bundler::new(test_config())
        .unwrap()
        .without_docx()
        .build(&index, &set, None)
        .await
        .unwrap();

    assert_eq!(output.manifest.nested_bundles.len(), 1);
    assert_eq!(output.manifest.nested_bundles[0].source_key, "inner.pdf");
    assert_eq!(output.manifest.nested_bundles[0].toc_pages, 1);
    assert_eq!(output.manifest.nested_bundles[0].content_start, 2);
    assert_eq!(output.manifest.nested_links.repaired, 1);
    assert_eq!(output.manifest.nested_links.out_of_range, 0);

    // Outer TOC on page 0, a.pdf on 1-2, the inner bundle on 3-5.
    let doc = load(&output.pdf);
    assert!(page_contains(&doc, 3, "Tab Title Page"));
    assert!(page_contains(&doc, 5, "Witness statement page 1"));
    assert_eq!(link_targets(&doc, 3), [5]);

    let mut outer = link_targets(&doc, 0);
    outer.sort_unstable();
    assert_eq!(outer, [1, 3]);
}

#[tokio::test]
async fn test_plain_documents_are_not_nested_bundles() {
    let set = sources(&[("a.pdf", plain_pdf(1, "Doc A"))]);
    let index = Index::from_csv("filename,title\na.pdf,Doc A\n", DateSetting::Hidden).unwrap();

    let output = Bundler::new(test_config())
        .unwrap()
        .without_docx()
        .build(&index, &set, None)
        .await
        .unwrap();

    assert!(output.manifest.nested_bundles.is_empty());
    assert_eq!(output.manifest.nested_links.repaired, 0);
}
