//! Full bundle runs checked page by page.

use std::io::{Cursor, Read};

use lopdf::Object;
use pdfbundle::config::{BookmarkSetting, DateSetting};
use pdfbundle::merge::extract_bookmarks;
use pdfbundle::{Bundler, Index};

use crate::common::{
    PdfBuilder, link_targets, load, page_contains, page_ids, plain_pdf, sources, test_config,
};

fn outline_of(bytes: &[u8]) -> Vec<(String, usize, usize)> {
    extract_bookmarks(&load(bytes))
        .bookmarks
        .into_iter()
        .map(|b| (b.title, b.page_index, b.level))
        .collect()
}

#[tokio::test]
async fn test_three_documents_without_coversheet() {
    let part_a: &[(&str, usize)] = &[("A.1", 1)];
    let part_b: &[(&str, usize)] = &[];
    let b = PdfBuilder::new()
        .pages(3, "Doc B")
        .outline(&[("Part A", 0, part_a), ("Part B", 2, part_b)])
        .build();
    let set = sources(&[
        ("a.pdf", plain_pdf(2, "Doc A")),
        ("b.pdf", b),
        ("c.pdf", plain_pdf(1, "Doc C")),
    ]);
    let index = Index::from_csv(
        "filename,title\na.pdf,Doc A\nb.pdf,Doc B\nc.pdf,Doc C\n",
        DateSetting::Hidden,
    )
    .unwrap();

    let bundler = Bundler::new(test_config()).unwrap().without_docx();
    let output = bundler.build(&index, &set, None).await.unwrap();

    assert_eq!(output.manifest.pages.toc, 1);
    assert_eq!(output.manifest.pages.frontmatter, 1);
    assert_eq!(output.manifest.pages.main, 6);
    assert_eq!(output.manifest.pages.total, 7);
    assert_eq!(output.context.total_page_count(), 7);

    let doc = load(&output.pdf);
    assert_eq!(page_ids(&doc).len(), 7);

    let mut targets = link_targets(&doc, 0);
    targets.sort_unstable();
    assert_eq!(targets, [1, 3, 6]);
    assert_eq!(output.manifest.links.matched, 3);
    assert!(output.manifest.links.unmatched.is_empty());

    assert!(page_contains(&doc, 0, "Page 1 of 7"));
    assert!(page_contains(&doc, 1, "Page 2 of 7"));
    assert!(page_contains(&doc, 6, "Page 7 of 7"));
    assert!(page_contains(&doc, 3, "Doc B page 1"));

    let outline = outline_of(&output.pdf);
    let expected = [
        ("Index", 0, 0),
        ("001. Doc A", 1, 0),
        ("002. Doc B", 3, 0),
        ("Part A", 3, 1),
        ("A.1", 4, 2),
        ("Part B", 5, 1),
        ("003. Doc C", 6, 0),
    ];
    let expected: Vec<(String, usize, usize)> = expected
        .iter()
        .map(|(t, p, l)| (t.to_string(), *p, *l))
        .collect();
    assert_eq!(outline, expected);
    assert_eq!(output.manifest.bookmarks.bookmarks, 4);
    assert_eq!(output.manifest.bookmarks.sub_bookmarks, 3);
    assert_eq!(output.manifest.bookmarks.orphaned, 0);
}

#[tokio::test]
async fn test_sections_coversheet_and_docx() {
    let set = sources(&[
        ("claim.pdf", plain_pdf(2, "Claim")),
        ("defence.pdf", plain_pdf(3, "Defence")),
    ]);
    let index = Index::from_csv(
        "filename,title,date,section\n\
         SECTION,Pleadings,,1\n\
         claim.pdf,Claim Form,2024-01-31,0\n\
         defence.pdf,Defence,2024-02-14,0\n",
        DateSetting::DayMonthYear,
    )
    .unwrap();
    let coversheet = plain_pdf(1, "Cover");

    let config = pdfbundle::BundleConfig {
        date_setting: DateSetting::DayMonthYear,
        ..test_config()
    };
    let output = Bundler::new(config)
        .unwrap()
        .build(&index, &set, Some(&coversheet))
        .await
        .unwrap();

    assert_eq!(output.manifest.pages.coversheet, 1);
    assert_eq!(output.manifest.pages.frontmatter, 2);
    assert_eq!(output.manifest.pages.total, 7);

    let doc = load(&output.pdf);
    assert!(page_contains(&doc, 0, "Cover page 1"));
    let mut targets = link_targets(&doc, 1);
    targets.sort_unstable();
    assert_eq!(targets, [2, 4]);
    assert!(page_contains(&doc, 2, "Page 3 of 7"));

    let outline = outline_of(&output.pdf);
    let titles: Vec<(&str, usize, usize)> = outline
        .iter()
        .map(|(t, p, l)| (t.as_str(), *p, *l))
        .collect();
    assert_eq!(
        titles,
        [
            ("Index", 1, 0),
            ("Pleadings", 2, 0),
            ("001. Claim Form", 2, 1),
            ("002. Defence", 4, 1),
        ]
    );

    let docx = output.docx.expect("docx exported");
    assert!(output.manifest.docx_exported);
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    assert!(xml.contains("Claim Form"));
    assert!(xml.contains("31/01/2024"));
}

#[tokio::test]
async fn test_roman_preface_restarts_content_numbering() {
    let set = sources(&[("a.pdf", plain_pdf(2, "Doc A"))]);
    let index = Index::from_csv("filename,title\na.pdf,Doc A\n", DateSetting::Hidden).unwrap();
    let coversheet = plain_pdf(1, "Cover");
    let config = pdfbundle::BundleConfig {
        roman_for_preface: true,
        bookmark_setting: BookmarkSetting::TabTitlePage,
        ..test_config()
    };

    let output = Bundler::new(config)
        .unwrap()
        .without_docx()
        .build(&index, &set, Some(&coversheet))
        .await
        .unwrap();

    assert_eq!(output.context.length_of_frontmatter(), 2);
    let doc = load(&output.pdf);
    assert_eq!(page_ids(&doc).len(), 4);
    assert!(page_contains(&doc, 2, "Page 1 of 2"));
    assert!(page_contains(&doc, 3, "Page 2 of 2"));

    let catalog = doc.catalog().unwrap();
    let labels = catalog.get(b"PageLabels").unwrap().as_dict().unwrap();
    let nums = labels.get(b"Nums").unwrap().as_array().unwrap();
    assert_eq!(nums.len(), 4);
    assert_eq!(nums[2], Object::Integer(2));

    let outline = outline_of(&output.pdf);
    assert_eq!(outline[1], ("001. Doc A [pg.1]".to_string(), 2, 0));
}

#[tokio::test]
async fn test_missing_document_consumes_no_tab() {
    let set = sources(&[
        ("a.pdf", plain_pdf(1, "Doc A")),
        ("c.pdf", plain_pdf(1, "Doc C")),
    ]);
    let index = Index::from_csv(
        "filename,title\na.pdf,Doc A\nmissing.pdf,Lost\nc.pdf,Doc C\n",
        DateSetting::Hidden,
    )
    .unwrap();

    let output = Bundler::new(test_config())
        .unwrap()
        .without_docx()
        .build(&index, &set, None)
        .await
        .unwrap();

    let skipped: Vec<&str> = output
        .manifest
        .skipped()
        .map(|e| e.source_key.as_str())
        .collect();
    assert_eq!(skipped, ["missing.pdf"]);
    assert!(output.docx.is_none());
    assert!(!output.manifest.docx_exported);

    let titles: Vec<String> = outline_of(&output.pdf).into_iter().map(|(t, ..)| t).collect();
    assert_eq!(titles, ["Index", "001. Doc A", "002. Doc C"]);
    assert_eq!(output.manifest.pages.total, 3);
}
