//! Office-document export of the table of contents.
//!
//! Writes a minimal WordprocessingML package: the parts Word needs to open
//! the file and a `document.xml` holding the header block and a 4-column
//! table. Styling is deliberately plain.

use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::config::{BundleConfig, CaseDetails, DateSetting};
use crate::error::{BundleError, Result};
use crate::toc::entry::TocEntry;

/// Turns TOC rows into an auxiliary document.
pub trait TocExporter: Send + Sync {
    /// Serialise `entries` with page numbers offset by `frontmatter_len`.
    fn export(&self, entries: &[TocEntry], frontmatter_len: usize) -> Result<Vec<u8>>;
}

/// `.docx` writer.
#[derive(Debug, Clone)]
pub struct DocxExporter {
    case: CaseDetails,
    confidential: bool,
    date_setting: DateSetting,
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Column widths in twentieths of a point.
const GRID: [u32; 4] = [740, 5560, 1820, 960];

impl DocxExporter {
    /// Exporter for a run's case metadata.
    pub fn new(config: &BundleConfig) -> Self {
        Self {
            case: config.case_details.clone(),
            confidential: config.confidential,
            date_setting: config.date_setting,
        }
    }

    fn document_xml(&self, entries: &[TocEntry], frontmatter_len: usize) -> String {
        let mut body = String::new();
        body.push_str(&paragraph(&self.case.claim_no, "right", Some(24), false, None));
        body.push_str(&paragraph(&self.case.case_name, "center", Some(28), true, None));
        if self.confidential {
            body.push_str(&paragraph("CONFIDENTIAL", "center", Some(32), true, Some("FF0000")));
        }
        body.push_str(&paragraph(
            &self.case.bundle_title.to_uppercase(),
            "center",
            Some(32),
            true,
            None,
        ));

        body.push_str("<w:tbl><w:tblPr><w:tblBorders>");
        for side in ["top", "left", "bottom", "right", "insideH", "insideV"] {
            body.push_str(&format!(r#"<w:{side} w:val="single" w:sz="4"/>"#));
        }
        body.push_str("</w:tblBorders></w:tblPr><w:tblGrid>");
        for width in GRID {
            body.push_str(&format!(r#"<w:gridCol w:w="{width}"/>"#));
        }
        body.push_str("</w:tblGrid>");

        let date_label = if self.date_setting.is_hidden() { "" } else { "Date" };
        body.push_str(&row(&["Tab", "Title", date_label, "Page"], true));
        for entry in entries {
            match entry {
                TocEntry::Section { title, .. } => body.push_str(&section_row(title)),
                TocEntry::Content {
                    tab,
                    title,
                    date,
                    dest_page,
                } => {
                    let page = (dest_page + frontmatter_len + 1).to_string();
                    body.push_str(&row(&[tab.as_str(), title.as_str(), date.as_str(), page.as_str()], false));
                }
            }
        }
        body.push_str("</w:tbl>");

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr></w:body></w:document>"#
        )
    }
}

impl TocExporter for DocxExporter {
    fn export(&self, entries: &[TocEntry], frontmatter_len: usize) -> Result<Vec<u8>> {
        let document = self.document_xml(entries, frontmatter_len);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (name, part) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", ROOT_RELS),
            ("word/document.xml", document.as_str()),
        ] {
            zip.start_file(name, options)
                .map_err(|e| BundleError::docx_export(format!("Failed to create {name}: {e}")))?;
            zip.write_all(part.as_bytes())
                .map_err(|e| BundleError::docx_export(format!("Failed to write {name}: {e}")))?;
        }
        let cursor = zip
            .finish()
            .map_err(|e| BundleError::docx_export(format!("Failed to finalise package: {e}")))?;
        Ok(cursor.into_inner())
    }
}

fn run(text: &str, size: Option<u32>, bold: bool, colour: Option<&str>) -> String {
    let mut props = String::new();
    if bold {
        props.push_str("<w:b/>");
    }
    if let Some(colour) = colour {
        props.push_str(&format!(r#"<w:color w:val="{colour}"/>"#));
    }
    if let Some(size) = size {
        props.push_str(&format!(r#"<w:sz w:val="{size}"/>"#));
    }
    format!(
        r#"<w:r><w:rPr>{props}</w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape(text)
    )
}

/// A paragraph; `size` is in half-points.
fn paragraph(text: &str, align: &str, size: Option<u32>, bold: bool, colour: Option<&str>) -> String {
    format!(
        r#"<w:p><w:pPr><w:jc w:val="{align}"/></w:pPr>{}</w:p>"#,
        run(text, size, bold, colour)
    )
}

fn cell(text: &str, width: u32, bold: bool, span: Option<usize>) -> String {
    let span = span.map_or(String::new(), |n| format!(r#"<w:gridSpan w:val="{n}"/>"#));
    let shading = if bold { r#"<w:shd w:val="clear" w:fill="D3D3D3"/>"# } else { "" };
    format!(
        r#"<w:tc><w:tcPr><w:tcW w:w="{width}" w:type="dxa"/>{span}{shading}</w:tcPr><w:p>{}</w:p></w:tc>"#,
        run(text, None, bold, None)
    )
}

fn row(cells: &[&str; 4], header: bool) -> String {
    let cells: String = cells
        .iter()
        .zip(GRID)
        .map(|(text, width)| cell(text, width, header, None))
        .collect();
    let props = if header { "<w:trPr><w:tblHeader/></w:trPr>" } else { "" };
    format!("<w:tr>{props}{cells}</w:tr>")
}

fn section_row(title: &str) -> String {
    format!(
        "<w:tr>{}</w:tr>",
        cell(title, GRID.iter().sum(), true, Some(GRID.len()))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toc::entry::tab_label;
    use std::io::Read;

    fn exporter(confidential: bool) -> DocxExporter {
        DocxExporter::new(&BundleConfig {
            case_details: CaseDetails {
                bundle_title: "Trial Bundle".into(),
                claim_no: "KB-1".into(),
                case_name: "Smith & Sons v Jones".into(),
            },
            confidential,
            ..Default::default()
        })
    }

    fn entries() -> Vec<TocEntry> {
        vec![
            TocEntry::Section {
                number: 1,
                title: "Pleadings".into(),
            },
            TocEntry::Content {
                tab: tab_label(1),
                title: "Claim <form>".into(),
                date: "01/02/2024".into(),
                dest_page: 0,
            },
        ]
    }

    fn document_part(bytes: Vec<u8>) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn test_package_contains_required_parts() {
        let bytes = exporter(false).export(&entries(), 2).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"[Content_Types].xml"));
        assert!(names.contains(&"_rels/.rels"));
        assert!(names.contains(&"word/document.xml"));
    }

    #[test]
    fn test_document_rows_and_escaping() {
        let xml = document_part(exporter(false).export(&entries(), 2).unwrap());
        assert!(xml.contains("TRIAL BUNDLE"));
        assert!(xml.contains("Smith &amp; Sons v Jones"));
        assert!(xml.contains("Claim &lt;form&gt;"));
        assert!(xml.contains(r#"<w:gridSpan w:val="4"/>"#));
        // displayed page = dest + frontmatter + 1
        assert!(xml.contains(">3</w:t>"));
        assert!(!xml.contains("CONFIDENTIAL"));
    }

    #[test]
    fn test_confidential_line_is_red() {
        let xml = document_part(exporter(true).export(&entries(), 0).unwrap());
        assert!(xml.contains(r#"<w:color w:val="FF0000"/>"#));
        assert!(xml.contains("CONFIDENTIAL"));
    }
}
