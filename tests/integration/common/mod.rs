//! Shared helpers for the integration tests.
//!
//! Test PDFs are generated with lopdf; there are no binary fixtures.

#![allow(dead_code)]

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use pdfbundle::config::{BundleConfig, DateSetting};
use pdfbundle::io::SourceSet;
use pdfbundle::text::extract_page_text;

/// A top-level outline item and its children as `(title, page)` pairs.
pub type OutlineItem<'a> = (&'a str, usize, &'a [(&'a str, usize)]);

/// Builds a small text PDF page by page.
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    pages: Vec<(ObjectId, ObjectId)>,
    links: Vec<(usize, usize)>,
    outline: Vec<(String, usize, Vec<(String, usize)>)>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        Self {
            doc,
            pages_id,
            font_id,
            pages: Vec::new(),
            links: Vec::new(),
            outline: Vec::new(),
        }
    }

    /// Add an A4 page showing `lines` top to bottom.
    pub fn page(mut self, lines: &[&str]) -> Self {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
        ];
        for (i, line) in lines.iter().enumerate() {
            operations.push(Operation::new(
                "Tm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    Object::Integer(72),
                    Object::Integer(760 - 20 * i as i64),
                ],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        }
        operations.push(Operation::new("ET", vec![]));
        let content = Content { operations }.encode().unwrap();
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = self.doc.new_object_id();
        self.pages.push((page_id, content_id));
        self
    }

    /// Add `count` pages each showing one line of `label`.
    pub fn pages(mut self, count: usize, label: &str) -> Self {
        for i in 0..count {
            let line = format!("{label} page {}", i + 1);
            self = self.page(&[line.as_str()]);
        }
        self
    }

    /// Link from page `from` to page `to` of this document.
    pub fn link(mut self, from: usize, to: usize) -> Self {
        self.links.push((from, to));
        self
    }

    /// Give the document an outline.
    pub fn outline(mut self, items: &[OutlineItem<'_>]) -> Self {
        self.outline = items
            .iter()
            .map(|(title, page, children)| {
                let children = children
                    .iter()
                    .map(|(title, page)| (title.to_string(), *page))
                    .collect();
                (title.to_string(), *page, children)
            })
            .collect();
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let page_ids: Vec<ObjectId> = self.pages.iter().map(|(id, _)| *id).collect();

        let mut annots: HashMap<usize, Vec<Object>> = HashMap::new();
        for &(from, to) in &self.links {
            let annot = self.doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Rect" => vec![
                    Object::Integer(72),
                    Object::Integer(700),
                    Object::Integer(300),
                    Object::Integer(715),
                ],
                "Dest" => vec![Object::Reference(page_ids[to]), Object::Name(b"Fit".to_vec())],
            });
            annots.entry(from).or_default().push(Object::Reference(annot));
        }

        for (i, &(page_id, content_id)) in self.pages.iter().enumerate() {
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => self.pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => self.font_id },
                },
            };
            if let Some(links) = annots.remove(&i) {
                page.set("Annots", links);
            }
            self.doc.objects.insert(page_id, Object::Dictionary(page));
        }

        let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_ids.len() as i64,
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        };
        if !self.outline.is_empty() {
            let outlines_id = write_outline(&mut self.doc, &self.outline, &page_ids);
            catalog.set("Outlines", outlines_id);
        }
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        self.doc.save_to(&mut out).unwrap();
        out
    }
}

fn write_outline(
    doc: &mut Document,
    items: &[(String, usize, Vec<(String, usize)>)],
    pages: &[ObjectId],
) -> ObjectId {
    let root = doc.new_object_id();
    let top = link_siblings(doc, root, items.iter().map(|(t, p, _)| (t.as_str(), *p)), pages);
    for ((_, _, children), &parent) in items.iter().zip(&top) {
        if children.is_empty() {
            continue;
        }
        let kids = link_siblings(doc, parent, children.iter().map(|(t, p)| (t.as_str(), *p)), pages);
        let dict = doc.get_dictionary_mut(parent).unwrap();
        dict.set("First", kids[0]);
        dict.set("Last", kids[kids.len() - 1]);
        dict.set("Count", kids.len() as i64);
    }
    doc.objects.insert(
        root,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => top[0],
            "Last" => top[top.len() - 1],
            "Count" => top.len() as i64,
        }),
    );
    root
}

fn link_siblings<'a>(
    doc: &mut Document,
    parent: ObjectId,
    items: impl Iterator<Item = (&'a str, usize)>,
    pages: &[ObjectId],
) -> Vec<ObjectId> {
    let items: Vec<(&str, usize)> = items.collect();
    let ids: Vec<ObjectId> = items.iter().map(|_| doc.new_object_id()).collect();
    for (i, (title, page)) in items.iter().enumerate() {
        let mut dict = dictionary! {
            "Title" => Object::string_literal(*title),
            "Parent" => parent,
            "Dest" => vec![Object::Reference(pages[*page]), Object::Name(b"Fit".to_vec())],
        };
        if i > 0 {
            dict.set("Prev", ids[i - 1]);
        }
        if i + 1 < ids.len() {
            dict.set("Next", ids[i + 1]);
        }
        doc.objects.insert(ids[i], Object::Dictionary(dict));
    }
    ids
}

/// `count` plain pages labelled `label`.
pub fn plain_pdf(count: usize, label: &str) -> Vec<u8> {
    PdfBuilder::new().pages(count, label).build()
}

/// A source set keyed by file name.
pub fn sources(items: &[(&str, Vec<u8>)]) -> SourceSet {
    let mut set = SourceSet::new();
    for (key, bytes) in items {
        set.insert(*key, bytes.clone());
    }
    set
}

/// Settings used by most tests: no date column, uncompressed output.
pub fn test_config() -> BundleConfig {
    BundleConfig {
        date_setting: DateSetting::Hidden,
        compress: false,
        jobs: Some(2),
        ..Default::default()
    }
}

pub fn load(bytes: &[u8]) -> Document {
    Document::load_mem(bytes).unwrap()
}

/// Page ids in page order.
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Text lines extracted from page `index`.
pub fn page_lines(doc: &Document, index: usize) -> Vec<String> {
    let id = page_ids(doc)[index];
    extract_page_text(doc, id)
        .unwrap()
        .lines
        .into_iter()
        .map(|line| line.text)
        .collect()
}

/// Whether any line of page `index` contains `needle`.
pub fn page_contains(doc: &Document, index: usize, needle: &str) -> bool {
    page_lines(doc, index).iter().any(|line| line.contains(needle))
}

/// Target page indices of the link annotations on page `index`.
pub fn link_targets(doc: &Document, index: usize) -> Vec<usize> {
    let ids = page_ids(doc);
    let positions: HashMap<ObjectId, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let page = doc.get_dictionary(ids[index]).unwrap();
    let annots = match page.get(b"Annots") {
        Ok(Object::Array(array)) => array.clone(),
        Ok(Object::Reference(id)) => doc.get_object(*id).unwrap().as_array().unwrap().clone(),
        _ => return Vec::new(),
    };
    annots
        .iter()
        .filter_map(|annot| {
            let dict = doc.get_dictionary(annot.as_reference().ok()?).ok()?;
            let dest = dict.get(b"Dest").ok()?.as_array().ok()?;
            positions.get(&dest.first()?.as_reference().ok()?).copied()
        })
        .collect()
}
