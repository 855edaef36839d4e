//! The bundle's outline (bookmarks) and page labels.
//!
//! The outline is first composed as an arena of nodes addressed by index,
//! then written to the document in one pass. Nothing is written while the
//! tree is still being shaped, so a bookmarking failure never leaves a
//! half-linked `/Outlines` behind.

pub mod labels;

pub use labels::write_page_labels;

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use serde::Serialize;

use crate::config::BookmarkSetting;
use crate::error::{BundleError, Result};
use crate::links::repair::fit_destination;
use crate::merge::BookmarkGroup;
use crate::toc::{TocEntry, next_content_dest};
use crate::utils::{encode_text_string, page_ids};

/// Title of the bookmark pointing at the first TOC page.
pub const INDEX_BOOKMARK: &str = "Index";

/// One outline item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    /// Displayed label.
    pub title: String,
    /// Absolute 0-based destination page.
    pub page: usize,
    /// Arena index of the parent; `None` for top-level items.
    pub parent: Option<usize>,
    /// Arena indices of the children, in order.
    pub children: Vec<usize>,
}

/// An outline tree stored as an arena.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    nodes: Vec<OutlineNode>,
    roots: Vec<usize>,
}

impl Outline {
    /// Empty outline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node under `parent` (or at the top level) and return its index.
    pub fn push(&mut self, title: impl Into<String>, page: usize, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(OutlineNode {
            title: title.into(),
            page,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent].children.push(index),
            None => self.roots.push(index),
        }
        index
    }

    /// Move an existing top-level node to the front.
    fn promote_to_first(&mut self, index: usize) {
        self.roots.retain(|&root| root != index);
        self.roots.insert(0, index);
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> &[OutlineNode] {
        &self.nodes
    }

    /// Node by arena index.
    pub fn node(&self, index: usize) -> Option<&OutlineNode> {
        self.nodes.get(index)
    }

    /// Top-level nodes in display order.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the outline has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn descendants(&self, index: usize) -> usize {
        self.nodes[index]
            .children
            .iter()
            .map(|&child| 1 + self.descendants(child))
            .sum()
    }
}

/// Outcome of composing the outline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutlineReport {
    /// Section and document bookmarks, plus the Index bookmark.
    pub bookmarks: usize,
    /// Bookmarks carried over from source outlines.
    pub sub_bookmarks: usize,
    /// Source bookmarks dropped because their parent level was missing.
    pub orphaned: usize,
}

/// Label of a document bookmark.
///
/// `displayed` is the page number shown in `[pg.N]` suffixes.
pub fn bookmark_label(
    setting: BookmarkSetting,
    tab: &str,
    title: &str,
    date: &str,
    displayed: usize,
) -> String {
    match setting {
        BookmarkSetting::TabTitle => format!("{tab} {title}"),
        BookmarkSetting::TabTitleDate => format!("{tab} {title} ({date})"),
        BookmarkSetting::TabTitlePage => format!("{tab} {title} [pg.{displayed}]"),
        BookmarkSetting::TabTitleDatePage => format!("{tab} {title} ({date}) [pg.{displayed}]"),
    }
}

/// Page arithmetic for composing the outline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutlinePlacement {
    /// Coversheet plus TOC length; added to every content destination.
    pub frontmatter_len: usize,
    /// Coversheet length; the Index bookmark points here.
    pub coversheet_len: usize,
    /// Added to destinations (plus one) for displayed page numbers.
    pub page_offset: usize,
}

/// Build the outline for `entries`.
///
/// Section rows become top-level nodes targeting the next document; a section
/// with no document after it targets the first page of the bundle. Document
/// rows nest under the open section. Each source's own outline is attached
/// under its document node. The Index bookmark comes first.
pub fn compose_outline(
    entries: &[TocEntry],
    groups: &[BookmarkGroup],
    setting: BookmarkSetting,
    placement: OutlinePlacement,
) -> (Outline, OutlineReport) {
    let mut outline = Outline::new();
    let mut report = OutlineReport::default();
    let mut entry_nodes: HashMap<usize, usize> = HashMap::new();
    let mut section: Option<usize> = None;

    for (position, entry) in entries.iter().enumerate() {
        match entry {
            TocEntry::Section { title, .. } => {
                let page = match next_content_dest(entries, position) {
                    Some(dest) => dest + placement.frontmatter_len,
                    None => {
                        log::warn!("Section '{title}' has no documents after it; bookmarking page 1");
                        0
                    }
                };
                section = Some(outline.push(title.clone(), page, None));
            }
            TocEntry::Content {
                tab,
                title,
                date,
                dest_page,
            } => {
                let displayed = dest_page + placement.page_offset + 1;
                let label = bookmark_label(setting, tab, title, date, displayed);
                let node = outline.push(label, dest_page + placement.frontmatter_len, section);
                entry_nodes.insert(position, node);
            }
        }
    }
    report.bookmarks = outline.len();

    for group in groups {
        let Some(&leaf) = entry_nodes.get(&group.entry) else {
            log::warn!("Sub-bookmarks for TOC row {} have no document bookmark", group.entry + 1);
            report.orphaned += group.bookmarks.len();
            continue;
        };
        // last_at_level[L] is the most recent node created at level L.
        let mut last_at_level: Vec<usize> = Vec::new();
        for bookmark in &group.bookmarks {
            let parent = match bookmark.level {
                0 => Some(leaf),
                level => last_at_level.get(level - 1).copied(),
            };
            let Some(parent) = parent else {
                log::warn!(
                    "Sub-bookmark '{}' at level {} has no parent; dropped",
                    bookmark.title,
                    bookmark.level
                );
                report.orphaned += 1;
                continue;
            };
            let page = group.content_start + bookmark.page_index + placement.frontmatter_len;
            let node = outline.push(bookmark.title.clone(), page, Some(parent));
            last_at_level.truncate(bookmark.level);
            last_at_level.push(node);
            report.sub_bookmarks += 1;
        }
    }

    let index = outline.push(INDEX_BOOKMARK, placement.coversheet_len, None);
    outline.promote_to_first(index);
    report.bookmarks += 1;

    (outline, report)
}

/// Write `outline` as the document's `/Outlines`, replacing any existing one.
///
/// # Errors
///
/// Returns [`BundleError::Bookmarking`] if a node targets a page the document
/// does not have.
pub fn write_outline(doc: &mut Document, outline: &Outline) -> Result<()> {
    let pages = page_ids(doc);
    let root_id = doc.new_object_id();
    let ids: Vec<ObjectId> = (0..outline.len()).map(|_| doc.new_object_id()).collect();

    for (index, node) in outline.nodes().iter().enumerate() {
        let target = pages.get(node.page).copied().ok_or_else(|| {
            BundleError::bookmarking(format!(
                "Bookmark '{}' targets page {} of a {} page bundle",
                node.title,
                node.page + 1,
                pages.len()
            ))
        })?;
        let siblings: &[usize] = match node.parent {
            Some(parent) => &outline.nodes()[parent].children,
            None => outline.roots(),
        };
        let mut item = dictionary! {
            "Title" => encode_text_string(&node.title),
            "Parent" => node.parent.map_or(root_id, |parent| ids[parent]),
            "Dest" => fit_destination(Object::Reference(target)),
        };
        link_siblings(&mut item, siblings, index, &ids);
        link_children(&mut item, &node.children, &ids);
        if !node.children.is_empty() {
            item.set("Count", outline.descendants(index) as i64);
        }
        doc.objects.insert(ids[index], Object::Dictionary(item));
    }

    let mut root = dictionary! {
        "Type" => "Outlines",
        "Count" => outline.len() as i64,
    };
    link_children(&mut root, outline.roots(), &ids);
    doc.objects.insert(root_id, Object::Dictionary(root));

    let catalog = doc.catalog_mut()?;
    catalog.set("Outlines", root_id);
    catalog.set("PageMode", "UseOutlines");
    log::debug!("Wrote outline with {} item(s)", outline.len());
    Ok(())
}

fn link_siblings(item: &mut Dictionary, siblings: &[usize], index: usize, ids: &[ObjectId]) {
    let Some(position) = siblings.iter().position(|&s| s == index) else {
        return;
    };
    if position > 0 {
        item.set("Prev", ids[siblings[position - 1]]);
    }
    if let Some(&next) = siblings.get(position + 1) {
        item.set("Next", ids[next]);
    }
}

fn link_children(item: &mut Dictionary, children: &[usize], ids: &[ObjectId]) {
    if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
        item.set("First", ids[first]);
        item.set("Last", ids[last]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::SubBookmark;
    use crate::merge::pages::push_page;
    use crate::merge::extract_bookmarks;
    use crate::toc::tab_label;
    use crate::utils::{A4, new_document};
    use rstest::rstest;

    fn content(n: usize, dest_page: usize) -> TocEntry {
        TocEntry::Content {
            tab: tab_label(n),
            title: format!("Doc {n}"),
            date: "01/02/2024".into(),
            dest_page,
        }
    }

    fn placement(frontmatter_len: usize) -> OutlinePlacement {
        OutlinePlacement {
            frontmatter_len,
            coversheet_len: 0,
            page_offset: frontmatter_len,
        }
    }

    fn titles(outline: &Outline, indices: &[usize]) -> Vec<String> {
        indices
            .iter()
            .map(|&i| outline.node(i).unwrap().title.clone())
            .collect()
    }

    #[rstest]
    #[case(BookmarkSetting::TabTitle, "001. Claim")]
    #[case(BookmarkSetting::TabTitleDate, "001. Claim (01/02/2024)")]
    #[case(BookmarkSetting::TabTitlePage, "001. Claim [pg.5]")]
    #[case(BookmarkSetting::TabTitleDatePage, "001. Claim (01/02/2024) [pg.5]")]
    fn test_bookmark_labels(#[case] setting: BookmarkSetting, #[case] expected: &str) {
        assert_eq!(bookmark_label(setting, "001.", "Claim", "01/02/2024", 5), expected);
    }

    #[test]
    fn test_index_first_then_documents() {
        let entries = vec![content(1, 0), content(2, 2), content(3, 5)];
        let (outline, report) = compose_outline(&entries, &[], BookmarkSetting::TabTitle, placement(1));
        let pages: Vec<usize> = outline.roots().iter().map(|&i| outline.node(i).unwrap().page).collect();
        assert_eq!(pages, [0, 1, 3, 6]);
        assert_eq!(titles(&outline, &outline.roots()[..1]), ["Index"]);
        assert_eq!(report.bookmarks, 4);
    }

    #[test]
    fn test_section_borrows_next_destination_and_nests_documents() {
        let entries = vec![
            TocEntry::Section {
                number: 1,
                title: "Orders".into(),
            },
            content(1, 7),
        ];
        let (outline, _) = compose_outline(&entries, &[], BookmarkSetting::TabTitle, placement(2));
        let section = outline.roots()[1];
        let node = outline.node(section).unwrap();
        assert_eq!(node.title, "Orders");
        assert_eq!(node.page, 9);
        assert_eq!(titles(&outline, &node.children), ["001. Doc 1"]);
    }

    #[test]
    fn test_trailing_section_targets_first_page() {
        let entries = vec![
            content(1, 0),
            TocEntry::Section {
                number: 1,
                title: "Late Evidence".into(),
            },
        ];
        let (outline, report) = compose_outline(&entries, &[], BookmarkSetting::TabTitle, placement(2));
        let roots = outline.roots();
        assert_eq!(titles(&outline, roots), ["Index", "001. Doc 1", "Late Evidence"]);
        let section = outline.node(roots[2]).unwrap();
        assert_eq!(section.page, 0);
        assert!(section.children.is_empty());
        assert_eq!(report.bookmarks, 3);
    }

    #[test]
    fn test_sub_bookmarks_rebased_and_nested() {
        let entries = vec![content(1, 0), content(2, 3)];
        let groups = vec![BookmarkGroup {
            entry: 1,
            content_start: 3,
            bookmarks: vec![
                SubBookmark { title: "Part A".into(), page_index: 0, level: 0 },
                SubBookmark { title: "A.1".into(), page_index: 1, level: 1 },
                SubBookmark { title: "Part B".into(), page_index: 2, level: 0 },
                SubBookmark { title: "B.1.a".into(), page_index: 2, level: 2 },
            ],
        }];
        let (outline, report) = compose_outline(&entries, &groups, BookmarkSetting::TabTitle, placement(1));

        let doc2 = outline.roots()[2];
        let children = &outline.node(doc2).unwrap().children;
        assert_eq!(titles(&outline, children), ["Part A", "Part B"]);
        let part_a = outline.node(children[0]).unwrap();
        assert_eq!(part_a.page, 4);
        assert_eq!(titles(&outline, &part_a.children), ["A.1"]);
        assert_eq!(outline.node(part_a.children[0]).unwrap().page, 5);
        assert_eq!(report.sub_bookmarks, 3);
        assert_eq!(report.orphaned, 1);
    }

    #[test]
    fn test_written_outline_reads_back() {
        let (mut doc, _) = new_document();
        let resources = doc.add_object(dictionary! {});
        for _ in 0..4 {
            push_page(&mut doc, A4, b"q Q".to_vec(), resources).unwrap();
        }
        let entries = vec![content(1, 0), content(2, 2)];
        let (outline, _) = compose_outline(&entries, &[], BookmarkSetting::TabTitle, placement(1));
        write_outline(&mut doc, &outline).unwrap();

        let extracted = extract_bookmarks(&doc);
        let read: Vec<(String, usize)> = extracted
            .bookmarks
            .into_iter()
            .map(|b| (b.title, b.page_index))
            .collect();
        assert_eq!(
            read,
            [
                ("Index".to_string(), 0),
                ("001. Doc 1".to_string(), 1),
                ("002. Doc 2".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_write_rejects_out_of_range_destination() {
        let (mut doc, _) = new_document();
        let mut outline = Outline::new();
        outline.push("Nowhere", 3, None);
        let err = write_outline(&mut doc, &outline).unwrap_err();
        assert!(matches!(err, BundleError::Bookmarking { .. }));
    }
}
