//! Layout of the table of contents as PDF pages.
//!
//! The renderer is a pure function of its inputs: identical entries and
//! options always paginate identically. The pipeline relies on that to run
//! a size probe with placeholder page numbers before the real pass.

use std::ops::Range;

use lopdf::{Dictionary, Document, Object, dictionary};

use crate::config::{BundleConfig, CaseDetails, DateColumn, DateSetting};
use crate::error::Result;
use crate::footer::FooterStyle;
use crate::footer::stamp::register_footer_font;
use crate::merge::pages::push_page;
use crate::text::fonts::{FontSet, Typeface};
use crate::text::{Canvas, Paint, wrap_text};
use crate::toc::entry::TocEntry;
use crate::utils::{A4, CM, new_document};

/// Page number shown on every content row during the size probe.
pub const PROBE_PLACEHOLDER: &str = "9999";

const MARGIN_X: f32 = 1.5 * CM;
const MARGIN_TOP: f32 = CM;
const MARGIN_BOTTOM: f32 = 1.5 * CM;
const CLAIM_ROW_HEIGHT: f32 = 1.5 * CM;
const CLAIM_RIGHT_PADDING: f32 = 50.0;
const HEADER_PAD_TOP: f32 = 8.0;
const HEADER_PAD_BOTTOM: f32 = 14.0;
const SPACER: f32 = CM;
const CELL_PAD_X: f32 = 6.0;
const CELL_PAD_Y: f32 = 3.0;
const HEAD_ROW_PAD_BOTTOM: f32 = 8.0;
const LEADING: f32 = 14.0;
const HEAD_ROW_FILL: Paint = Paint::Gray(0.663);
const SECTION_FILL: Paint = Paint::Gray(0.827);

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

/// Switches for one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocOptions {
    /// Prefix the bundle title with a red `CONFIDENTIAL`.
    pub confidential: bool,
    /// Date column mode.
    pub date_setting: DateSetting,
    /// Size probe: page numbers are [`PROBE_PLACEHOLDER`].
    pub probe: bool,
    /// Leave the TOC pages without footers.
    pub suppress_footer: bool,
}

/// Page arithmetic of a real pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TocNumbering {
    /// Added to each row's destination (plus one) for the page column.
    pub page_offset: usize,
    /// Added to the TOC's own page numbers in its footer.
    pub coversheet_len: usize,
    /// Total pages shown in `of N` footer styles.
    pub total_pages: usize,
}

/// A rendered TOC.
#[derive(Debug)]
pub struct RenderedToc {
    /// Standalone document holding only the TOC pages.
    pub document: Document,
    /// Its page count; the deliverable of the size probe.
    pub page_count: usize,
}

/// Column widths in points for Tab, Title, Date and Page.
pub fn column_widths(column: DateColumn) -> [f32; 4] {
    let cm = match column {
        DateColumn::Hidden => [1.3, 11.5, 0.0, 2.5],
        DateColumn::Short => [1.3, 9.8, 3.2, 1.7],
        DateColumn::Long => [1.3, 8.8, 4.2, 1.7],
    };
    cm.map(|w| w * CM)
}

/// Horizontal extent of the Tab column on every TOC page.
pub fn tab_column_extent(column: DateColumn) -> Range<f32> {
    let widths = column_widths(column);
    let x = table_x(&widths);
    x..x + widths[0]
}

/// Left edge of a table of `widths`, centred in the margins.
fn table_x(widths: &[f32; 4]) -> f32 {
    let table_width: f32 = widths.iter().sum();
    MARGIN_X + (A4.0 - 2.0 * MARGIN_X - table_width) / 2.0
}

/// Header row labels; the date label is empty when dates are hidden.
pub fn header_labels(date_setting: DateSetting) -> [&'static str; 4] {
    let date = if date_setting.is_hidden() { "" } else { "Date" };
    ["Tab", "Title", date, "Page"]
}

/// Renders tables of contents for one run's case and typography.
#[derive(Debug, Clone)]
pub struct TocRenderer {
    case: CaseDetails,
    fonts: FontSet,
    footer: FooterStyle,
}

impl TocRenderer {
    /// Renderer for a run's configuration.
    pub fn new(config: &BundleConfig) -> Self {
        Self {
            case: config.case_details.clone(),
            fonts: FontSet::for_index(&config.index_font),
            footer: FooterStyle::from_config(config),
        }
    }

    /// Lay out `entries` as A4 pages.
    ///
    /// # Errors
    ///
    /// Returns an error if a content stream cannot be encoded.
    pub fn render(
        &self,
        entries: &[TocEntry],
        options: &TocOptions,
        numbering: &TocNumbering,
    ) -> Result<RenderedToc> {
        let mut layout = Layout::new(self, options);
        layout.header_block();
        layout.table_head();
        for entry in entries {
            let row = self.row_cells(entry, options, numbering, &layout.widths);
            layout.row(&row);
        }
        let canvases = layout.finish();

        let (mut doc, _) = new_document();
        let mut fonts = Dictionary::new();
        fonts.set(REGULAR, Object::Reference(self.fonts.regular.add_to(&mut doc)));
        fonts.set(BOLD, Object::Reference(self.fonts.bold.add_to(&mut doc)));
        let footer_font = (!options.suppress_footer)
            .then(|| register_footer_font(&mut doc, &mut fonts, &self.footer));
        let resources = doc.add_object(dictionary! { "Font" => fonts });

        let page_count = canvases.len();
        for (i, mut canvas) in canvases.into_iter().enumerate() {
            if let Some(font) = footer_font {
                let text = self.footer.text(
                    i + 1,
                    numbering.coversheet_len,
                    numbering.total_pages,
                );
                self.footer.draw(&mut canvas, font, A4.0, &text);
            }
            push_page(&mut doc, A4, canvas.finish()?, resources)?;
        }

        log::debug!(
            "Rendered TOC: {} rows on {page_count} page(s){}",
            entries.len(),
            if options.probe { " (size probe)" } else { "" }
        );
        Ok(RenderedToc {
            document: doc,
            page_count,
        })
    }

    fn row_cells(
        &self,
        entry: &TocEntry,
        options: &TocOptions,
        numbering: &TocNumbering,
        widths: &[f32; 4],
    ) -> Row {
        let wrap = |text: &str, face: Typeface, width: f32| {
            wrap_text(text, width - 2.0 * CELL_PAD_X, |s| {
                face.text_width(s, self.fonts.size)
            })
        };
        match entry {
            TocEntry::Section { title, .. } => Row {
                kind: RowKind::Section,
                cells: [
                    Vec::new(),
                    wrap(title, self.fonts.bold, widths[1]),
                    Vec::new(),
                    Vec::new(),
                ],
            },
            TocEntry::Content {
                tab,
                title,
                date,
                dest_page,
            } => {
                let page = if options.probe {
                    PROBE_PLACEHOLDER.to_string()
                } else {
                    (dest_page + numbering.page_offset + 1).to_string()
                };
                let date = if options.date_setting.is_hidden() {
                    Vec::new()
                } else {
                    wrap(date, self.fonts.regular, widths[2])
                };
                Row {
                    kind: RowKind::Content,
                    cells: [
                        vec![tab.clone()],
                        wrap(title, self.fonts.regular, widths[1]),
                        date,
                        vec![page],
                    ],
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Content,
    Section,
}

/// Wrapped lines of the four cells of a body row.
#[derive(Debug)]
struct Row {
    kind: RowKind,
    cells: [Vec<String>; 4],
}

impl Row {
    fn height(&self) -> f32 {
        let lines = self.cells.iter().map(Vec::len).max().unwrap_or(0).max(1);
        2.0 * CELL_PAD_Y + lines as f32 * LEADING
    }
}

/// Cursor state while filling pages top to bottom.
struct Layout<'a> {
    renderer: &'a TocRenderer,
    options: &'a TocOptions,
    widths: [f32; 4],
    table_x: f32,
    pages: Vec<Canvas>,
    current: Canvas,
    y: f32,
    rows_on_page: usize,
}

impl<'a> Layout<'a> {
    fn new(renderer: &'a TocRenderer, options: &'a TocOptions) -> Self {
        let widths = column_widths(options.date_setting.column());
        Self {
            renderer,
            options,
            widths,
            table_x: table_x(&widths),
            pages: Vec::new(),
            current: Canvas::new(),
            y: A4.1 - MARGIN_TOP,
            rows_on_page: 0,
        }
    }

    fn size(&self) -> f32 {
        self.renderer.fonts.size
    }

    fn table_width(&self) -> f32 {
        self.widths.iter().sum()
    }

    fn column_x(&self, column: usize) -> f32 {
        self.table_x + self.widths[..column].iter().sum::<f32>()
    }

    /// Claim number, case name and bundle title, first page only.
    fn header_block(&mut self) {
        let renderer = self.renderer;
        let bold = renderer.fonts.bold;
        let size = self.size();
        let case = &renderer.case;

        let claim_right = A4.0 * 0.95 - CLAIM_RIGHT_PADDING;
        if !case.claim_no.is_empty() {
            let x = claim_right - bold.text_width(&case.claim_no, size);
            let baseline = self.y - CLAIM_ROW_HEIGHT + CELL_PAD_Y;
            self.current
                .text(BOLD, size, x, baseline, &case.claim_no, Paint::BLACK);
        }
        self.y -= CLAIM_ROW_HEIGHT;

        let middle_x0 = A4.0 / 8.0;
        let middle_x1 = A4.0 * 7.0 / 8.0;
        let middle_width = middle_x1 - middle_x0 - 2.0 * CELL_PAD_X;
        let centre = A4.0 / 2.0;

        let case_size = size + 2.0;
        let case_lines = wrap_text(&case.case_name, middle_width, |s| bold.text_width(s, case_size));
        self.y = self.centred_lines(&case_lines, case_size, centre, None);

        let title_size = size + 6.0;
        let title = if self.options.confidential {
            format!("CONFIDENTIAL {}", case.bundle_title)
        } else {
            case.bundle_title.clone()
        };
        let title_lines = wrap_text(&title, middle_width, |s| bold.text_width(s, title_size));
        self.current.hline(middle_x0, middle_x1, self.y, 1.0);
        let banner = self.options.confidential.then_some("CONFIDENTIAL");
        self.y = self.centred_lines(&title_lines, title_size, centre, banner);
        self.current.hline(middle_x0, middle_x1, self.y, 1.0);

        self.y -= SPACER;
    }

    /// Draw centred bold lines in a padded header row; returns the row bottom.
    fn centred_lines(
        &mut self,
        lines: &[String],
        size: f32,
        centre: f32,
        red_prefix: Option<&str>,
    ) -> f32 {
        let bold = self.renderer.fonts.bold;
        let step = LEADING.max(size * 1.2);
        let mut baseline = self.y - HEADER_PAD_TOP - size;
        for (i, line) in lines.iter().enumerate() {
            let x = centre - bold.text_width(line, size) / 2.0;
            let split = red_prefix
                .filter(|_| i == 0)
                .and_then(|prefix| line.strip_prefix(prefix).map(|rest| (prefix, rest)));
            match split {
                Some((prefix, rest)) => {
                    self.current.text(BOLD, size, x, baseline, prefix, Paint::RED);
                    let rest_x = x + bold.text_width(prefix, size);
                    self.current.text(BOLD, size, rest_x, baseline, rest, Paint::BLACK);
                }
                None => self.current.text(BOLD, size, x, baseline, line, Paint::BLACK),
            }
            baseline -= step;
        }
        self.y - HEADER_PAD_TOP - lines.len() as f32 * step - HEADER_PAD_BOTTOM
    }

    /// The repeated `Tab | Title | Date | Page` row.
    fn table_head(&mut self) {
        let bold = self.renderer.fonts.bold;
        let size = self.size();
        let height = CELL_PAD_Y + LEADING + HEAD_ROW_PAD_BOTTOM;
        let bottom = self.y - height;
        self.current
            .fill_rect(self.table_x, bottom, self.table_width(), height, HEAD_ROW_FILL);

        let baseline = self.y - CELL_PAD_Y - size;
        for (column, label) in header_labels(self.options.date_setting).iter().enumerate() {
            if label.is_empty() {
                continue;
            }
            let x = self.column_x(column) + (self.widths[column] - bold.text_width(label, size)) / 2.0;
            self.current.text(BOLD, size, x, baseline, label, Paint::BLACK);
        }
        self.current
            .hline(self.table_x, self.table_x + self.table_width(), bottom, 1.0);
        self.y = bottom;
    }

    fn row(&mut self, row: &Row) {
        let height = row.height();
        if self.y - height < MARGIN_BOTTOM && self.rows_on_page > 0 {
            self.new_page();
        }

        let bottom = self.y - height;
        if row.kind == RowKind::Section {
            self.current
                .fill_rect(self.table_x, bottom, self.table_width(), height, SECTION_FILL);
        }

        let size = self.size();
        let (face, font) = match row.kind {
            RowKind::Section => (self.renderer.fonts.bold, BOLD),
            RowKind::Content => (self.renderer.fonts.regular, REGULAR),
        };
        for (column, lines) in row.cells.iter().enumerate() {
            if self.widths[column] == 0.0 {
                continue;
            }
            let mut baseline = self.y - CELL_PAD_Y - size;
            for line in lines {
                let x = if column == 3 {
                    self.column_x(column) + self.widths[column]
                        - CELL_PAD_X
                        - face.text_width(line, size)
                } else {
                    self.column_x(column) + CELL_PAD_X
                };
                self.current.text(font, size, x, baseline, line, Paint::BLACK);
                baseline -= LEADING;
            }
        }

        self.current
            .hline(self.table_x, self.table_x + self.table_width(), bottom, 0.3);
        self.y = bottom;
        self.rows_on_page += 1;
    }

    fn new_page(&mut self) {
        let full = std::mem::take(&mut self.current);
        self.pages.push(full);
        self.y = A4.1 - MARGIN_TOP;
        self.rows_on_page = 0;
        self.table_head();
    }

    fn finish(mut self) -> Vec<Canvas> {
        self.pages.push(self.current);
        self.pages
    }
}
