//! Layout analysis for the `Fast` strategy.
//!
//! Works on the positioned characters of a PDF text layer and turns them
//! into typed [`Element`]s without any model:
//!
//! ```text
//! PdfChar[] ──▶ TextLine[] ──▶ header/footer bands
//!                          ├─▶ aligned-column runs ──▶ Table
//!                          └─▶ blocks ──▶ Title / ListItem / NarrativeText
//! ```
//!
//! All geometry here is in PDF points with a top-down y axis; element
//! coordinates are scaled to pixels of the page rendered at the partition
//! DPI.

use crate::element::{Coordinates, Element, ElementKind, LayoutSize};
use crate::pipeline::clean::starts_with_bullet;
use std::collections::HashMap;
use std::path::PathBuf;

/// Fraction of the page height at the top and bottom treated as running
/// header/footer space.
pub const FURNITURE_BAND: f32 = 0.06;

/// Characters on the same line differ in vertical centre by less than this
/// fraction of the glyph height.
const LINE_TOLERANCE: f32 = 0.4;

/// A horizontal gap wider than this fraction of the mean glyph width is a
/// word space.
const SPACE_THRESHOLD: f32 = 0.3;

/// A horizontal gap wider than this multiple of the mean glyph width is a
/// column gap.
const COLUMN_GAP: f32 = 2.0;

/// Column gaps of neighbouring rows must overlap within this many points.
const BOUNDARY_TOLERANCE: f32 = 5.0;

/// Minimum number of consecutive aligned rows to consider a table.
const MIN_TABLE_ROWS: usize = 3;

/// Lines separated by more than this multiple of the line height start a
/// new block.
const BLOCK_GAP: f32 = 1.5;

const TITLE_HEIGHT_RATIO: f32 = 1.2;
const TITLE_MAX_LINES: usize = 2;
const TITLE_MAX_CHARS: usize = 120;

/// A positioned glyph from the text layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfChar {
    pub ch: char,
    pub x: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl PdfChar {
    fn right(&self) -> f32 {
        self.x + self.width
    }

    fn bottom(&self) -> f32 {
        self.top + self.height
    }

    fn center_y(&self) -> f32 {
        self.top + self.height / 2.0
    }
}

/// An image object placed on the page, optionally already saved to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub path: Option<PathBuf>,
}

/// Everything the layout pass needs from one page.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// 1-indexed.
    pub page_number: usize,
    pub width: f32,
    pub height: f32,
    pub chars: Vec<PdfChar>,
    pub images: Vec<PageImage>,
}

/// A reconstructed line of text.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub text: String,
    pub chars: Vec<PdfChar>,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    /// Mean glyph height.
    pub height: f32,
}

impl TextLine {
    /// Build a line from characters sorted left to right.
    fn from_chars(chars: Vec<PdfChar>) -> Self {
        let n = chars.len().max(1) as f32;
        Self {
            text: join_chars(&chars),
            left: chars.iter().map(|c| c.x).fold(f32::INFINITY, f32::min),
            right: chars.iter().map(PdfChar::right).fold(f32::NEG_INFINITY, f32::max),
            top: chars.iter().map(|c| c.top).fold(f32::INFINITY, f32::min),
            bottom: chars.iter().map(PdfChar::bottom).fold(f32::NEG_INFINITY, f32::max),
            height: chars.iter().map(|c| c.height).sum::<f32>() / n,
            chars,
        }
    }
}

/// A run of aligned lines recognised as a table.
#[derive(Debug, Clone)]
pub struct TableRegion {
    /// Indices into the line slice passed to [`detect_tables`].
    pub start: usize,
    pub end: usize,
    pub rows: Vec<Vec<String>>,
}

/// Concatenate glyphs, inserting a space at every word gap.
fn join_chars(chars: &[PdfChar]) -> String {
    if chars.is_empty() {
        return String::new();
    }
    let avg_width = chars.iter().map(|c| c.width).sum::<f32>() / chars.len() as f32;
    let space_threshold = avg_width * SPACE_THRESHOLD;

    let mut text = String::with_capacity(chars.len());
    for (i, ch) in chars.iter().enumerate() {
        if i > 0 && ch.x - chars[i - 1].right() > space_threshold {
            text.push(' ');
        }
        text.push(ch.ch);
    }
    text
}

/// Group characters into lines, top to bottom.
///
/// Whitespace glyphs are dropped; spaces are re-inserted from gaps.
pub fn reconstruct_lines(chars: &[PdfChar]) -> Vec<TextLine> {
    let mut sorted: Vec<PdfChar> = chars
        .iter()
        .filter(|c| !c.ch.is_whitespace() && !c.ch.is_control())
        .cloned()
        .collect();
    if sorted.is_empty() {
        return Vec::new();
    }
    sorted.sort_by(|a, b| {
        a.center_y()
            .total_cmp(&b.center_y())
            .then(a.x.total_cmp(&b.x))
    });

    let mut groups: Vec<Vec<PdfChar>> = Vec::new();
    let mut current: Vec<PdfChar> = Vec::new();
    for ch in sorted {
        let same_line = current.last().is_some_and(|last: &PdfChar| {
            let tol = last.height.max(ch.height) * LINE_TOLERANCE;
            (ch.center_y() - last.center_y()).abs() < tol
        });
        if !same_line && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        groups.push(current);
    }

    let mut lines: Vec<TextLine> = groups
        .into_iter()
        .map(|mut g| {
            g.sort_by(|a, b| a.x.total_cmp(&b.x));
            TextLine::from_chars(g)
        })
        .collect();
    lines.sort_by(|a, b| a.top.total_cmp(&b.top));
    lines
}

/// Most common line height, weighted by glyph count.
///
/// Heights are bucketed to half a point. Returns 0 for no lines.
pub fn dominant_height(lines: &[TextLine]) -> f32 {
    let mut buckets: HashMap<i32, usize> = HashMap::new();
    for line in lines {
        *buckets.entry((line.height * 2.0).round() as i32).or_default() += line.chars.len();
    }
    buckets
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(bucket, _)| bucket as f32 / 2.0)
        .unwrap_or(0.0)
}

/// Column gaps of a line as `(gap_start, gap_end)` intervals.
fn column_gaps(line: &TextLine) -> Vec<(f32, f32)> {
    if line.chars.len() < 2 {
        return Vec::new();
    }
    let avg_width = line.chars.iter().map(|c| c.width).sum::<f32>() / line.chars.len() as f32;
    let threshold = avg_width * COLUMN_GAP;

    line.chars
        .windows(2)
        .filter(|w| w[1].x - w[0].right() > threshold)
        .map(|w| (w[0].right(), w[1].x))
        .collect()
}

/// Intersect two gap lists when every gap overlaps its counterpart.
fn align_gaps(run: &[(f32, f32)], next: &[(f32, f32)]) -> Option<Vec<(f32, f32)>> {
    if run.len() != next.len() || run.is_empty() {
        return None;
    }
    run.iter()
        .zip(next)
        .map(|(a, b)| {
            let start = a.0.max(b.0);
            let end = a.1.min(b.1);
            (start < end + BOUNDARY_TOLERANCE).then_some((start.min(end), start.max(end)))
        })
        .collect()
}

fn split_at_boundaries(line: &TextLine, boundaries: &[f32]) -> Vec<String> {
    let mut cells: Vec<Vec<PdfChar>> = vec![Vec::new(); boundaries.len() + 1];
    for ch in &line.chars {
        let col = boundaries
            .iter()
            .position(|&b| ch.x < b)
            .unwrap_or(boundaries.len());
        cells[col].push(ch.clone());
    }
    cells.iter().map(|c| join_chars(c)).collect()
}

/// Find runs of at least three lines whose column gaps line up.
pub fn detect_tables(lines: &[TextLine]) -> Vec<TableRegion> {
    let gaps: Vec<Vec<(f32, f32)>> = lines.iter().map(column_gaps).collect();
    let mut tables = Vec::new();

    let mut start = 0;
    while start < lines.len() {
        let mut run_gaps = gaps[start].clone();
        let mut end = start + 1;
        while end < lines.len() {
            match align_gaps(&run_gaps, &gaps[end]) {
                Some(narrowed) => {
                    run_gaps = narrowed;
                    end += 1;
                }
                None => break,
            }
        }

        if end - start >= MIN_TABLE_ROWS && !run_gaps.is_empty() {
            let boundaries: Vec<f32> = run_gaps.iter().map(|(a, b)| (a + b) / 2.0).collect();
            tables.push(TableRegion {
                start,
                end,
                rows: lines[start..end]
                    .iter()
                    .map(|l| split_at_boundaries(l, &boundaries))
                    .collect(),
            });
            start = end;
        } else {
            start += 1;
        }
    }
    tables
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// HTML for a detected table; the first row becomes the header.
pub fn table_html(rows: &[Vec<String>]) -> String {
    let mut html = String::from("<table>");
    if let Some((header, body)) = rows.split_first() {
        html.push_str("<thead><tr>");
        for cell in header {
            html.push_str(&format!("<th>{}</th>", escape_html(cell)));
        }
        html.push_str("</tr></thead><tbody>");
        for row in body {
            html.push_str("<tr>");
            for cell in row {
                html.push_str(&format!("<td>{}</td>", escape_html(cell)));
            }
            html.push_str("</tr>");
        }
        html.push_str("</tbody>");
    }
    html.push_str("</table>");
    html
}

/// Options for [`layout_page`].
#[derive(Debug, Clone, Copy)]
pub struct LayoutOptions {
    /// Dominant body-text height across the document, in points.
    pub body_height: f32,
    /// Pixels per point (DPI / 72).
    pub scale: f32,
    /// Look for tables at all.
    pub infer_tables: bool,
}

/// Turn one page into elements ordered top to bottom.
pub fn layout_page(page: &PageContent, options: &LayoutOptions) -> Vec<Element> {
    let s = options.scale;
    let layout = LayoutSize {
        width: page.width * s,
        height: page.height * s,
    };
    let coords = |l: f32, t: f32, r: f32, b: f32| Coordinates::from_box(l * s, t * s, r * s, b * s, layout);
    let mut placed: Vec<(f32, Element)> = Vec::new();

    let header_limit = page.height * FURNITURE_BAND;
    let footer_limit = page.height * (1.0 - FURNITURE_BAND);

    let mut body: Vec<TextLine> = Vec::new();
    for line in reconstruct_lines(&page.chars) {
        let kind = if line.top < header_limit {
            ElementKind::Header
        } else if line.bottom > footer_limit {
            ElementKind::Footer
        } else {
            body.push(line);
            continue;
        };
        let el = Element::new(kind, line.text.clone(), page.page_number)
            .with_coordinates(coords(line.left, line.top, line.right, line.bottom));
        placed.push((line.top, el));
    }

    let tables = if options.infer_tables {
        detect_tables(&body)
    } else {
        Vec::new()
    };
    let mut in_table = vec![false; body.len()];
    for t in &tables {
        in_table[t.start..t.end].iter_mut().for_each(|f| *f = true);
        let lines = &body[t.start..t.end];
        let left = lines.iter().map(|l| l.left).fold(f32::INFINITY, f32::min);
        let right = lines.iter().map(|l| l.right).fold(f32::NEG_INFINITY, f32::max);
        let text = t
            .rows
            .iter()
            .map(|r| r.iter().filter(|c| !c.is_empty()).cloned().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n");
        let el = Element::new(ElementKind::Table, text, page.page_number)
            .with_html(table_html(&t.rows))
            .with_coordinates(coords(left, lines[0].top, right, lines[lines.len() - 1].bottom));
        placed.push((lines[0].top, el));
    }

    for block in group_blocks(&body, &in_table) {
        let kind = classify_block(&block, options.body_height);
        let left = block.iter().map(|l| l.left).fold(f32::INFINITY, f32::min);
        let right = block.iter().map(|l| l.right).fold(f32::NEG_INFINITY, f32::max);
        let (top, bottom) = (block[0].top, block[block.len() - 1].bottom);
        let text = block.iter().map(|l| l.text.as_str()).collect::<Vec<_>>().join("\n");
        let el = Element::new(kind, text, page.page_number)
            .with_coordinates(coords(left, top, right, bottom));
        placed.push((top, el));
    }

    for img in &page.images {
        let mut el = Element::new(ElementKind::Image, "", page.page_number)
            .with_coordinates(coords(img.left, img.top, img.right, img.bottom));
        if let Some(path) = &img.path {
            el = el.with_image_path(path);
        }
        placed.push((img.top, el));
    }

    placed.sort_by(|a, b| a.0.total_cmp(&b.0));
    placed.into_iter().map(|(_, el)| el).collect()
}

/// Group consecutive non-table lines into blocks.
///
/// A new block starts after a table, at a vertical gap wider than
/// [`BLOCK_GAP`] line heights, at a bullet, and where the glyph height
/// changes by more than a fifth.
fn group_blocks<'a>(lines: &'a [TextLine], in_table: &[bool]) -> Vec<Vec<&'a TextLine>> {
    let mut blocks: Vec<Vec<&TextLine>> = Vec::new();
    let mut current: Vec<&TextLine> = Vec::new();
    let mut prev_idx: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        if in_table[i] {
            continue;
        }
        let breaks = match (prev_idx, current.last()) {
            (Some(p), Some(prev)) => {
                p + 1 != i
                    || line.top - prev.bottom > BLOCK_GAP * prev.height
                    || starts_with_bullet(&line.text)
                    || (line.height - prev.height).abs() > 0.2 * prev.height
            }
            _ => false,
        };
        if breaks {
            blocks.push(std::mem::take(&mut current));
        }
        current.push(line);
        prev_idx = Some(i);
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn classify_block(block: &[&TextLine], body_height: f32) -> ElementKind {
    let first = block[0];
    if starts_with_bullet(&first.text) {
        return ElementKind::ListItem;
    }
    let height = block.iter().map(|l| l.height).sum::<f32>() / block.len() as f32;
    let chars: usize = block.iter().map(|l| l.text.chars().count()).sum();
    if body_height > 0.0
        && height >= body_height * TITLE_HEIGHT_RATIO
        && block.len() <= TITLE_MAX_LINES
        && chars <= TITLE_MAX_CHARS
    {
        ElementKind::Title
    } else {
        ElementKind::NarrativeText
    }
}
