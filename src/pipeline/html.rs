//! HTML detection and HTML-table parsing.
//!
//! Record bodies that carry table markup are parsed with `scraper` into
//! [`DataTable`]s. Merged cells are expanded so every row has one value per
//! column, header rows become column names and body cells are typed.

use crate::config::TableMode;
use crate::error::TableParseError;
use crate::table::{Cell, DataTable};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use tracing::{debug, warn};

static RE_HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*?>").unwrap());

static SEL_TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static SEL_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());

/// Upper bound on `colspan`/`rowspan` so hostile markup cannot blow up the grid.
const MAX_SPAN: usize = 1000;

/// True when the text contains anything shaped like a tag.
///
/// Deliberately loose: `a <b> c` and `x < y > z` both match.
pub fn contains_html(text: &str) -> bool {
    RE_HTML_TAG.is_match(text)
}

#[derive(Debug)]
struct RawCell {
    text: String,
    colspan: usize,
    rowspan: usize,
    is_header: bool,
}

#[derive(Debug)]
struct RawRow {
    cells: Vec<RawCell>,
    in_thead: bool,
}

/// Parse every table in `html`.
///
/// Returns [`TableParseError::NoTables`] when there is no `<table>` with at
/// least one row, and [`TableParseError::EmptyTable`] when the only tables
/// found had rows without cells.
pub fn html_to_tables(html: &str) -> Result<Vec<DataTable>, TableParseError> {
    let document = Html::parse_document(html);
    let mut tables = Vec::new();
    let mut first_empty = None;

    for (index, table) in document.select(&SEL_TABLE).enumerate() {
        let rows = raw_rows(table);
        if rows.is_empty() {
            continue;
        }
        if rows.iter().all(|r| r.cells.is_empty()) {
            first_empty.get_or_insert(index);
            continue;
        }
        tables.push(build_table(rows));
    }

    if tables.is_empty() {
        return Err(match first_empty {
            Some(index) => TableParseError::EmptyTable { index },
            None => TableParseError::NoTables,
        });
    }
    debug!("Parsed {} table(s) from {} bytes of HTML", tables.len(), html.len());
    Ok(tables)
}

/// Parse tables from a record body, logging instead of failing.
pub fn tables_from_html(html: &str, mode: TableMode) -> Vec<DataTable> {
    match html_to_tables(html) {
        Ok(mut tables) => {
            if mode == TableMode::First {
                tables.truncate(1);
            }
            tables
        }
        Err(e) => {
            warn!("No tables found or error in parsing: {e}");
            Vec::new()
        }
    }
}

/// Rows that belong to `table` itself, not to a table nested inside it.
fn raw_rows(table: ElementRef<'_>) -> Vec<RawRow> {
    table
        .select(&SEL_ROW)
        .filter(|tr| nearest_table(*tr).map(|t| t.id()) == Some(table.id()))
        .map(|tr| RawRow {
            in_thead: tr
                .ancestors()
                .filter_map(ElementRef::wrap)
                .take_while(|a| a.value().name() != "table")
                .any(|a| a.value().name() == "thead"),
            cells: tr
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "td" | "th"))
                .map(|c| RawCell {
                    text: cell_text(c),
                    colspan: span(c, "colspan"),
                    rowspan: span(c, "rowspan"),
                    is_header: c.value().name() == "th",
                })
                .collect(),
        })
        .collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    let raw: String = cell.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn nearest_table(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "table")
}

fn span(cell: ElementRef<'_>, attr: &str) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, MAX_SPAN)
}

/// Expand `colspan`/`rowspan` into a rectangular-ish grid of strings.
fn expand_spans(rows: &[RawRow]) -> Vec<Vec<String>> {
    // Per column: rows still covered by a rowspan from above, and its text.
    let mut carry: Vec<(usize, String)> = Vec::new();
    let mut grid = Vec::with_capacity(rows.len());

    for row in rows {
        let mut out: Vec<String> = Vec::new();
        let mut col = 0;

        for cell in &row.cells {
            while col < carry.len() && carry[col].0 > 0 {
                carry[col].0 -= 1;
                out.push(carry[col].1.clone());
                col += 1;
            }
            for _ in 0..cell.colspan {
                if col >= carry.len() {
                    carry.resize(col + 1, (0, String::new()));
                }
                carry[col] = (cell.rowspan - 1, cell.text.clone());
                out.push(cell.text.clone());
                col += 1;
            }
        }

        // Rowspans reaching past the last explicit cell of this row.
        for c in col..carry.len() {
            if carry[c].0 > 0 {
                out.resize(c, String::new());
                carry[c].0 -= 1;
                out.push(carry[c].1.clone());
            }
        }
        grid.push(out);
    }
    grid
}

fn build_table(rows: Vec<RawRow>) -> DataTable {
    let header_count = if rows.iter().any(|r| r.in_thead) {
        rows.iter().take_while(|r| r.in_thead).count()
    } else {
        rows.iter()
            .take_while(|r| !r.cells.is_empty() && r.cells.iter().all(|c| c.is_header))
            .count()
    };

    let grid = expand_spans(&rows);
    let (header, body) = grid.split_at(header_count.min(grid.len()));

    let columns = if header.is_empty() {
        Vec::new()
    } else {
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        dedupe_columns(
            (0..width)
                .map(|c| {
                    let mut parts: Vec<&str> = Vec::new();
                    for value in header.iter().filter_map(|r| r.get(c)) {
                        if !value.is_empty() && parts.last() != Some(&value.as_str()) {
                            parts.push(value);
                        }
                    }
                    if parts.is_empty() {
                        format!("Unnamed: {c}")
                    } else {
                        parts.join(" ")
                    }
                })
                .collect(),
        )
    };

    let body = body
        .iter()
        .filter(|r| !r.is_empty())
        .map(|r| r.iter().map(|s| Cell::infer(s)).collect())
        .collect();

    DataTable::new(columns, body)
}

/// Suffix repeated column names with `.1`, `.2`, ...
fn dedupe_columns(columns: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    columns
        .into_iter()
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            let out = if *count == 0 {
                name
            } else {
                format!("{name}.{count}")
            };
            *count += 1;
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_markup() {
        assert!(contains_html("Revenue\n<table><tr><td>1</td></tr></table>"));
        assert!(contains_html("a <b> c"));
        assert!(!contains_html("plain text, no tags"));
        assert!(!contains_html("<\n>"));
    }

    #[test]
    fn simple_table_with_th_header() {
        let tables = html_to_tables("<table><tr><th>A</th></tr><tr><td>1</td></tr></table>").unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns, vec!["A"]);
        assert_eq!(tables[0].rows, vec![vec![Cell::Number(1.0)]]);
    }

    #[test]
    fn thead_rows_are_header() {
        let html = "<table><thead><tr><td>Item</td><td>Qty</td></tr></thead>\
                    <tbody><tr><td>Bolts</td><td>1,200</td></tr><tr><td>Nuts</td><td></td></tr></tbody></table>";
        let t = &html_to_tables(html).unwrap()[0];
        assert_eq!(t.columns, vec!["Item", "Qty"]);
        assert_eq!(
            t.rows,
            vec![
                vec![Cell::Text("Bolts".into()), Cell::Number(1200.0)],
                vec![Cell::Text("Nuts".into()), Cell::Empty],
            ]
        );
    }

    #[test]
    fn no_header_gets_numeric_columns() {
        let t = &html_to_tables("<table><tr><td>x</td><td>y</td></tr></table>").unwrap()[0];
        assert_eq!(t.columns, vec!["0", "1"]);
        assert_eq!(t.height(), 1);
    }

    #[test]
    fn spans_are_expanded() {
        let html = "<table>\
            <tr><th rowspan=\"2\">Region</th><th colspan=\"2\">Sales</th></tr>\
            <tr><th>Q1</th><th>Q2</th></tr>\
            <tr><td rowspan=\"2\">North</td><td>10</td><td>12</td></tr>\
            <tr><td>11</td><td>13</td></tr>\
            </table>";
        let t = &html_to_tables(html).unwrap()[0];
        assert_eq!(t.columns, vec!["Region", "Sales Q1", "Sales Q2"]);
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[1][0], Cell::Text("North".into()));
        assert_eq!(t.rows[1][2], Cell::Number(13.0));
    }

    #[test]
    fn duplicate_column_names_are_suffixed() {
        let html = "<table><tr><th>A</th><th>A</th><th>A</th></tr><tr><td>1</td><td>2</td><td>3</td></tr></table>";
        let t = &html_to_tables(html).unwrap()[0];
        assert_eq!(t.columns, vec!["A", "A.1", "A.2"]);
    }

    #[test]
    fn nested_table_rows_stay_with_inner_table() {
        let html = "<table><tr><td>outer<table><tr><td>inner</td></tr></table></td></tr></table>";
        let tables = html_to_tables(html).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].height(), 1);
        assert_eq!(tables[1].rows, vec![vec![Cell::Text("inner".into())]]);
    }

    #[test]
    fn body_with_leading_text_still_parses() {
        let html = "Quarterly figures\n<table><tr><th>Q</th><th>Value</th></tr><tr><td>Q1</td><td>3.5</td></tr></table>";
        let t = &html_to_tables(html).unwrap()[0];
        assert_eq!(t.rows[0], vec![Cell::Text("Q1".into()), Cell::Number(3.5)]);
    }

    #[test]
    fn not_html_is_no_tables() {
        assert_eq!(html_to_tables("not html"), Err(TableParseError::NoTables));
        assert_eq!(
            html_to_tables("<table><tr></tr></table>"),
            Err(TableParseError::EmptyTable { index: 0 })
        );
        assert!(tables_from_html("not html", TableMode::First).is_empty());
    }

    #[test]
    fn table_mode_controls_how_many_are_kept() {
        let html = "<table><tr><td>1</td></tr></table><table><tr><td>2</td></tr></table>";
        assert_eq!(tables_from_html(html, TableMode::First).len(), 1);
        assert_eq!(tables_from_html(html, TableMode::All).len(), 2);
    }
}
