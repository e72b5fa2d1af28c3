//! In-memory tables reconstructed from HTML table markup.
//!
//! [`DataTable`] is deliberately small: named columns and rows of typed
//! [`Cell`]s. It is what the workbook writer and the console printer consume.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

static RE_PLAIN_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?(\d+(\.\d*)?|\.\d+)([eE][-+]?\d+)?$").unwrap());

static RE_THOUSANDS_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?\d{1,3}(,\d{3})+(\.\d+)?$").unwrap());

impl Cell {
    /// Type a cell's text: numbers (optionally with `,` thousands
    /// separators) become [`Cell::Number`], blank text [`Cell::Empty`].
    pub fn infer(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return Cell::Empty;
        }
        let numeric = if RE_PLAIN_NUMBER.is_match(s) {
            s.parse::<f64>().ok()
        } else if RE_THOUSANDS_NUMBER.is_match(s) {
            s.replace(',', "").parse::<f64>().ok()
        } else {
            None
        };
        match numeric {
            Some(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Text(s.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => f.write_str("NaN"),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// A rectangular table with named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl DataTable {
    /// Build a table, padding short rows with [`Cell::Empty`] so every row
    /// has one cell per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(columns.len()))
            .max()
            .unwrap_or(0);
        let mut columns = columns;
        for i in columns.len()..width {
            columns.push(i.to_string());
        }
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, Cell::Empty);
                r
            })
            .collect();
        Self { columns, rows }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }
}

impl fmt::Display for DataTable {
    /// Right-aligned columns with a leading row index, the way a DataFrame
    /// prints.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return write!(
                f,
                "Empty DataFrame\nColumns: [{}]\nIndex: []",
                self.columns.join(", ")
            );
        }

        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| r.iter().map(ToString::to_string).collect())
            .collect();

        let index_width = (self.rows.len() - 1).to_string().len();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(c, name)| {
                rendered
                    .iter()
                    .map(|r| r[c].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:index_width$}", "")?;
        for (name, w) in self.columns.iter().zip(&widths) {
            write!(f, "  {name:>w$}")?;
        }
        for (i, row) in rendered.iter().enumerate() {
            write!(f, "\n{i:<index_width$}")?;
            for (cell, w) in row.iter().zip(&widths) {
                write!(f, "  {cell:>w$}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_numbers_and_text() {
        assert_eq!(Cell::infer("42"), Cell::Number(42.0));
        assert_eq!(Cell::infer(" -3.5 "), Cell::Number(-3.5));
        assert_eq!(Cell::infer("1,234,567"), Cell::Number(1_234_567.0));
        assert_eq!(Cell::infer("12,34"), Cell::Text("12,34".into()));
        assert_eq!(Cell::infer("Q3 2024"), Cell::Text("Q3 2024".into()));
        assert_eq!(Cell::infer("   "), Cell::Empty);
    }

    #[test]
    fn new_pads_ragged_rows() {
        let t = DataTable::new(
            vec!["A".into()],
            vec![vec![Cell::Number(1.0), Cell::Number(2.0)], vec![]],
        );
        assert_eq!(t.columns, vec!["A", "1"]);
        assert_eq!(t.rows[1], vec![Cell::Empty, Cell::Empty]);
    }

    #[test]
    fn display_aligns_like_a_dataframe() {
        let t = DataTable::new(
            vec!["Item".into(), "Qty".into()],
            vec![
                vec![Cell::Text("Bolts".into()), Cell::Number(120.0)],
                vec![Cell::Text("Nuts".into()), Cell::Empty],
            ],
        );
        let out = t.to_string();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "    Item  Qty");
        assert_eq!(lines[1], "0  Bolts  120");
        assert_eq!(lines[2], "1   Nuts  NaN");
    }

    #[test]
    fn display_empty_table() {
        let t = DataTable::new(vec!["A".into()], vec![]);
        assert!(t.to_string().starts_with("Empty DataFrame"));
    }
}
