//! Output sinks: XLSX workbook, console tables, records CSV.

use crate::error::Pdf2TablesError;
use crate::pipeline::records::Record;
use crate::table::{Cell, DataTable};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default workbook file name.
pub const DEFAULT_WORKBOOK: &str = "output_tables.xlsx";

/// Where extracted tables go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// One sheet per table in an XLSX file.
    Workbook(PathBuf),
    /// Aligned text on stdout.
    Print,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Workbook(PathBuf::from(DEFAULT_WORKBOOK))
    }
}

/// Sheet name for the `i`-th table (0-indexed).
pub fn sheet_name(i: usize) -> String {
    format!("extracted_tab_{i}")
}

/// Write each table to its own sheet, header row in bold.
///
/// Returns the number of sheets written. With no tables nothing is written
/// and 0 is returned. The file appears atomically (temp file + rename).
pub fn write_workbook<'a, I>(tables: I, path: &Path) -> Result<usize, Pdf2TablesError>
where
    I: IntoIterator<Item = &'a DataTable>,
{
    let tables: Vec<&DataTable> = tables.into_iter().collect();
    if tables.is_empty() {
        warn!("No tables extracted; {} not written", path.display());
        return Ok(0);
    }

    let xlsx_err = |e: XlsxError| Pdf2TablesError::WorkbookWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };
    let io_err = |e: io::Error| Pdf2TablesError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    for (i, table) in tables.iter().enumerate() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(i)).map_err(xlsx_err)?;

        for (c, name) in table.columns.iter().enumerate() {
            sheet
                .write_string_with_format(0, c as u16, name, &bold)
                .map_err(xlsx_err)?;
        }
        for (r, row) in table.rows.iter().enumerate() {
            let r = r as u32 + 1;
            for (c, cell) in row.iter().enumerate() {
                let c = c as u16;
                match cell {
                    Cell::Empty => {}
                    Cell::Number(n) => {
                        sheet.write_number(r, c, *n).map_err(xlsx_err)?;
                    }
                    Cell::Text(s) => {
                        sheet.write_string(r, c, s).map_err(xlsx_err)?;
                    }
                }
            }
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp_path = path.with_extension("xlsx.tmp");
    workbook.save(&tmp_path).map_err(xlsx_err)?;
    std::fs::rename(&tmp_path, path).map_err(io_err)?;

    info!("Wrote {} sheet(s) to {}", tables.len(), path.display());
    Ok(tables.len())
}

/// Print tables one after another, separated by a blank line.
pub fn print_tables<'a, I, W>(tables: I, out: &mut W) -> io::Result<()>
where
    I: IntoIterator<Item = &'a DataTable>,
    W: Write,
{
    for (i, table) in tables.into_iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{table}")?;
    }
    Ok(())
}

const PREVIEW_CHARS: usize = 50;

fn preview(s: &str) -> String {
    let flat = s.replace('\n', "\\n");
    if flat.chars().count() > PREVIEW_CHARS {
        let head: String = flat.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{head}...")
    } else {
        flat
    }
}

/// Print the record frame: title, body preview and the HTML flag.
pub fn print_records<W: Write>(records: &[Record], out: &mut W) -> io::Result<()> {
    let frame = DataTable::new(
        vec!["title".into(), "body".into(), "contains_html".into()],
        records
            .iter()
            .map(|r| {
                vec![
                    Cell::Text(preview(&r.title)),
                    Cell::Text(preview(&r.body)),
                    Cell::Text(if r.contains_html { "True" } else { "False" }.into()),
                ]
            })
            .collect(),
    );
    writeln!(out, "{frame}")
}

/// Write records as CSV with a `title,body,contains_html` header.
pub fn write_records_csv(records: &[Record], path: &Path) -> Result<(), Pdf2TablesError> {
    let fail = |e: csv::Error| Pdf2TablesError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: io::Error::other(e),
    };
    let mut writer = csv::Writer::from_path(path).map_err(fail)?;
    for record in records {
        writer.serialize(record).map_err(fail)?;
    }
    writer.flush().map_err(|e| Pdf2TablesError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}
