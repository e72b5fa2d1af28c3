//! Error types for the pdf2tables library.
//!
//! Failures come in two weights:
//!
//! * [`Pdf2TablesError`] stops the run. Input that cannot be opened, a
//!   wrong password, a vision provider with no credentials, a caption
//!   request that keeps failing or an unwritable workbook all end up here,
//!   returned from the `extract*` entry points.
//!
//! * [`TableParseError`] is local to one record: its HTML body held no
//!   usable table. Only [`crate::pipeline::html::html_to_tables`] returns
//!   it; the pipeline logs it and moves on with zero tables for that record.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort an extraction.
#[derive(Debug, Error)]
pub enum Pdf2TablesError {
    // ── Input ────────────────────────────────────────────────────────────
    /// No file at the given path.
    #[error("No such PDF: '{path}'")]
    FileNotFound { path: PathBuf },

    #[error("Cannot read '{path}': permission denied")]
    PermissionDenied { path: PathBuf },

    /// The URL could not be fetched (network error or non-2xx status).
    #[error("Download of '{url}' failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Download of '{url}' took longer than {secs}s (see --download-timeout)")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file does not start with `%PDF`.
    #[error("'{path}' is not a PDF (starts with {magic:?})")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Document ─────────────────────────────────────────────────────────
    /// pdfium could not parse the document structure.
    #[error("Cannot open '{path}', the PDF looks damaged: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    #[error("'{path}' is password protected; pass --password")]
    PasswordRequired { path: PathBuf },

    #[error("The password for '{path}' was rejected")]
    WrongPassword { path: PathBuf },

    /// pdfium failed to render a page to a bitmap.
    #[error("Could not render page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The partitioner could not turn a page into elements.
    #[error("Partitioning failed on page {page}: {detail}")]
    PartitionFailed { page: usize, detail: String },

    /// An extracted figure could not be written to the image directory.
    #[error("Failed to save extracted image '{path}': {detail}")]
    ImageSaveFailed { path: PathBuf, detail: String },

    /// A saved figure could not be read back for captioning.
    #[error("Failed to read extracted image '{path}': {detail}")]
    ImageReadFailed { path: PathBuf, detail: String },

    // ── Vision provider ──────────────────────────────────────────────────
    /// No credentials or model could be found for the provider.
    #[error("Vision provider '{provider}' is unavailable.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The vision model kept failing after all retries.
    #[error("Vision request failed: {message}")]
    LlmApiError { message: String },

    /// A single vision call exceeded the configured timeout.
    #[error("Vision call timed out after {secs}s ({what})")]
    ApiTimeout { what: String, secs: u64 },

    // ── Output ───────────────────────────────────────────────────────────
    #[error("Cannot write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The XLSX writer rejected the workbook.
    #[error("Failed to write workbook '{path}': {detail}")]
    WorkbookWriteFailed { path: PathBuf, detail: String },

    // ── Setup ────────────────────────────────────────────────────────────
    #[error("Bad configuration: {0}")]
    InvalidConfig(String),

    /// libpdfium could not be loaded.
    #[error(
        "libpdfium could not be loaded: {0}\n\n\
Set PDFIUM_LIB_PATH to the library file or to the directory that holds it,\n\
or install it system-wide. Builds for every platform are published at\n\
https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why an HTML body produced no table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableParseError {
    /// The markup contained no `<table>` element with at least one row.
    #[error("No tables found")]
    NoTables,

    /// A table was found but every row was empty.
    #[error("Table {index} has no cells")]
    EmptyTable { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_failed_display() {
        let e = Pdf2TablesError::PartitionFailed {
            page: 4,
            detail: "layout JSON was not an array".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 4"), "got: {msg}");
        assert!(msg.contains("not an array"));
    }

    #[test]
    fn timeout_names_the_call() {
        let e = Pdf2TablesError::ApiTimeout {
            what: "caption of /tmp/figure-1-1.png".into(),
            secs: 60,
        };
        assert!(e.to_string().contains("60s"));
        assert!(e.to_string().contains("figure-1-1"));
    }

    #[test]
    fn table_parse_error_display() {
        assert_eq!(TableParseError::NoTables.to_string(), "No tables found");
        assert!(TableParseError::EmptyTable { index: 2 }
            .to_string()
            .contains("Table 2"));
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = Pdf2TablesError::OutputWriteFailed {
            path: PathBuf::from("/nope/records.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing dir"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("records.csv"));
    }
}
