//! # pdf2tables
//!
//! Pull text records and tables out of PDF documents.
//!
//! A PDF is partitioned into typed elements (titles, paragraphs, list
//! items, figures, tables, running headers and footers), either by a vision
//! model looking at each rendered page or from the embedded text layer.
//! Headers and footers are dropped, text is cleaned, large figures get a
//! caption from the vision model, and the elements are chunked by section
//! title. Each chunk becomes a `(title, body)` record; bodies that carry
//! HTML table markup are parsed into [`DataTable`]s, which can be written
//! to an XLSX workbook (one sheet per table) or printed.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Partition  vision layout (HiRes) or text layer (Fast)
//!  ├─ 3. Filter     drop running headers / footers
//!  ├─ 4. Clean      regroup broken paragraphs, collapse whitespace
//!  ├─ 5. Caption    describe figures ≥ 250 × 270 px
//!  ├─ 6. Chunk      group by title, tables kept whole
//!  ├─ 7. Records    fold table HTML into text, split title / body
//!  └─ 8. Tables     parse HTML bodies → DataTable → XLSX or stdout
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2tables::{extract_to_workbook, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ExtractionConfig::default();
//!     let output = extract_to_workbook("report.pdf", "output_tables.xlsx", &config).await?;
//!     eprintln!("{} tables from {} records", output.stats.tables, output.stats.records);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2tables` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2tables = { version = "0.1", default-features = false }
//! ```
//!
//! ## Without a vision model
//!
//! `PartitionStrategy::Fast` reads the text layer and finds tables from
//! column alignment. No provider is resolved unless a figure large enough
//! to caption turns up; pass `extract_images(false)` to rule that out.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod element;
pub mod error;
pub mod export;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ChunkingOptions, CleanOptions, ExtractionConfig, ExtractionConfigBuilder, PartitionStrategy,
    RecordPolicy, TableMode,
};
pub use element::{Chunk, Coordinates, Element, ElementKind, LayoutSize};
pub use error::{Pdf2TablesError, TableParseError};
pub use export::OutputMode;
pub use extract::{extract, extract_from_bytes, extract_sync, extract_to_workbook, process_elements};
pub use output::{ExtractedTable, ExtractionOutput, ExtractionStats};
pub use pipeline::caption::Captioner;
pub use pipeline::records::Record;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use table::{Cell, DataTable};
