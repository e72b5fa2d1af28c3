//! Result types returned by the extraction entry points.

use crate::pipeline::records::Record;
use crate::table::DataTable;
use serde::{Deserialize, Serialize};

/// A table recovered from one record's HTML body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTable {
    /// Position of the source record in [`ExtractionOutput::records`].
    pub record_index: usize,
    /// Position of the table within that record's HTML.
    pub table_index: usize,
    pub table: DataTable,
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Elements returned by the partitioner.
    pub elements: usize,
    /// Running headers and footers dropped.
    pub furniture_dropped: usize,
    /// Figures that received a caption.
    pub images_captioned: usize,
    pub chunks: usize,
    pub table_chunks: usize,
    /// Texts after table HTML was folded in.
    pub texts: usize,
    pub records: usize,
    /// Texts that split into title and body but were not recorded.
    pub titled_dropped: usize,
    /// Records whose body holds markup.
    pub html_records: usize,
    pub tables: usize,
    pub partition_duration_ms: u64,
    pub caption_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything one extraction produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub records: Vec<Record>,
    /// Tables in record order, then in document order within a record.
    pub tables: Vec<ExtractedTable>,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// The tables alone, in sheet order.
    pub fn data_tables(&self) -> impl Iterator<Item = &DataTable> {
        self.tables.iter().map(|t| &t.table)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
