//! Extraction entry points.
//!
//! [`extract`] runs the whole pipeline on a path or URL. Everything after
//! partitioning lives in [`process_elements`], which takes the elements and
//! a [`Captioner`] explicitly, so the text and table stages can be driven
//! without a PDF or a network connection.

use crate::config::ExtractionConfig;
use crate::element::{Chunk, Element};
use crate::error::Pdf2TablesError;
use crate::export;
use crate::output::{ExtractedTable, ExtractionOutput, ExtractionStats};
use crate::pipeline::caption::{self, Captioner, VisionCaptioner};
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::{chunk, clean, html, llm, partition, records};
use crate::progress::Stage;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Extract records and tables from a PDF file or URL.
///
/// # Errors
/// Any fatal [`Pdf2TablesError`]: unreadable input, a PDF pdfium cannot
/// open, an unconfigured provider when one is needed, a vision call that
/// keeps failing. A record whose HTML holds no table is not an error.
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2TablesError> {
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    extract_resolved(&resolved, config).await
}

/// Extract from PDF bytes held in memory.
///
/// # Example
/// ```rust,no_run
/// use pdf2tables::{extract_from_bytes, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("report.pdf")?;
/// let output = extract_from_bytes(&bytes, &ExtractionConfig::default()).await?;
/// println!("{} tables", output.tables.len());
/// # Ok(())
/// # }
/// ```
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2TablesError> {
    let resolved = input::from_bytes(bytes)?;
    extract_resolved(&resolved, config).await
}

/// Extract and write the tables to an XLSX workbook.
///
/// No file is written when no table was found.
pub async fn extract_to_workbook(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2TablesError> {
    let output = extract(input_str, config).await?;
    export::write_workbook(output.data_tables(), output_path.as_ref())?;
    Ok(output)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2TablesError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2TablesError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(extract(input_str, config))
}

async fn extract_resolved(
    resolved: &ResolvedInput,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2TablesError> {
    let total_start = Instant::now();
    let provider = llm::LazyProvider::new(config);

    if let Some(cb) = &config.progress_callback {
        cb.on_stage(Stage::Partition);
    }
    let partition_start = Instant::now();
    let elements = partition::partition(resolved, config, &provider).await?;
    let partition_duration_ms = partition_start.elapsed().as_millis() as u64;

    let captioner = VisionCaptioner::new(&provider, config);
    let mut output = process_elements(elements, &captioner, config).await?;

    output.stats.partition_duration_ms = partition_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    if !provider.is_resolved() {
        debug!("Vision provider was never needed");
    }
    info!(
        "Extraction complete: {} records, {} tables, {}ms total",
        output.stats.records, output.stats.tables, output.stats.total_duration_ms
    );
    Ok(output)
}

/// Run every stage after partitioning.
///
/// Headers and footers are dropped, text is normalised, large figures are
/// captioned, elements are chunked by title, table HTML is folded into the
/// preceding text, texts become records and the HTML bodies are parsed
/// into tables.
pub async fn process_elements<C: Captioner>(
    elements: Vec<Element>,
    captioner: &C,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2TablesError> {
    let progress = config.progress_callback.as_ref();
    let stage = |s: Stage| {
        if let Some(cb) = progress {
            cb.on_stage(s);
        }
    };
    let mut stats = ExtractionStats {
        elements: elements.len(),
        ..Default::default()
    };

    // ── Filter + normalise ───────────────────────────────────────────────
    stage(Stage::Clean);
    let mut elements = records::filter_furniture(elements);
    stats.furniture_dropped = stats.elements - elements.len();
    let targets = caption::caption_targets(
        &elements,
        config.min_image_width,
        config.min_image_height,
    );
    clean::normalize_elements(&mut elements, &config.clean);

    // ── Caption ──────────────────────────────────────────────────────────
    stage(Stage::Caption);
    let caption_start = Instant::now();
    if config.extract_images {
        stats.images_captioned =
            caption::caption_images(&mut elements, &targets, captioner, progress).await?;
    } else {
        debug!("Image extraction is off; captioning skipped");
    }
    stats.caption_duration_ms = caption_start.elapsed().as_millis() as u64;

    // ── Chunk + records ──────────────────────────────────────────────────
    stage(Stage::Chunk);
    let chunks = chunk::chunk_by_title(&elements, &config.chunking)?;
    stats.chunks = chunks.len();
    stats.table_chunks = chunks.iter().filter(|c| matches!(c, Chunk::Table(_))).count();

    let texts = records::assemble_texts(&chunks);
    stats.texts = texts.len();
    let (records, dropped) = records::build_records(&texts, config.record_policy);
    stats.records = records.len();
    stats.titled_dropped = dropped;
    info!(
        "{} chunks → {} texts → {} records",
        stats.chunks, stats.texts, stats.records
    );

    // ── Tables ───────────────────────────────────────────────────────────
    stage(Stage::Tables);
    let mut tables = Vec::new();
    for (record_index, record) in records.iter().enumerate() {
        if !record.contains_html {
            continue;
        }
        stats.html_records += 1;
        for (table_index, table) in html::tables_from_html(&record.body, config.table_mode)
            .into_iter()
            .enumerate()
        {
            tables.push(ExtractedTable {
                record_index,
                table_index,
                table,
            });
        }
    }
    stats.tables = tables.len();

    if let Some(cb) = progress {
        cb.on_extraction_complete(stats.records, stats.tables);
    }

    Ok(ExtractionOutput {
        records,
        tables,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RecordPolicy, TableMode};
    use crate::element::{Coordinates, ElementKind, LayoutSize};
    use std::path::Path;

    struct FixedCaptioner;

    impl Captioner for FixedCaptioner {
        async fn caption(&self, _image_path: &Path) -> Result<String, Pdf2TablesError> {
            Ok("A bar chart of sales by region.".into())
        }
    }

    const TABLE_HTML: &str =
        "<table><tr><th>Region</th><th>Sales</th></tr><tr><td>North</td><td>1,200</td></tr></table>";

    fn table() -> Element {
        Element::new(ElementKind::Table, "Region Sales North 1,200", 1).with_html(TABLE_HTML)
    }

    #[tokio::test]
    async fn untitled_text_with_table_becomes_a_table() {
        let els = vec![
            Element::new(ElementKind::Header, "ACME", 1),
            Element::new(ElementKind::NarrativeText, "Sales by region", 1),
            table(),
            Element::new(ElementKind::Footer, "1", 1),
        ];
        let out = process_elements(els, &FixedCaptioner, &ExtractionConfig::default())
            .await
            .unwrap();

        assert_eq!(out.stats.furniture_dropped, 2);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].title, "Unknown");
        assert!(out.records[0].contains_html);
        assert_eq!(out.tables.len(), 1);
        assert_eq!(out.tables[0].table.columns, vec!["Region", "Sales"]);
    }

    #[tokio::test]
    async fn titled_sections_follow_the_record_policy() {
        let els = vec![
            Element::new(ElementKind::Title, "Results", 1),
            Element::new(ElementKind::NarrativeText, "Sales by region", 1),
            table(),
        ];

        let default = process_elements(els.clone(), &FixedCaptioner, &ExtractionConfig::default())
            .await
            .unwrap();
        assert!(default.records.is_empty());
        assert_eq!(default.stats.titled_dropped, 1);
        assert!(default.tables.is_empty());

        let config = ExtractionConfig::builder()
            .record_policy(RecordPolicy::All)
            .build()
            .unwrap();
        let all = process_elements(els, &FixedCaptioner, &config).await.unwrap();
        assert_eq!(all.records[0].title, "Results");
        assert_eq!(all.tables.len(), 1);
    }

    #[tokio::test]
    async fn large_figures_are_captioned_into_text() {
        let layout = LayoutSize {
            width: 1700.0,
            height: 2200.0,
        };
        let figure = Element::new(ElementKind::Image, "", 1)
            .with_coordinates(Coordinates::from_box(100.0, 100.0, 500.0, 500.0, layout))
            .with_image_path("/tmp/figure-1-1.png");
        let out = process_elements(vec![figure], &FixedCaptioner, &ExtractionConfig::default())
            .await
            .unwrap();

        assert_eq!(out.stats.images_captioned, 1);
        assert_eq!(out.records[0].body, "A bar chart of sales by region.");
    }

    #[tokio::test]
    async fn table_mode_all_keeps_every_table() {
        let two = format!("{TABLE_HTML}{TABLE_HTML}");
        let els = vec![
            Element::new(ElementKind::NarrativeText, "Two tables", 1),
            Element::new(ElementKind::Table, "cells", 1).with_html(two),
        ];

        let first = process_elements(els.clone(), &FixedCaptioner, &ExtractionConfig::default())
            .await
            .unwrap();
        assert_eq!(first.tables.len(), 1);

        let config = ExtractionConfig::builder()
            .table_mode(TableMode::All)
            .build()
            .unwrap();
        let all = process_elements(els, &FixedCaptioner, &config).await.unwrap();
        assert_eq!(all.tables.len(), 2);
        assert_eq!(all.tables[1].table_index, 1);
    }

    #[tokio::test]
    async fn markup_without_table_is_not_fatal() {
        let els = vec![Element::new(
            ElementKind::NarrativeText,
            "Use the <b>bold</b> option",
            1,
        )];
        let out = process_elements(els, &FixedCaptioner, &ExtractionConfig::default())
            .await
            .unwrap();
        assert_eq!(out.stats.html_records, 1);
        assert!(out.tables.is_empty());
    }
}
