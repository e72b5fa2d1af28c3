//! Strategy dispatch: PDF file in, ordered elements out.

use crate::config::{ExtractionConfig, PartitionStrategy};
use crate::element::{Element, ElementKind};
use crate::error::Pdf2TablesError;
use crate::pipeline::layout::{self, LayoutOptions};
use crate::pipeline::input::ResolvedInput;
use crate::pipeline::{hires, llm, render};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Partition the resolved PDF into elements in reading order.
///
/// Figures are saved to `config.image_output_dir` when `extract_images` is
/// on. Table inference is skipped when the file extension is listed in
/// `skip_infer_table_types`; tables found anyway are kept as plain text.
pub async fn partition(
    input: &ResolvedInput,
    config: &ExtractionConfig,
    provider: &llm::LazyProvider<'_>,
) -> Result<Vec<Element>, Pdf2TablesError> {
    let path = input.path();
    let extension = input.extension();
    let infer_tables = !config.skips_tables_for(&extension);
    if !infer_tables {
        info!("Table inference skipped for .{} input", extension);
    }

    let image_dir = prepare_image_dir(config)?;

    let strategy = match config.strategy {
        PartitionStrategy::Auto => {
            if render::has_text_layer(path, config.password.as_deref()).await? {
                PartitionStrategy::Fast
            } else {
                PartitionStrategy::HiRes
            }
        }
        s => s,
    };
    info!("Partitioning {} with {:?} strategy", path.display(), strategy);

    let mut elements = match strategy {
        PartitionStrategy::HiRes => partition_hires(path, config, provider, image_dir).await?,
        _ => partition_fast(path, config, image_dir, infer_tables).await?,
    };

    if !infer_tables {
        demote_tables(&mut elements);
    }
    info!("Partitioned into {} elements", elements.len());
    Ok(elements)
}

fn prepare_image_dir(config: &ExtractionConfig) -> Result<Option<PathBuf>, Pdf2TablesError> {
    if !config.extract_images {
        return Ok(None);
    }
    let dir = &config.image_output_dir;
    std::fs::create_dir_all(dir).map_err(|e| Pdf2TablesError::OutputWriteFailed {
        path: dir.clone(),
        source: e,
    })?;
    Ok(Some(dir.clone()))
}

async fn partition_fast(
    path: &Path,
    config: &ExtractionConfig,
    image_dir: Option<PathBuf>,
    infer_tables: bool,
) -> Result<Vec<Element>, Pdf2TablesError> {
    let pages = render::extract_page_content(path, config.password.as_deref(), image_dir).await?;

    let all_lines: Vec<layout::TextLine> = pages
        .iter()
        .flat_map(|p| layout::reconstruct_lines(&p.chars))
        .collect();
    let body_height = layout::dominant_height(&all_lines);
    debug!("Dominant body text height: {:.1}pt", body_height);

    let total = pages.len();
    let mut elements = Vec::new();
    for page in &pages {
        let options = LayoutOptions {
            body_height,
            scale: render::render_scale(page.width, page.height, config.dpi, config.max_rendered_pixels),
            infer_tables,
        };
        let page_elements = layout::layout_page(page, &options);
        if let Some(cb) = &config.progress_callback {
            cb.on_page_partitioned(page.page_number, total, page_elements.len());
        }
        elements.extend(page_elements);
    }
    Ok(elements)
}

async fn partition_hires(
    path: &Path,
    config: &ExtractionConfig,
    provider: &llm::LazyProvider<'_>,
    image_dir: Option<PathBuf>,
) -> Result<Vec<Element>, Pdf2TablesError> {
    let provider = provider.get().await?;
    let pages = render::render_pages(path, config).await?;

    let total = pages.len();
    let mut elements = Vec::new();
    for page in &pages {
        let page_elements =
            hires::partition_page(provider, page, config, image_dir.as_deref()).await?;
        debug!("Page {}: {} elements", page.page_number, page_elements.len());
        if let Some(cb) = &config.progress_callback {
            cb.on_page_partitioned(page.page_number, total, page_elements.len());
        }
        elements.extend(page_elements);
    }
    Ok(elements)
}

/// Keep table text but drop the table role and its HTML.
fn demote_tables(elements: &mut [Element]) {
    for el in elements.iter_mut().filter(|e| e.kind == ElementKind::Table) {
        el.kind = ElementKind::NarrativeText;
        el.metadata.text_as_html = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demoted_tables_lose_html() {
        let mut els = vec![
            Element::new(ElementKind::Table, "a b", 1).with_html("<table></table>"),
            Element::new(ElementKind::Title, "T", 1),
        ];
        demote_tables(&mut els);
        assert_eq!(els[0].kind, ElementKind::NarrativeText);
        assert!(els[0].metadata.text_as_html.is_none());
        assert_eq!(els[1].kind, ElementKind::Title);
    }

    #[test]
    fn image_dir_created_only_when_extracting() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("figures");

        let off = ExtractionConfig::builder()
            .extract_images(false)
            .image_output_dir(&dir)
            .build()
            .unwrap();
        assert!(prepare_image_dir(&off).unwrap().is_none());
        assert!(!dir.exists());

        let on = ExtractionConfig::builder().image_output_dir(&dir).build().unwrap();
        assert_eq!(prepare_image_dir(&on).unwrap(), Some(dir.clone()));
        assert!(dir.is_dir());
    }
}
