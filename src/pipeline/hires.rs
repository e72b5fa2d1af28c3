//! `HiRes` partitioning: a rendered page goes to the vision model, which
//! answers with the page layout as JSON.
//!
//! Accepted reply shape (fences and surrounding prose are tolerated):
//!
//! ```json
//! [{"type": "title", "text": "Results", "html": "", "bbox": [96, 120, 880, 170]}]
//! ```
//!
//! `bbox` is `[left, top, right, bottom]` in pixels of the rendered page.
//! Unknown types become narrative text; a missing bbox leaves the element
//! without coordinates, which keeps a figure out of captioning.

use crate::config::ExtractionConfig;
use crate::element::{Coordinates, Element, ElementKind, LayoutSize};
use crate::error::Pdf2TablesError;
use crate::pipeline::render::RenderedPage;
use crate::pipeline::{encode, llm, postprocess};
use crate::prompts::{layout_request, LAYOUT_PROMPT};
use edgequake_llm::{ChatMessage, LLMProvider};
use image::DynamicImage;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct LayoutItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    bbox: Option<[f32; 4]>,
}

/// Turn a layout reply into elements for one page.
pub fn parse_layout(
    reply: &str,
    page_number: usize,
    layout: LayoutSize,
) -> Result<Vec<Element>, Pdf2TablesError> {
    let json = postprocess::extract_json_array(reply).ok_or_else(|| {
        Pdf2TablesError::PartitionFailed {
            page: page_number,
            detail: "layout reply holds no JSON array".into(),
        }
    })?;
    let items: Vec<LayoutItem> =
        serde_json::from_str(&json).map_err(|e| Pdf2TablesError::PartitionFailed {
            page: page_number,
            detail: format!("layout JSON: {e}"),
        })?;

    Ok(items
        .into_iter()
        .map(|item| {
            let kind = ElementKind::from_label(&item.kind);
            let text = match kind {
                ElementKind::Image => String::new(),
                _ => item.text.unwrap_or_default(),
            };
            let mut el = Element::new(kind, text, page_number);
            if let Some([l, t, r, b]) = item.bbox {
                let clamp_x = |v: f32| v.clamp(0.0, layout.width);
                let clamp_y = |v: f32| v.clamp(0.0, layout.height);
                el = el.with_coordinates(Coordinates::from_box(
                    clamp_x(l.min(r)),
                    clamp_y(t.min(b)),
                    clamp_x(l.max(r)),
                    clamp_y(t.max(b)),
                    layout,
                ));
            }
            if kind == ElementKind::Table {
                if let Some(html) = item.html.filter(|h| !h.trim().is_empty()) {
                    el = el.with_html(html);
                }
            }
            el
        })
        .collect())
}

/// Crop every figure out of the page render and save it.
///
/// Figures are numbered per page in reading order: `figure-{page}-{n}.png`.
/// Figures without coordinates or with an empty box are left unsaved.
pub fn save_figures(
    elements: &mut [Element],
    page_image: &DynamicImage,
    dir: &Path,
) -> Result<usize, Pdf2TablesError> {
    let mut saved = 0;
    for (n, el) in elements
        .iter_mut()
        .filter(|e| e.kind == ElementKind::Image)
        .enumerate()
    {
        let Some(c) = &el.metadata.coordinates else {
            continue;
        };
        let (x, y) = c.points[0];
        let (w, h) = c.extent();
        let (x, y, w, h) = (x as u32, y as u32, w as u32, h as u32);
        let w = w.min(page_image.width().saturating_sub(x));
        let h = h.min(page_image.height().saturating_sub(y));
        if w == 0 || h == 0 {
            continue;
        }

        let out = dir.join(format!("figure-{}-{}.png", el.metadata.page_number, n + 1));
        page_image
            .crop_imm(x, y, w, h)
            .save(&out)
            .map_err(|e| Pdf2TablesError::ImageSaveFailed {
                path: out.clone(),
                detail: e.to_string(),
            })?;
        debug!("Saved {}", out.display());
        el.metadata.image_path = Some(out);
        saved += 1;
    }
    Ok(saved)
}

/// Partition one rendered page through the vision model.
pub async fn partition_page(
    provider: &Arc<dyn LLMProvider>,
    page: &RenderedPage,
    config: &ExtractionConfig,
    image_dir: Option<&Path>,
) -> Result<Vec<Element>, Pdf2TablesError> {
    let (width, height) = (page.image.width(), page.image.height());
    let image = encode::encode_image(&page.image).map_err(|e| Pdf2TablesError::PartitionFailed {
        page: page.page_number,
        detail: format!("PNG encode: {e}"),
    })?;

    let messages = vec![
        ChatMessage::system(LAYOUT_PROMPT),
        ChatMessage::user_with_images(layout_request(page.page_number, width, height), vec![image]),
    ];
    let what = format!("page {} layout", page.page_number);
    let reply = llm::complete_with_retry(provider, &messages, &what, config).await?;
    if reply.retries > 0 {
        warn!("{} needed {} retries", what, reply.retries);
    }

    let layout = LayoutSize {
        width: width as f32,
        height: height as f32,
    };
    let mut elements = parse_layout(&reply.content, page.page_number, layout)?;
    if let Some(dir) = image_dir {
        save_figures(&mut elements, &page.image, dir)?;
    }
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const LAYOUT: LayoutSize = LayoutSize {
        width: 1000.0,
        height: 1400.0,
    };

    #[test]
    fn parses_typed_elements() {
        let reply = r#"```json
[
  {"type": "header", "text": "ACME Corp", "html": "", "bbox": [0, 0, 300, 40]},
  {"type": "title", "text": "Results", "html": "", "bbox": [80, 100, 600, 150]},
  {"type": "table", "text": "A B 1 2", "html": "<table><tr><th>A</th><th>B</th></tr><tr><td>1</td><td>2</td></tr></table>", "bbox": [80, 200, 900, 400]},
  {"type": "figure", "text": "ignored", "bbox": [80, 450, 700, 900]},
  {"type": "caption", "text": "Figure 1"}
]
```"#;
        let els = parse_layout(reply, 3, LAYOUT).unwrap();
        let kinds: Vec<ElementKind> = els.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ElementKind::Header,
                ElementKind::Title,
                ElementKind::Table,
                ElementKind::Image,
                ElementKind::NarrativeText,
            ]
        );
        assert!(els.iter().all(|e| e.metadata.page_number == 3));
        assert!(els[2].metadata.text_as_html.as_deref().unwrap().starts_with("<table>"));
        assert_eq!(els[3].text, "");
        assert_eq!(els[3].metadata.coordinates.as_ref().unwrap().extent(), (620.0, 450.0));
        assert!(els[4].metadata.coordinates.is_none());
    }

    #[test]
    fn bbox_is_clamped_and_ordered() {
        let reply = r#"[{"type": "image", "bbox": [1200, 1500, -10, 100]}]"#;
        let els = parse_layout(reply, 1, LAYOUT).unwrap();
        let c = els[0].metadata.coordinates.as_ref().unwrap();
        assert_eq!(c.points[0], (0.0, 100.0));
        assert_eq!(c.points[2], (1000.0, 1400.0));
    }

    #[test]
    fn null_text_and_empty_html_tolerated() {
        let reply = r#"[{"type": "table", "text": null, "html": "  "}]"#;
        let els = parse_layout(reply, 1, LAYOUT).unwrap();
        assert_eq!(els[0].text, "");
        assert!(els[0].metadata.text_as_html.is_none());
    }

    #[test]
    fn non_json_reply_is_partition_failure() {
        let err = parse_layout("I cannot see a page.", 2, LAYOUT).unwrap_err();
        assert!(matches!(err, Pdf2TablesError::PartitionFailed { page: 2, .. }));

        let err = parse_layout("[{\"text\": \"no type\"}]", 2, LAYOUT).unwrap_err();
        assert!(matches!(err, Pdf2TablesError::PartitionFailed { .. }));
    }

    #[test]
    fn figures_are_cropped_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let page = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 80, Rgba([9, 9, 9, 255])));
        let layout = LayoutSize {
            width: 100.0,
            height: 80.0,
        };
        let mut els = vec![
            Element::new(ElementKind::NarrativeText, "text", 2),
            Element::new(ElementKind::Image, "", 2)
                .with_coordinates(Coordinates::from_box(10.0, 10.0, 60.0, 50.0, layout)),
            Element::new(ElementKind::Image, "", 2),
        ];

        let saved = save_figures(&mut els, &page, dir.path()).unwrap();
        assert_eq!(saved, 1);
        let path = els[1].metadata.image_path.clone().unwrap();
        assert_eq!(path, dir.path().join("figure-2-1.png"));
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (50, 40));
        assert!(els[2].metadata.image_path.is_none());
    }
}
