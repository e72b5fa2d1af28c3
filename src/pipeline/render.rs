//! Everything that touches pdfium: binding the library, rendering pages,
//! reading the text layer and pulling embedded figures out of a page.
//!
//! pdfium keeps thread-local state and is not safe to drive from async
//! code, so each public function moves its work into
//! `tokio::task::spawn_blocking` and binds its own `Pdfium` there.
//!
//! Page renders use one scale for the whole document: `dpi / 72`, reduced
//! when the longest page edge would exceed `max_rendered_pixels`. The same
//! scale maps text-layer points to element pixels in the `Fast` strategy,
//! so coordinates from both strategies live in the same pixel space.

use crate::config::ExtractionConfig;
use crate::error::Pdf2TablesError;
use crate::pipeline::layout::{PageContent, PageImage, PdfChar};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One rasterised page.
pub struct RenderedPage {
    /// 1-indexed.
    pub page_number: usize,
    pub image: DynamicImage,
}

/// Bind to libpdfium.
///
/// `PDFIUM_LIB_PATH` may name the library file or the directory holding
/// it; otherwise the working directory and then the system search path
/// are tried.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2TablesError> {
    let from_env = std::env::var("PDFIUM_LIB_PATH").ok().map(|p| {
        let path = PathBuf::from(p);
        if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        } else {
            path
        }
    });

    let bindings = match from_env {
        Some(path) => Pdfium::bind_to_library(&path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Pdf2TablesError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

fn open_error(path: &Path, password: Option<&str>, e: PdfiumError) -> Pdf2TablesError {
    let detail = format!("{e:?}");
    if detail.contains("Password") || detail.contains("password") {
        if password.is_some() {
            Pdf2TablesError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            Pdf2TablesError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        Pdf2TablesError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}

fn open<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, Pdf2TablesError> {
    pdfium
        .load_pdf_from_file(path, password)
        .map_err(|e| open_error(path, password, e))
}

/// Pixels per point for a page of `width` × `height` points.
pub fn render_scale(width: f32, height: f32, dpi: u32, max_pixels: u32) -> f32 {
    let scale = dpi as f32 / 72.0;
    let longest = width.max(height) * scale;
    if longest > max_pixels as f32 && longest > 0.0 {
        scale * max_pixels as f32 / longest
    } else {
        scale
    }
}

async fn blocking<T, F>(what: &str, f: F) -> Result<T, Pdf2TablesError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, Pdf2TablesError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Pdf2TablesError::Internal(format!("{what} task panicked: {e}")))?
}

/// Rasterise every page of the document.
pub async fn render_pages(
    pdf_path: &Path,
    config: &ExtractionConfig,
) -> Result<Vec<RenderedPage>, Pdf2TablesError> {
    let path = pdf_path.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();

    blocking("Render", move || {
        render_pages_blocking(&path, dpi, max_pixels, password.as_deref())
    })
    .await
}

fn render_pages_blocking(
    pdf_path: &Path,
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<Vec<RenderedPage>, Pdf2TablesError> {
    let pdfium = bind_pdfium()?;
    let document = open(&pdfium, pdf_path, password)?;
    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut results = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let scale = render_scale(page.width().value, page.height().value, dpi, max_pixels);
        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            Pdf2TablesError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            }
        })?;
        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        results.push(RenderedPage {
            page_number: idx + 1,
            image,
        });
    }
    Ok(results)
}

/// Whether any page carries extractable text.
pub async fn has_text_layer(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<bool, Pdf2TablesError> {
    let path = pdf_path.to_path_buf();
    let password = password.map(str::to_string);

    blocking("Text probe", move || {
        let pdfium = bind_pdfium()?;
        let document = open(&pdfium, &path, password.as_deref())?;
        for page in document.pages().iter() {
            let text = page.text().map_err(|e| Pdf2TablesError::CorruptPdf {
                path: path.clone(),
                detail: format!("{e:?}"),
            })?;
            if text.all().chars().any(|c| !c.is_whitespace()) {
                return Ok(true);
            }
        }
        Ok(false)
    })
    .await
}

/// Read positioned characters and image objects from every page.
///
/// With `image_dir` set, each embedded image is written there as
/// `figure-{page}-{n}.png` (both 1-indexed).
pub async fn extract_page_content(
    pdf_path: &Path,
    password: Option<&str>,
    image_dir: Option<PathBuf>,
) -> Result<Vec<PageContent>, Pdf2TablesError> {
    let path = pdf_path.to_path_buf();
    let password = password.map(str::to_string);

    blocking("Text extraction", move || {
        extract_page_content_blocking(&path, password.as_deref(), image_dir.as_deref())
    })
    .await
}

#[allow(deprecated)] // PdfRect field access deprecated in 0.8.28
fn extract_page_content_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    image_dir: Option<&Path>,
) -> Result<Vec<PageContent>, Pdf2TablesError> {
    let pdfium = bind_pdfium()?;
    let document = open(&pdfium, pdf_path, password)?;

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let page_number = idx + 1;
        let height = page.height().value;
        let mut content = PageContent {
            page_number,
            width: page.width().value,
            height,
            ..Default::default()
        };

        let text = page.text().map_err(|e| Pdf2TablesError::PartitionFailed {
            page: page_number,
            detail: format!("text layer: {e:?}"),
        })?;
        for ch in text.chars().iter() {
            if let (Some(c), Ok(rect)) = (ch.unicode_char(), ch.tight_bounds()) {
                content.chars.push(PdfChar {
                    ch: c,
                    x: rect.left.value,
                    top: height - rect.top.value,
                    width: (rect.right.value - rect.left.value).abs(),
                    height: (rect.top.value - rect.bottom.value).abs(),
                });
            }
        }

        for object in page.objects().iter() {
            let Some(image_object) = object.as_image_object() else {
                continue;
            };
            let Ok(bounds) = object.bounds() else {
                continue;
            };
            let mut figure = PageImage {
                left: bounds.left().value,
                top: height - bounds.top().value,
                right: bounds.right().value,
                bottom: height - bounds.bottom().value,
                path: None,
            };

            if let Some(dir) = image_dir {
                let n = content.images.len() + 1;
                match image_object.get_raw_image() {
                    Ok(img) => {
                        let out = dir.join(format!("figure-{page_number}-{n}.png"));
                        img.save(&out).map_err(|e| Pdf2TablesError::ImageSaveFailed {
                            path: out.clone(),
                            detail: e.to_string(),
                        })?;
                        debug!("Saved {}", out.display());
                        figure.path = Some(out);
                    }
                    Err(e) => warn!("Page {}: image {} not decodable: {:?}", page_number, n, e),
                }
            }
            content.images.push(figure);
        }

        debug!(
            "Page {}: {} chars, {} images",
            page_number,
            content.chars.len(),
            content.images.len()
        );
        pages.push(content);
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_follows_dpi() {
        let s = render_scale(612.0, 792.0, 144, 4000);
        assert!((s - 2.0).abs() < 1e-6);
    }

    #[test]
    fn scale_capped_by_longest_edge() {
        // Letter at 200 DPI would be 2200 px tall.
        let s = render_scale(612.0, 792.0, 200, 2000);
        assert!((792.0 * s - 2000.0).abs() < 0.01);
    }

    #[test]
    fn default_cap_keeps_letter_and_a4_at_full_dpi() {
        let cap = ExtractionConfig::default().max_rendered_pixels;
        let full = 200.0 / 72.0;
        assert!((render_scale(612.0, 792.0, 200, cap) - full).abs() < 1e-6);
        assert!((render_scale(595.0, 842.0, 200, cap) - full).abs() < 1e-6);
    }

    #[test]
    fn default_scale_lets_a_small_chart_pass_the_caption_gate() {
        use crate::element::{Coordinates, Element, ElementKind, LayoutSize};
        use crate::pipeline::caption::needs_caption;

        let config = ExtractionConfig::default();
        let s = render_scale(612.0, 792.0, config.dpi, config.max_rendered_pixels);
        let layout = LayoutSize {
            width: 612.0 * s,
            height: 792.0 * s,
        };
        // 95 × 100 pt is 263.9 × 277.8 px at 200 DPI.
        let (left, top) = (100.0 * s, 200.0 * s);
        let chart = Element::new(ElementKind::Image, "", 1).with_coordinates(Coordinates::from_box(
            left,
            top,
            left + 95.0 * s,
            top + 100.0 * s,
            layout,
        ));
        assert!(needs_caption(&chart, config.min_image_width, config.min_image_height));
    }

    #[test]
    fn password_errors_are_classified() {
        let path = Path::new("/tmp/locked.pdf");
        let err = open_error(path, None, PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError,
        ));
        assert!(matches!(err, Pdf2TablesError::PasswordRequired { .. }));

        let err = open_error(path, Some("guess"), PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError,
        ));
        assert!(matches!(err, Pdf2TablesError::WrongPassword { .. }));

        let err = open_error(path, None, PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::FormatError,
        ));
        assert!(matches!(err, Pdf2TablesError::CorruptPdf { .. }));
    }
}
