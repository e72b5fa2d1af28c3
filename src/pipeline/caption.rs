//! Figure captioning.
//!
//! Figures have no text of their own, so without a caption they vanish at
//! chunking time. Large figures (charts, diagrams) are sent to the vision
//! model and the answer becomes the element text; small ones (logos, icons)
//! are left empty.

use crate::config::ExtractionConfig;
use crate::element::{Element, ElementKind};
use crate::error::Pdf2TablesError;
use crate::pipeline::{encode, llm, postprocess};
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_CAPTION_PROMPT;
use edgequake_llm::ChatMessage;
use std::path::Path;
use tracing::{debug, info, warn};

/// Something that can describe an image file in words.
#[allow(async_fn_in_trait)]
pub trait Captioner {
    async fn caption(&self, image_path: &Path) -> Result<String, Pdf2TablesError>;
}

/// Whether an element is an uncaptioned figure at least
/// `min_width` × `min_height` pixels.
///
/// Size is measured between coordinate points 0 and 2; figures without
/// coordinates never qualify.
pub fn needs_caption(element: &Element, min_width: f32, min_height: f32) -> bool {
    if element.kind != ElementKind::Image || !element.text.is_empty() {
        return false;
    }
    match &element.metadata.coordinates {
        Some(c) => {
            let (w, h) = c.extent();
            w >= min_width && h >= min_height
        }
        None => false,
    }
}

/// Indices of the elements that [`needs_caption`] selects.
///
/// Taken before text normalisation, so a figure whose text was only
/// whitespace is not mistaken for an uncaptioned one after cleaning.
pub fn caption_targets(elements: &[Element], min_width: f32, min_height: f32) -> Vec<usize> {
    elements
        .iter()
        .enumerate()
        .filter(|(_, e)| needs_caption(e, min_width, min_height))
        .map(|(i, _)| i)
        .collect()
}

/// Caption the figures at `targets`, in document order.
///
/// Returns the number of captions written. A figure that passes the gate
/// but was never saved to disk is skipped with a warning; any captioner
/// error aborts the run.
pub async fn caption_images<C: Captioner>(
    elements: &mut [Element],
    targets: &[usize],
    captioner: &C,
    progress: Option<&ProgressCallback>,
) -> Result<usize, Pdf2TablesError> {
    let gated: Vec<usize> = targets.iter().copied().filter(|&i| i < elements.len()).collect();

    let total = gated.len();
    if let Some(cb) = progress {
        cb.on_captioning_start(total);
    }
    if total == 0 {
        return Ok(0);
    }
    info!("Captioning {} figure(s)", total);

    let mut captioned = 0;
    for (n, idx) in gated.into_iter().enumerate() {
        let element = &mut elements[idx];
        let Some(path) = element.metadata.image_path.clone() else {
            warn!(
                "Figure on page {} passed the size gate but was not saved; skipping",
                element.metadata.page_number
            );
            continue;
        };

        let caption = captioner.caption(&path).await?;
        debug!("{}: {} chars of caption", path.display(), caption.len());
        if let Some(cb) = progress {
            cb.on_image_captioned(n + 1, total, caption.len());
        }
        element.text = caption;
        captioned += 1;
    }
    Ok(captioned)
}

/// Captions figures through the configured vision provider.
pub struct VisionCaptioner<'a> {
    provider: &'a llm::LazyProvider<'a>,
    config: &'a ExtractionConfig,
}

impl<'a> VisionCaptioner<'a> {
    pub fn new(provider: &'a llm::LazyProvider<'a>, config: &'a ExtractionConfig) -> Self {
        Self { provider, config }
    }
}

impl Captioner for VisionCaptioner<'_> {
    async fn caption(&self, image_path: &Path) -> Result<String, Pdf2TablesError> {
        let image = encode::encode_file(image_path)?;
        let provider = self.provider.get().await?;

        let prompt = self
            .config
            .caption_prompt
            .as_deref()
            .unwrap_or(DEFAULT_CAPTION_PROMPT);
        let messages = vec![
            ChatMessage::system(prompt),
            ChatMessage::user_with_images("", vec![image]),
        ];

        let what = format!("caption of {}", image_path.display());
        let reply = llm::complete_with_retry(provider, &messages, &what, self.config).await?;
        Ok(postprocess::clean_caption(&reply.content))
    }
}
