//! Prompts for the vision model.
//!
//! Two prompts exist: one to caption an extracted figure and one to
//! partition a rendered page into typed elements. Callers can override the
//! caption prompt via [`crate::config::ExtractionConfig::caption_prompt`].

/// Default prompt sent alongside a figure to obtain its caption.
pub const DEFAULT_CAPTION_PROMPT: &str = r#"Describe this image from a document so that the description can stand in for the image in a text-only search index.

- If it is a chart or graph, state the chart type, the axes, the series and the key values or trends.
- If it is a diagram, describe the components and how they connect.
- If it is a photo or illustration, describe what it shows.
- Transcribe any legible text that matters for understanding the image.

Answer in plain prose, at most 150 words. Do not use Markdown. Do not start with "This image"."#;

/// Prompt for page layout inference in the `HiRes` strategy.
///
/// The model answers with a JSON array; see [`crate::pipeline::hires`] for
/// the accepted shape.
pub const LAYOUT_PROMPT: &str = r#"You are a document layout analyser. The image is one rendered PDF page.

Return every layout element on the page, in reading order, as a JSON array. Each element is an object:

{"type": TYPE, "text": TEXT, "html": HTML, "bbox": [LEFT, TOP, RIGHT, BOTTOM]}

TYPE is one of: "title", "narrative_text", "list_item", "table", "image", "header", "footer".
- "header" / "footer": running page headers, footers and page numbers.
- "title": section and document headings.
- "list_item": one bulleted or numbered entry.
- "table": any tabular data. Put the full table in HTML as <table> markup with <thead>/<th> for the header row and <td> cells; use colspan/rowspan where cells are merged. TEXT is the cell text joined by spaces.
- "image": figures, charts, photos. TEXT is "" (empty string).
- "narrative_text": everything else.

TEXT is the exact text of the element, preserving the original line breaks. HTML is "" for anything that is not a table.
BBOX is the element's bounding box in pixels of this image, origin at the top-left corner.

Output ONLY the JSON array. Do not wrap it in code fences. Do not add commentary."#;

/// Build the user text for a layout request.
pub fn layout_request(page_num: usize, width: u32, height: u32) -> String {
    format!("Page {page_num}. The image is {width}x{height} pixels.")
}
