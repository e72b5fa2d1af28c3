//! Title-based chunking.
//!
//! Elements are grouped into sections that start at each `Title` (and at
//! each page break when sections may not span pages). Inside a section,
//! text elements are packed into pre-chunks bounded by the soft and hard
//! character limits; tables get a chunk of their own unless they came
//! without HTML, in which case their text is packed like any other. Small
//! pre-chunks are then optionally combined, and anything still longer than
//! the hard limit is split on a line or word boundary.

use crate::config::ChunkingOptions;
use crate::element::{Chunk, CompositeChunk, Element, ElementKind, TableChunk};
use crate::error::Pdf2TablesError;
use tracing::debug;

const TEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug)]
struct TextPreChunk {
    parts: Vec<String>,
    page_number: usize,
    len: usize,
}

impl TextPreChunk {
    fn new(text: &str, page_number: usize) -> Self {
        Self {
            parts: vec![text.to_string()],
            page_number,
            len: text.chars().count(),
        }
    }

    fn len_with(&self, extra: usize) -> usize {
        self.len + TEXT_SEPARATOR.len() + extra
    }

    fn push(&mut self, text: &str) {
        self.len = self.len_with(text.chars().count());
        self.parts.push(text.to_string());
    }

    fn absorb(&mut self, other: TextPreChunk) {
        self.len = self.len_with(other.len);
        self.parts.extend(other.parts);
    }
}

#[derive(Debug)]
enum PreChunk {
    Text(TextPreChunk),
    Table(TableChunk),
}

/// Group elements into chunks by section title.
///
/// Elements with empty text are skipped. Returns `InvalidConfig` when the
/// limits are inconsistent.
pub fn chunk_by_title(
    elements: &[Element],
    options: &ChunkingOptions,
) -> Result<Vec<Chunk>, Pdf2TablesError> {
    options.validate()?;

    let pre_chunks = build_pre_chunks(elements, options);
    let pre_chunks = combine_pre_chunks(pre_chunks, options);

    let mut chunks = Vec::with_capacity(pre_chunks.len());
    for pre in pre_chunks {
        match pre {
            PreChunk::Table(t) => chunks.push(Chunk::Table(t)),
            PreChunk::Text(t) => {
                let text = t.parts.join(TEXT_SEPARATOR);
                for piece in split_text(&text, options.max_characters) {
                    chunks.push(Chunk::Composite(CompositeChunk {
                        text: piece,
                        page_number: t.page_number,
                    }));
                }
            }
        }
    }

    debug!("Chunked {} elements into {} chunks", elements.len(), chunks.len());
    Ok(chunks)
}

fn build_pre_chunks(elements: &[Element], options: &ChunkingOptions) -> Vec<PreChunk> {
    let hard_max = options.max_characters;
    let soft_max = options.soft_max();

    let mut pre_chunks = Vec::new();
    let mut current: Option<TextPreChunk> = None;
    let mut last_page: Option<usize> = None;

    for element in elements {
        let page = element.metadata.page_number;
        let html = element.metadata.text_as_html.as_deref().unwrap_or("");
        if element.text.is_empty() && html.is_empty() {
            continue;
        }

        let page_break = last_page.is_some_and(|p| p != page);
        last_page = Some(page);
        let new_section =
            element.kind == ElementKind::Title || (page_break && !options.multipage_sections);
        if new_section {
            if let Some(t) = current.take() {
                pre_chunks.push(PreChunk::Text(t));
            }
        }

        match element.kind {
            ElementKind::Table if html.is_empty() => {
                debug!(
                    "Table on page {} has no HTML; chunked as text",
                    element.metadata.page_number
                );
                push_text(&mut current, &mut pre_chunks, &element.text, page, soft_max, hard_max);
            }
            ElementKind::Table => {
                if let Some(t) = current.take() {
                    pre_chunks.push(PreChunk::Text(t));
                }
                pre_chunks.push(PreChunk::Table(TableChunk {
                    text: element.text.clone(),
                    text_as_html: html.to_string(),
                    page_number: page,
                }));
            }
            _ if element.text.is_empty() => {}
            _ => push_text(&mut current, &mut pre_chunks, &element.text, page, soft_max, hard_max),
        }
    }

    if let Some(t) = current {
        pre_chunks.push(PreChunk::Text(t));
    }
    pre_chunks
}

/// Append `text` to the open pre-chunk, or close it and start a new one.
fn push_text(
    current: &mut Option<TextPreChunk>,
    pre_chunks: &mut Vec<PreChunk>,
    text: &str,
    page: usize,
    soft_max: usize,
    hard_max: usize,
) {
    let n = text.chars().count();
    let fits = current
        .as_ref()
        .is_some_and(|t| t.len < soft_max && t.len_with(n) <= hard_max);
    if fits {
        if let Some(t) = current.as_mut() {
            t.push(text);
        }
    } else if let Some(t) = current.replace(TextPreChunk::new(text, page)) {
        pre_chunks.push(PreChunk::Text(t));
    }
}

/// Merge runs of small text pre-chunks until they reach
/// `combine_text_under_n_chars`.
fn combine_pre_chunks(pre_chunks: Vec<PreChunk>, options: &ChunkingOptions) -> Vec<PreChunk> {
    let threshold = options.combine_text_under_n_chars;
    if threshold == 0 {
        return pre_chunks;
    }

    let mut out: Vec<PreChunk> = Vec::with_capacity(pre_chunks.len());
    for pre in pre_chunks {
        let merge = match (out.last(), &pre) {
            (Some(PreChunk::Text(acc)), PreChunk::Text(next)) => {
                acc.len < threshold
                    && (options.multipage_sections || acc.page_number == next.page_number)
                    && acc.len_with(next.len) <= options.max_characters
            }
            _ => false,
        };
        if merge {
            if let (Some(PreChunk::Text(acc)), PreChunk::Text(next)) = (out.last_mut(), pre) {
                acc.absorb(next);
            }
        } else {
            out.push(pre);
        }
    }
    out
}

/// Split text into pieces of at most `max_chars` characters.
///
/// Each cut goes after the last newline inside the window, else the last
/// space, else exactly at the limit.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..limit];
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        let piece = rest[..cut].trim_end();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}
