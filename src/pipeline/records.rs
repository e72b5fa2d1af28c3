//! From chunks to `(title, body)` records.
//!
//! Table chunks are folded into the text that precedes them as raw HTML,
//! each assembled text is split at its first blank line, and every kept
//! record is flagged when its body carries markup.

use crate::config::RecordPolicy;
use crate::element::{Chunk, Element};
use crate::pipeline::html::contains_html;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Title given to records whose text has no blank-line separator.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// One row of the record table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    pub body: String,
    pub contains_html: bool,
}

impl Record {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            title: title.into(),
            contains_html: contains_html(&body),
            body,
        }
    }
}

/// Result of splitting one assembled text at its first `"\n\n"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitOutcome<'a> {
    Titled { title: &'a str, body: &'a str },
    Untitled { body: &'a str },
}

/// Drop running page headers and footers, preserving order.
pub fn filter_furniture(elements: Vec<Element>) -> Vec<Element> {
    let before = elements.len();
    let kept: Vec<Element> = elements
        .into_iter()
        .filter(|e| !e.is_page_furniture())
        .collect();
    debug!("Dropped {} header/footer elements", before - kept.len());
    kept
}

/// Flatten chunks into an ordered list of texts.
///
/// Composite text is appended as is. A table's HTML is appended to the last
/// text with a `"\n"` separator, or becomes its own entry when no text has
/// been seen yet.
pub fn assemble_texts(chunks: &[Chunk]) -> Vec<String> {
    let mut texts: Vec<String> = Vec::new();
    for chunk in chunks {
        match chunk {
            Chunk::Composite(c) => texts.push(c.text.clone()),
            Chunk::Table(t) => match texts.last_mut() {
                Some(last) => {
                    last.push('\n');
                    last.push_str(&t.text_as_html);
                }
                None => texts.push(t.text_as_html.clone()),
            },
        }
    }
    texts
}

/// Split at the first `"\n\n"`; the body keeps any later separators.
pub fn split_title_body(text: &str) -> SplitOutcome<'_> {
    match text.split_once("\n\n") {
        Some((title, body)) => SplitOutcome::Titled { title, body },
        None => SplitOutcome::Untitled { body: text },
    }
}

/// Turn assembled texts into records.
///
/// Returns the records and the number of titled texts the policy dropped.
pub fn build_records(texts: &[String], policy: RecordPolicy) -> (Vec<Record>, usize) {
    let mut records = Vec::with_capacity(texts.len());
    let mut dropped = 0;

    for (i, text) in texts.iter().enumerate() {
        match (split_title_body(text), policy) {
            (SplitOutcome::Untitled { body }, _) => records.push(Record::new(UNKNOWN_TITLE, body)),
            (SplitOutcome::Titled { title, body }, RecordPolicy::All) => {
                records.push(Record::new(title, body))
            }
            (SplitOutcome::Titled { title, .. }, RecordPolicy::UntitledOnly) => {
                dropped += 1;
                debug!("Text {} dropped (titled: {:?})", i, title);
            }
        }
    }

    if dropped > 0 {
        warn!(
            "{} of {} texts had a title/body separator and were not recorded (use RecordPolicy::All to keep them)",
            dropped,
            texts.len()
        );
    }
    (records, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{CompositeChunk, ElementKind, TableChunk};

    fn composite(text: &str) -> Chunk {
        Chunk::Composite(CompositeChunk {
            text: text.into(),
            page_number: 1,
        })
    }

    fn table(html: &str) -> Chunk {
        Chunk::Table(TableChunk {
            text: "cells".into(),
            text_as_html: html.into(),
            page_number: 1,
        })
    }

    #[test]
    fn filter_drops_headers_and_footers_only() {
        let els = vec![
            Element::new(ElementKind::Header, "ACME annual report", 1),
            Element::new(ElementKind::Title, "Overview", 1),
            Element::new(ElementKind::Footer, "Page 1", 1),
            Element::new(ElementKind::NarrativeText, "Body", 1),
        ];
        let kept = filter_furniture(els);
        let kinds: Vec<ElementKind> = kept.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ElementKind::Title, ElementKind::NarrativeText]);
    }

    #[test]
    fn table_html_appends_to_previous_text() {
        let chunks = vec![
            composite("Sales"),
            table("<table><tr><td>1</td></tr></table>"),
        ];
        assert_eq!(
            assemble_texts(&chunks),
            vec!["Sales\n<table><tr><td>1</td></tr></table>"]
        );
    }

    #[test]
    fn leading_table_becomes_own_entry() {
        let chunks = vec![table("<table></table>"), composite("After")];
        assert_eq!(assemble_texts(&chunks), vec!["<table></table>", "After"]);
    }

    #[test]
    fn consecutive_tables_stack_on_same_entry() {
        let chunks = vec![composite("T"), table("<t1>"), table("<t2>")];
        assert_eq!(assemble_texts(&chunks), vec!["T\n<t1>\n<t2>"]);
    }

    #[test]
    fn split_at_first_blank_line_only() {
        assert_eq!(
            split_title_body("Title\n\nPara one\n\nPara two"),
            SplitOutcome::Titled {
                title: "Title",
                body: "Para one\n\nPara two"
            }
        );
        assert_eq!(
            split_title_body("single block"),
            SplitOutcome::Untitled {
                body: "single block"
            }
        );
    }

    #[test]
    fn untitled_only_policy_keeps_untitled_texts() {
        let texts = vec![
            "Revenue\n<table><tr><td>5</td></tr></table>".to_string(),
            "Heading\n\nbody text".to_string(),
        ];
        let (records, dropped) = build_records(&texts, RecordPolicy::UntitledOnly);
        assert_eq!(dropped, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Unknown");
        assert_eq!(records[0].body, texts[0]);
        assert!(records[0].contains_html);
    }

    #[test]
    fn all_policy_keeps_titled_texts() {
        let texts = vec!["Heading\n\nbody text".to_string(), "plain".to_string()];
        let (records, dropped) = build_records(&texts, RecordPolicy::All);
        assert_eq!(dropped, 0);
        assert_eq!(records[0], Record::new("Heading", "body text"));
        assert_eq!(records[1].title, "Unknown");
        assert!(!records[1].contains_html);
    }

    #[test]
    fn at_most_one_record_per_text() {
        let texts: Vec<String> = (0..5).map(|i| format!("t{i}\n\nb\n\nc")).collect();
        let (records, _) = build_records(&texts, RecordPolicy::All);
        assert_eq!(records.len(), texts.len());
    }
}
