//! Deterministic cleanup of vision-model replies.
//!
//! Models occasionally wrap answers in code fences, emit CRLF line endings
//! or sprinkle zero-width characters into otherwise correct output. The
//! rules here fix those quirks without touching content, so the prompts can
//! stay focused on what to extract.
//!
//! Two entry points:
//! - [`clean_caption`] for figure captions (prose);
//! - [`extract_json_array`] for layout replies (JSON).

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply the caption rules in order:
/// 1. Strip outer code fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip invisible Unicode
/// 4. Drop a leading "Caption:" style label
/// 5. Trim
pub fn clean_caption(input: &str) -> String {
    let s = strip_code_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = strip_caption_label(&s);
    s.trim().to_string()
}

/// Isolate the JSON array in a layout reply.
///
/// Fences are stripped first; any prose before the first `[` or after the
/// last `]` is dropped. Returns `None` when no array brackets are present.
pub fn extract_json_array(input: &str) -> Option<String> {
    let s = strip_code_fences(input);
    let s = remove_invisible_chars(&s);
    let start = s.find('[')?;
    let end = s.rfind(']')?;
    (end > start).then(|| s[start..=end].to_string())
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:[a-zA-Z]+)?\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Leading label ────────────────────────────────────────────────────

static RE_CAPTION_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:\*\*)?(?:caption|description)(?:\*\*)?\s*:\s*").unwrap());

fn strip_caption_label(input: &str) -> String {
    RE_CAPTION_LABEL.replace(input, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_fences_and_label_removed() {
        let raw = "```text\nCaption: A bar chart of revenue by quarter.\n```";
        assert_eq!(clean_caption(raw), "A bar chart of revenue by quarter.");
    }

    #[test]
    fn caption_invisible_chars_removed() {
        assert_eq!(clean_caption("\u{FEFF}Line\u{200B} chart\r\n"), "Line chart");
    }

    #[test]
    fn caption_plain_text_untouched() {
        assert_eq!(clean_caption("Photo of a factory floor."), "Photo of a factory floor.");
    }

    #[test]
    fn json_array_from_fenced_reply() {
        let raw = "```json\n[{\"type\": \"title\", \"text\": \"Intro\"}]\n```";
        assert_eq!(
            extract_json_array(raw).as_deref(),
            Some("[{\"type\": \"title\", \"text\": \"Intro\"}]")
        );
    }

    #[test]
    fn json_array_with_surrounding_prose() {
        let raw = "Here is the layout:\n[ ]\nHope this helps.";
        assert_eq!(extract_json_array(raw).as_deref(), Some("[ ]"));
    }

    #[test]
    fn json_array_missing() {
        assert_eq!(extract_json_array("{\"type\": \"title\"}"), None);
    }
}
