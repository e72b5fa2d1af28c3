//! Text normalisation applied to element text before chunking.
//!
//! Two passes: [`group_broken_paragraphs`] undoes hard line wraps, then
//! [`clean`] applies the switches in [`CleanOptions`].

use crate::config::CleanOptions;
use crate::element::Element;
use once_cell::sync::Lazy;
use regex::Regex;

/// Bullet glyphs recognised at the start of a line.
const BULLETS: &[char] = &[
    '\u{0095}', '•', '‣', '⁃', '◦', '·', '∙', '▪', '▫', '■', '□', '●', '○', '◆',
    '◇', '►', '▶', '➢', '✓', '✔', '-', '–', '*',
];

/// Runs of two or more line breaks, with any horizontal whitespace between.
static RE_PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^\S\n]*\n\s*){2,}").unwrap());

/// A single line break with surrounding whitespace.
static RE_LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\n\s*").unwrap());

/// `e` used as a bullet by some PDF fonts, e.g. "e Item".
static RE_E_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^e\s").unwrap());

static RE_MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

pub(crate) fn starts_with_bullet(s: &str) -> bool {
    s.starts_with(BULLETS) || RE_E_BULLET.is_match(s)
}

/// Rejoin paragraphs that were broken across lines.
///
/// Blank-line runs separate paragraphs. Inside a paragraph:
/// - bullet-led paragraphs split into one paragraph per bullet, with each
///   bullet's continuation lines joined by a space;
/// - when every line has fewer than five words, the lines are kept as
///   separate paragraphs (addresses, short lists);
/// - otherwise the line breaks become single spaces.
///
/// The result paragraphs are joined with `"\n\n"`.
pub fn group_broken_paragraphs(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();

    for paragraph in RE_PARAGRAPH_BREAK.split(text) {
        let trimmed = paragraph.trim();
        if trimmed.is_empty() {
            continue;
        }

        if starts_with_bullet(trimmed) {
            out.extend(group_bullet_paragraph(trimmed));
            continue;
        }

        let lines: Vec<&str> = RE_LINE_BREAK.split(paragraph).collect();
        let all_lines_short = lines
            .iter()
            .all(|line| line.trim().split(' ').count() < 5);

        if all_lines_short {
            out.extend(
                lines
                    .iter()
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty())
                    .map(str::to_string),
            );
        } else {
            out.push(RE_LINE_BREAK.replace_all(trimmed, " ").into_owned());
        }
    }

    out.join("\n\n")
}

/// Split a bullet-led paragraph at every line that starts a new bullet.
fn group_bullet_paragraph(paragraph: &str) -> Vec<String> {
    let mut items: Vec<Vec<&str>> = Vec::new();
    for line in paragraph.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match items.last_mut() {
            Some(item) if !starts_with_bullet(line) => item.push(line),
            _ => items.push(vec![line]),
        }
    }
    items.into_iter().map(|item| item.join(" ")).collect()
}

/// Apply the enabled cleaners in a fixed order and trim the result.
///
/// Order: lowercase, trailing punctuation, dashes, extra whitespace,
/// bullets.
pub fn clean(text: &str, options: &CleanOptions) -> String {
    let mut s = if options.lowercase {
        text.to_lowercase()
    } else {
        text.to_string()
    };
    if options.trailing_punctuation {
        s = clean_trailing_punctuation(&s);
    }
    if options.dashes {
        s = clean_dashes(&s);
    }
    if options.extra_whitespace {
        s = clean_extra_whitespace(&s);
    }
    if options.bullets {
        s = clean_bullets(&s);
    }
    s.trim().to_string()
}

/// Newlines and non-breaking spaces become spaces; space runs collapse.
pub fn clean_extra_whitespace(text: &str) -> String {
    let replaced = text.replace(['\u{a0}', '\n'], " ");
    RE_MULTI_SPACE.replace_all(&replaced, " ").trim().to_string()
}

/// Replace hyphens and en-dashes with spaces.
pub fn clean_dashes(text: &str) -> String {
    text.replace(['-', '–'], " ").trim().to_string()
}

/// Drop trailing `.,:;` after trimming.
pub fn clean_trailing_punctuation(text: &str) -> String {
    text.trim().trim_end_matches(['.', ',', ':', ';']).to_string()
}

/// Remove one leading bullet glyph.
pub fn clean_bullets(text: &str) -> String {
    let t = text.trim_start();
    match t.strip_prefix(BULLETS) {
        Some(rest) => rest.trim().to_string(),
        None => text.to_string(),
    }
}

/// Normalise the text of every element that has any.
///
/// Elements with empty text (uncaptioned figures) are left untouched.
pub fn normalize_elements(elements: &mut [Element], options: &CleanOptions) {
    for element in elements.iter_mut().filter(|e| !e.text.is_empty()) {
        let grouped = if options.group_broken_paragraphs {
            group_broken_paragraphs(&element.text)
        } else {
            element.text.clone()
        };
        element.text = clean(&grouped, options);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;

    #[test]
    fn joins_wrapped_lines_of_long_paragraphs() {
        let text = "The quick brown fox jumped over\nthe lazy dog while the farmer\nwas not looking at all.";
        assert_eq!(
            group_broken_paragraphs(text),
            "The quick brown fox jumped over the lazy dog while the farmer was not looking at all."
        );
    }

    #[test]
    fn keeps_short_lines_apart() {
        let text = "ACME Corp\n12 Main Street\nSpringfield";
        assert_eq!(
            group_broken_paragraphs(text),
            "ACME Corp\n\n12 Main Street\n\nSpringfield"
        );
    }

    #[test]
    fn splits_bullets_and_joins_their_lines() {
        let text = "• First item that wraps\nonto a second line\n• Second item";
        assert_eq!(
            group_broken_paragraphs(text),
            "• First item that wraps onto a second line\n\n• Second item"
        );
    }

    #[test]
    fn preserves_paragraph_boundaries() {
        let text = "one two three four five six\nseven eight\n\n\n  second paragraph with enough words here\nand more";
        assert_eq!(
            group_broken_paragraphs(text),
            "one two three four five six seven eight\n\nsecond paragraph with enough words here and more"
        );
    }

    #[test]
    fn clean_collapses_whitespace_and_trims() {
        let o = CleanOptions::default();
        assert_eq!(clean("  Revenue\n\n grew   by\u{a0}4%  ", &o), "Revenue grew by 4%");
    }

    #[test]
    fn clean_optional_switches() {
        let o = CleanOptions {
            bullets: true,
            dashes: true,
            trailing_punctuation: true,
            lowercase: true,
            ..CleanOptions::default()
        };
        assert_eq!(clean("• Year-over–year growth;", &o), "year over year growth");
    }

    #[test]
    fn defaults_leave_bullets_and_dashes() {
        let o = CleanOptions::default();
        assert_eq!(clean("• Year-over-year.", &o), "• Year-over-year.");
    }

    #[test]
    fn clean_bullets_only_strips_leading_glyph() {
        assert_eq!(clean_bullets("▪ item ▪ more"), "item ▪ more");
        assert_eq!(clean_bullets("no bullet"), "no bullet");
    }

    #[test]
    fn normalize_skips_empty_text() {
        let mut els = vec![
            Element::new(ElementKind::Image, "", 1),
            Element::new(ElementKind::NarrativeText, "Net sales\nincreased", 1),
        ];
        normalize_elements(&mut els, &CleanOptions::default());
        assert_eq!(els[0].text, "");
        // both lines are short, so they stay separate paragraphs until
        // whitespace cleaning flattens them
        assert_eq!(els[1].text, "Net sales increased");
    }
}
