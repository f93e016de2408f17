//! Heading inference.
//!
//! Two entry points share the thresholds in [`HeadingRules`]:
//! [`fake_heading_level`] looks at the resolved runs of an existing paragraph,
//! [`line_heading_level`] looks at one line of plain text. Both are pure; the
//! caller applies the resulting style.

use crate::brand::{HeadingRules, half_points};
use crate::model::ResolvedRun;

/// Heading level a paragraph style name stands for: `heading N` gives N,
/// `Title` gives 1.
pub fn style_heading_level(name: &str) -> Option<u8> {
    let lower = name.trim().to_ascii_lowercase();
    if lower == "title" {
        return Some(1);
    }
    lower
        .strip_prefix("heading")
        .and_then(|rest| rest.trim().parse::<u8>().ok())
        .filter(|level| (1..=9).contains(level))
}

pub fn is_heading_style(name: &str) -> bool {
    let lower = name.trim().to_ascii_lowercase();
    lower.starts_with("heading") || lower == "title"
}

/// Decides whether a paragraph not styled as a heading is one in disguise.
///
/// `runs` are the resolved properties of the paragraph's runs that carry
/// visible text. Every one of them must be bold; the largest decides the
/// level. A level-1 candidate that contains a link-looking run is demoted to
/// level 2.
pub fn fake_heading_level(text: &str, runs: &[ResolvedRun], rules: &HeadingRules) -> Option<u8> {
    if text.trim().is_empty() || text.chars().count() >= rules.max_length || runs.is_empty() {
        return None;
    }
    if !runs.iter().all(|r| r.bold) {
        return None;
    }
    let max_size = runs.iter().map(|r| r.size).max().unwrap_or(0);
    let has_link = runs.iter().any(ResolvedRun::looks_like_link);
    let [h1, h2, h3] = rules.fake_heading_sizes.map(half_points);

    if max_size >= h1 {
        Some(if has_link { 2 } else { 1 })
    } else if max_size >= h2 {
        Some(2)
    } else if max_size >= h3 {
        Some(3)
    } else {
        None
    }
}

/// Heading level for a trimmed line of plain text, `None` for body text.
pub fn line_heading_level(line: &str, is_first: bool, rules: &HeadingRules) -> Option<u8> {
    if is_first {
        return Some(1);
    }
    if is_numbered_section(line, rules.numbered_prefix_window) {
        return Some(2);
    }
    let ends_sentence = line
        .chars()
        .last()
        .is_some_and(|c| rules.terminal_punctuation.contains(&c));
    if line.chars().count() < rules.max_length
        && !ends_sentence
        && rules.keywords.iter().any(|k| line.contains(k.as_str()))
    {
        return Some(3);
    }
    None
}

/// `<digit>. <Capital>...` with the `". "` inside the first `window` chars.
fn is_numbered_section(line: &str, window: usize) -> bool {
    if !line.starts_with(|c: char| c.is_ascii_digit()) {
        return false;
    }
    let prefix: String = line.chars().take(window).collect();
    let Some(dot) = prefix.find(". ") else {
        return false;
    };
    line[dot + 2..].chars().next().is_some_and(char::is_uppercase)
}

/// A numbered list item: leading digit with `". "` inside the window.
pub fn is_numbered_item(line: &str, window: usize) -> bool {
    line.starts_with(|c: char| c.is_ascii_digit())
        && line.chars().take(window).collect::<String>().contains(". ")
}
