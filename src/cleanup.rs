//! Whitespace cleanup after the formatting rules have run.

use std::sync::LazyLock;

use regex::Regex;

use crate::brand::BrandProfile;
use crate::changelog::{FixKind, FixLog};
use crate::model::{Block, Document, Paragraph, for_each_paragraph_mut};

/// Upper bound on removal passes over the top-level paragraphs.
const MAX_REMOVAL_PASSES: usize = 10;

static RE_MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \x{00A0}]{2,}").expect("valid multi-space regex"));
static RE_PERIOD_CAPITAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.([A-Z])").expect("valid period regex"));
static RE_PERIOD_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\. {2,}").expect("valid period spacing regex"));

/// Removes top-level paragraphs without visible text. Table cells keep
/// theirs. Returns how many were removed.
pub fn remove_empty_paragraphs(doc: &mut Document, log: &mut FixLog) -> usize {
    let mut removed = 0;
    for pass in 1..=MAX_REMOVAL_PASSES {
        let mut found = 0;
        for section in &mut doc.sections {
            let before = section.blocks.len();
            section
                .blocks
                .retain(|b| !matches!(b, Block::Paragraph(p) if p.is_blank()));
            found += before - section.blocks.len();
        }
        log::debug!("empty paragraph pass {pass}: removed {found}");
        if found == 0 {
            break;
        }
        removed += found;
    }

    if removed > 0 {
        log::info!("removed {removed} empty paragraph(s)");
        log.record(
            FixKind::Hierarchy,
            format!("Removed {removed} empty paragraphs for tight spacing"),
            "Throughout document",
        );
    }
    removed
}

/// Collapses runs of spaces and no-break spaces and fixes spacing after sentence periods.
fn clean_run_text(text: &str) -> String {
    let text = RE_MULTI_SPACE.replace_all(text, " ");
    let text = RE_PERIOD_CAPITAL.replace_all(&text, ". $1");
    RE_PERIOD_SPACES.replace_all(&text, ". ").into_owned()
}

fn needs_joining_space(current: &str, next: &str) -> bool {
    let (Some(last), Some(first)) = (current.chars().last(), next.chars().next()) else {
        return false;
    };
    if last.is_whitespace() || first.is_whitespace() {
        return false;
    }
    first.is_alphabetic() && (last.is_alphanumeric() || "])}\"".contains(last))
}

fn repair_paragraph(paragraph: &mut Paragraph, log: &mut FixLog) {
    for run in paragraph.runs.iter_mut().filter(|r| r.opaque.is_none()) {
        let cleaned = clean_run_text(&run.text);
        if cleaned != run.text && !cleaned.is_empty() {
            run.text = cleaned;
        }
    }

    // Pairs of text runs to check. Opaque entries (bookmarks, fields) are
    // skipped over; an inline object such as a hyphen or symbol ends the chain.
    let mut pairs = Vec::new();
    let mut previous: Option<usize> = None;
    for (i, run) in paragraph.runs.iter().enumerate() {
        if run.opaque.is_some() {
            continue;
        }
        if !run.objects.is_empty() {
            previous = None;
            continue;
        }
        if run.text.is_empty() {
            continue;
        }
        if let Some(p) = previous {
            pairs.push((p, i));
        }
        previous = Some(i);
    }

    for (i, j) in pairs {
        if paragraph.runs[i].text.trim().is_empty() {
            continue;
        }
        if needs_joining_space(&paragraph.runs[i].text, &paragraph.runs[j].text) {
            paragraph.runs[i].text.push(' ');
            log::debug!("added space after run '{}'", paragraph.runs[i].text);
            log.record(FixKind::Accessibility, "Fixed spacing between runs", paragraph.snippet());
        }
    }
}

/// Normalizes whitespace inside runs and restores the space between adjacent
/// runs that styling (or a hyperlink boundary) glued together.
pub fn repair_text_spacing(doc: &mut Document, log: &mut FixLog) {
    for section in &mut doc.sections {
        for_each_paragraph_mut(&mut section.blocks, &mut |p: &mut Paragraph| {
            repair_paragraph(p, log)
        });
    }
}

/// Sets every run inside a hyperlink to the body size. Returns how many runs
/// changed.
pub fn repair_hyperlink_sizes(doc: &mut Document, brand: &BrandProfile, log: &mut FixLog) -> usize {
    let body = brand.body_half_points();
    let mut fixed = 0;
    for section in &mut doc.sections {
        for_each_paragraph_mut(&mut section.blocks, &mut |p: &mut Paragraph| {
            for run in p.runs.iter_mut().filter(|r| r.link.is_some() && r.is_plain_text()) {
                if run.props.size != Some(body) {
                    run.props.size = Some(body);
                    fixed += 1;
                }
            }
        });
    }

    if fixed > 0 {
        log.record(
            FixKind::Font,
            format!("Fixed {fixed} hyperlink font sizes to {}pt", brand.sizes.body),
            "Throughout document",
        );
    }
    fixed
}
