//! Brand normalization rules.
//!
//! Rules classify runs by their resolved properties (run, character style,
//! paragraph style, document defaults) and write their corrections as direct
//! run and paragraph values, so a second pass finds nothing left to fix.

use crate::brand::BrandProfile;
use crate::changelog::{FixKind, FixLog};
use crate::error::Error;
use crate::heading::{fake_heading_level, is_heading_style, style_heading_level};
use crate::model::{
    Alignment, BLACK, Block, Color, Document, LineSpacing, Paragraph, ResolvedRun, Run,
    StyleSheet, Underline, for_each_paragraph_mut,
};

const STYLES_LOCATION: &str = "Document styles";

/// Drops the comment parts and their relationships. The reader already
/// removed the in-body markers and counted them.
pub fn remove_comments(doc: &mut Document, log: &mut FixLog) {
    let comment_rels: Vec<_> = doc
        .package
        .rels
        .iter()
        .filter(|r| {
            r.rel_type
                .rsplit('/')
                .next()
                .is_some_and(|kind| kind.starts_with("comments"))
        })
        .cloned()
        .collect();

    for rel in &comment_rels {
        let path = doc.package.target_path(rel);
        log::debug!("removing comment part {path}");
        doc.package.remove_part(&path);
    }
    doc.package
        .rels
        .retain(|r| !comment_rels.iter().any(|c| c.id == r.id));

    if doc.comment_marks > 0 || !comment_rels.is_empty() {
        log::info!(
            "removed {} comment marker(s) and {} comment part(s)",
            doc.comment_marks,
            comment_rels.len()
        );
        log.record_after(
            FixKind::Accessibility,
            "Removed all Word comments from document",
            "Entire document",
            "Comments cleaned up for final version",
        );
        doc.comment_marks = 0;
    }
}

/// Resolved properties of the runs that carry visible text.
fn visible_runs(paragraph: &Paragraph, styles: &StyleSheet) -> Result<Vec<ResolvedRun>, Error> {
    paragraph
        .runs
        .iter()
        .filter(|r| r.opaque.is_none() && !r.text.trim().is_empty())
        .map(|r| styles.resolve_run(paragraph.props.style.as_deref(), &r.props))
        .collect()
}

/// Restyles bold, large, short top-level paragraphs as real headings.
pub fn promote_fake_headings(doc: &mut Document, brand: &BrandProfile, log: &mut FixLog) {
    let Document { sections, styles, .. } = doc;

    for block in sections.iter_mut().flat_map(|s| s.blocks.iter_mut()) {
        let Block::Paragraph(paragraph) = block else {
            continue;
        };
        let name = styles.paragraph_style_name(paragraph.props.style.as_deref());
        if is_heading_style(&name) {
            continue;
        }
        let text = paragraph.text();
        let runs = match visible_runs(paragraph, styles) {
            Ok(runs) => runs,
            Err(e) => {
                log::warn!("skipping heading check for '{}': {e}", paragraph.snippet());
                continue;
            }
        };
        let Some(level) = fake_heading_level(&text, &runs, &brand.headings) else {
            continue;
        };

        let style_id = styles.ensure_heading(level);
        log::debug!("promoting '{}' to heading {level}", paragraph.snippet());
        paragraph.props.style = Some(style_id);
        log.record(
            FixKind::Hierarchy,
            format!("Converted fake heading to Heading {level}"),
            paragraph.snippet(),
        );
    }
}

struct ParagraphRole {
    is_heading: bool,
    /// Half-points every run of the paragraph is set to.
    target_size: u32,
}

fn paragraph_role(paragraph: &Paragraph, styles: &StyleSheet, brand: &BrandProfile) -> ParagraphRole {
    let name = styles.paragraph_style_name(paragraph.props.style.as_deref());
    let target_size = if name.to_ascii_lowercase().contains("hyperlink") {
        brand.body_half_points()
    } else {
        match style_heading_level(&name) {
            Some(level @ 1..=3) => brand.heading_half_points(level),
            _ => brand.body_half_points(),
        }
    };
    ParagraphRole {
        is_heading: is_heading_style(&name),
        target_size,
    }
}

fn normalize_run(
    run: &mut Run,
    resolved: &ResolvedRun,
    role: &ParagraphRole,
    brand: &BrandProfile,
    location: &str,
    log: &mut FixLog,
) {
    let props = &mut run.props;

    if role.is_heading {
        props.font = Some(brand.heading_font.clone());
        props.color = Some(Color::Rgb(brand.primary.rgb));
        props.bold = Some(true);
    } else if resolved.looks_like_link() {
        props.font = Some(brand.body_font.clone());
    } else {
        props.font = Some(brand.body_font.clone());
        if resolved.color.is_non_default() && !resolved.underline {
            props.color = Some(Color::Rgb(BLACK));
            log.record(FixKind::Accessibility, "Fixed colored body text to black", location);
        }
    }

    // Runs inside a real hyperlink take the body size whatever the paragraph.
    props.size = Some(if run.link.is_some() {
        brand.body_half_points()
    } else {
        role.target_size
    });

    if resolved.small_caps {
        props.small_caps = Some(false);
        log.record(FixKind::Accessibility, "Removed small caps formatting", location);
    }
    if resolved.caps {
        props.caps = Some(false);
        log.record(FixKind::Accessibility, "Removed all caps formatting", location);
    }

    let has_color = props.color.unwrap_or(resolved.color).is_non_default();
    if resolved.underline && !has_color && !role.is_heading {
        props.underline = Some(Underline::None);
        log.record(
            FixKind::Accessibility,
            "Removed underline (use bold/italic for emphasis)",
            location,
        );
    }

    if resolved.italic {
        props.italic = Some(false);
        log.record(FixKind::Font, "Removed italic formatting", location);
    }
}

/// Applies the per-run and paragraph-level rules to one paragraph.
pub fn normalize_paragraph(
    paragraph: &mut Paragraph,
    styles: &StyleSheet,
    brand: &BrandProfile,
    log: &mut FixLog,
) {
    if paragraph.runs.is_empty() {
        return;
    }
    let role = paragraph_role(paragraph, styles, brand);
    let location = paragraph.snippet();
    let para_style = paragraph.props.style.clone();

    for run in &mut paragraph.runs {
        if run.opaque.is_some() || run.text.is_empty() {
            continue;
        }
        let resolved = match styles.resolve_run(para_style.as_deref(), &run.props) {
            Ok(resolved) => resolved,
            Err(e) => {
                log::warn!("could not format run '{}': {e}", run.text);
                continue;
            }
        };
        normalize_run(run, &resolved, &role, brand, &location, log);
    }

    let props = &mut paragraph.props;
    if !role.is_heading && props.alignment.as_ref().is_some_and(|a| *a != Alignment::Left) {
        props.alignment = Some(Alignment::Left);
        log.record(FixKind::Hierarchy, "Fixed text alignment to left", &location);
    }

    props.spacing.before = Some(0);
    props.spacing.after = Some(0);
    props.spacing.line = Some(LineSpacing::Multiple(if role.is_heading { 1.0 } else { 1.15 }));
}

/// Top-level paragraphs first, then every paragraph inside tables.
pub fn normalize_document(doc: &mut Document, brand: &BrandProfile, log: &mut FixLog) {
    let Document { sections, styles, .. } = doc;

    for section in sections.iter_mut() {
        for block in &mut section.blocks {
            if let Block::Paragraph(paragraph) = block {
                normalize_paragraph(paragraph, styles, brand, log);
            }
        }
    }
    for section in sections.iter_mut() {
        for block in &mut section.blocks {
            if let Block::Table(_) = block {
                for_each_paragraph_mut(std::slice::from_mut(block), &mut |p: &mut Paragraph| {
                    normalize_paragraph(p, styles, brand, log)
                });
            }
        }
    }
}

/// Brands the shared style table: heading styles, the body style and every
/// link style.
pub fn apply_style_table(styles: &mut StyleSheet, brand: &BrandProfile, log: &mut FixLog) {
    for level in 1..=6u8 {
        let Some(id) = styles
            .find_by_name(&format!("heading {level}"))
            .map(|s| s.id.clone())
        else {
            continue;
        };
        let Some(style) = styles.get_mut(&id) else {
            continue;
        };
        style.run.font = Some(brand.heading_font.clone());
        style.run.color = Some(Color::Rgb(brand.primary.rgb));
        style.run.bold = Some(true);
        style.run.size = Some(brand.heading_half_points(level));
        style.para.spacing.before = Some(0);
        style.para.spacing.after = Some(0);
        log.record(
            FixKind::Font,
            format!("Applied brand heading font to Heading {level}"),
            STYLES_LOCATION,
        );
    }

    let body_id = styles
        .find_by_name("Normal")
        .or_else(|| styles.default_paragraph_style())
        .map(|s| s.id.clone());
    if let Some(style) = body_id.and_then(|id| styles.get_mut(&id)) {
        style.run.font = Some(brand.body_font.clone());
        style.run.size = Some(brand.body_half_points());
        log.record(FixKind::Font, "Applied brand body font to Normal style", STYLES_LOCATION);
    }

    let link_ids: Vec<String> = styles
        .styles
        .values()
        .filter(|s| s.name.to_ascii_lowercase().contains("link"))
        .map(|s| s.id.clone())
        .collect();
    for id in link_ids {
        let Some(style) = styles.get_mut(&id) else {
            continue;
        };
        style.run.font = Some(brand.body_font.clone());
        style.run.size = Some(brand.body_half_points());
        log.record(
            FixKind::Font,
            format!("Set {} style to body text size ({}pt)", style.name, brand.sizes.body),
            STYLES_LOCATION,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rgb, RunProps, Style, StyleKind};

    fn styles() -> StyleSheet {
        let mut styles = StyleSheet::default();
        let mut normal = Style::new("Normal", "Normal", StyleKind::Paragraph);
        normal.is_default = true;
        styles.insert(normal);
        let mut h1 = Style::new("Heading1", "heading 1", StyleKind::Paragraph);
        h1.based_on = Some("Normal".into());
        styles.insert(h1);
        styles
    }

    fn colored(text: &str, rgb: [u8; 3]) -> Run {
        Run {
            props: RunProps {
                color: Some(Color::Rgb(Rgb(rgb))),
                ..Default::default()
            },
            ..Run::new(text)
        }
    }

    #[test]
    fn colored_body_text_turns_black_once() {
        let styles = styles();
        let brand = BrandProfile::default();
        let mut log = FixLog::new();
        let mut p = Paragraph::default();
        p.runs.push(colored("red words", [0xC0, 0, 0]));
        p.runs.push(Run::new(" plain"));

        normalize_paragraph(&mut p, &styles, &brand, &mut log);
        assert_eq!(p.runs[0].props.color, Some(Color::Rgb(BLACK)));
        assert_eq!(log.count(FixKind::Accessibility), 1);

        let mut again = FixLog::new();
        normalize_paragraph(&mut p, &styles, &brand, &mut again);
        assert!(again.is_empty());
    }

    #[test]
    fn heading_runs_take_brand_heading_look() {
        let styles = styles();
        let brand = BrandProfile::default();
        let mut log = FixLog::new();
        let mut p = Paragraph::with_style("Heading1");
        p.runs.push(colored("Overview", [0x11, 0x88, 0x11]));

        normalize_paragraph(&mut p, &styles, &brand, &mut log);
        let props = &p.runs[0].props;
        assert_eq!(props.font.as_deref(), Some("Adobe Caslon Pro"));
        assert_eq!(props.color, Some(Color::Rgb(brand.primary.rgb)));
        assert_eq!(props.bold, Some(true));
        assert_eq!(props.size, Some(36));
        assert_eq!(p.props.spacing.before, Some(0));
        assert_eq!(p.props.spacing.line, Some(LineSpacing::Multiple(1.0)));
        assert!(log.is_empty());
    }

    #[test]
    fn link_look_keeps_color_and_underline() {
        let styles = styles();
        let brand = BrandProfile::default();
        let mut log = FixLog::new();
        let mut run = colored("example.org", [0x05, 0x63, 0xC1]);
        run.props.underline = Some(Underline::Line("single".into()));
        run.props.size = Some(28);
        let mut p = Paragraph::default();
        p.runs.push(run);

        normalize_paragraph(&mut p, &styles, &brand, &mut log);
        let props = &p.runs[0].props;
        assert_eq!(props.color, Some(Color::Rgb(Rgb([0x05, 0x63, 0xC1]))));
        assert_eq!(props.underline, Some(Underline::Line("single".into())));
        assert_eq!(props.size, Some(22));
        assert_eq!(props.font.as_deref(), Some("Franklin Gothic"));
        assert!(log.is_empty());
    }

    #[test]
    fn strips_emphasis_and_alignment() {
        let styles = styles();
        let brand = BrandProfile::default();
        let mut log = FixLog::new();
        let mut run = Run::new("Shouting text");
        run.props.italic = Some(true);
        run.props.caps = Some(true);
        run.props.small_caps = Some(true);
        run.props.underline = Some(Underline::Line("single".into()));
        let mut p = Paragraph::default();
        p.props.alignment = Some(Alignment::Justify);
        p.runs.push(run);

        normalize_paragraph(&mut p, &styles, &brand, &mut log);
        let descriptions: Vec<&str> = log.records().iter().map(|r| r.description.as_str()).collect();
        assert_eq!(
            descriptions,
            [
                "Removed small caps formatting",
                "Removed all caps formatting",
                "Removed underline (use bold/italic for emphasis)",
                "Removed italic formatting",
                "Fixed text alignment to left",
            ]
        );
        assert_eq!(p.props.alignment, Some(Alignment::Left));
        assert_eq!(p.props.spacing.line, Some(LineSpacing::Multiple(1.15)));
    }

    #[test]
    fn circular_style_skips_run_only() {
        let mut styles = styles();
        let mut a = Style::new("A", "Loop A", StyleKind::Character);
        a.based_on = Some("B".into());
        let mut b = Style::new("B", "Loop B", StyleKind::Character);
        b.based_on = Some("A".into());
        styles.insert(a);
        styles.insert(b);

        let brand = BrandProfile::default();
        let mut log = FixLog::new();
        let mut broken = Run::new("looped");
        broken.props.style = Some("A".into());
        broken.props.italic = Some(true);
        let mut fine = Run::new(" fine");
        fine.props.italic = Some(true);
        let mut p = Paragraph::default();
        p.runs.push(broken);
        p.runs.push(fine);

        normalize_paragraph(&mut p, &styles, &brand, &mut log);
        assert_eq!(p.runs[0].props.italic, Some(true));
        assert_eq!(p.runs[0].props.size, None);
        assert_eq!(p.runs[1].props.italic, Some(false));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn style_table_brands_headings_body_and_links() {
        let mut styles = styles();
        styles.insert(Style::new("Hyperlink", "Hyperlink", StyleKind::Character));
        styles.insert(Style::new("FollowedHyperlink", "FollowedHyperlink", StyleKind::Character));
        let brand = BrandProfile::default();
        let mut log = FixLog::new();

        apply_style_table(&mut styles, &brand, &mut log);
        let h1 = styles.get("Heading1").unwrap();
        assert_eq!(h1.run.size, Some(36));
        assert_eq!(h1.run.color, Some(Color::Rgb(brand.primary.rgb)));
        assert_eq!(h1.para.spacing.after, Some(0));
        assert_eq!(styles.get("Normal").unwrap().run.size, Some(22));
        assert_eq!(styles.get("Hyperlink").unwrap().run.font.as_deref(), Some("Franklin Gothic"));
        assert!(log
            .records()
            .iter()
            .any(|r| r.description == "Set Hyperlink style to body text size (11pt)"));
        assert_eq!(log.len(), 4);
    }
}
