//! Builds a new branded document from plain text.
//!
//! One paragraph per input line:
//!
//! - blank line: empty paragraph
//! - heading line (see [`line_heading_level`]): `heading N` paragraph
//! - `-` or `•`: bulleted `List Bullet` paragraph, marker stripped
//! - `1. ...`: `List Number` paragraph, text kept as written
//! - anything else: body paragraph

use crate::brand::BrandProfile;
use crate::heading::{is_numbered_item, line_heading_level};
use crate::model::{
    Block, Color, Document, LineSpacing, NumberingRef, Paragraph, RawXml, Run, RunProps, Spacing,
    Style, StyleKind, StyleSheet, REL_NUMBERING,
};

const BODY_STYLE: &str = "Normal";
const BULLET_STYLE: &str = "ListBullet";
const NUMBER_STYLE: &str = "ListNumber";
const BULLET_NUM_ID: &str = "1";
const CT_NUMBERING: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml";

/// 12pt, in twips.
const HEADING_SPACE_BEFORE: u32 = 240;
/// 6pt, in twips.
const BODY_SPACE_AFTER: u32 = 120;

/// Style table of a new document, branded before any paragraph exists so
/// unset run properties inherit brand values.
pub fn branded_stylesheet(brand: &BrandProfile) -> StyleSheet {
    let mut sheet = StyleSheet::default();
    sheet.default_run = RunProps {
        font: Some(brand.body_font.clone()),
        size: Some(brand.body_half_points()),
        ..Default::default()
    };

    let mut normal = Style::new(BODY_STYLE, "Normal", StyleKind::Paragraph);
    normal.is_default = true;
    normal.run.font = Some(brand.body_font.clone());
    normal.run.size = Some(brand.body_half_points());
    normal.extra.push(qformat());
    sheet.insert(normal);

    for level in 1..=3u8 {
        let id = sheet.ensure_heading(level);
        if let Some(style) = sheet.get_mut(&id) {
            style.run.font = Some(brand.heading_font.clone());
            style.run.color = Some(Color::Rgb(brand.primary.rgb));
            style.run.bold = Some(true);
            style.run.size = Some(brand.heading_half_points(level));
            style.para.spacing = Spacing {
                before: Some(0),
                after: Some(0),
                line: None,
            };
            style.extra.push(RawXml {
                name: "next".into(),
                xml: format!("<w:next w:val=\"{BODY_STYLE}\"/>"),
            });
        }
    }

    let mut bullet = Style::new(BULLET_STYLE, "List Bullet", StyleKind::Paragraph);
    bullet.based_on = Some(BODY_STYLE.into());
    bullet.para.numbering = Some(NumberingRef {
        num_id: BULLET_NUM_ID.into(),
        level: 0,
    });
    sheet.insert(bullet);

    let mut number = Style::new(NUMBER_STYLE, "List Number", StyleKind::Paragraph);
    number.based_on = Some(BODY_STYLE.into());
    sheet.insert(number);

    sheet
}

fn qformat() -> RawXml {
    RawXml {
        name: "qFormat".into(),
        xml: "<w:qFormat/>".into(),
    }
}

fn numbering_xml() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:numbering xmlns:w=\"{}\">\
         <w:abstractNum w:abstractNumId=\"0\">\
         <w:multiLevelType w:val=\"hybridMultilevel\"/>\
         <w:lvl w:ilvl=\"0\"><w:start w:val=\"1\"/><w:numFmt w:val=\"bullet\"/>\
         <w:lvlText w:val=\"\u{2022}\"/><w:lvlJc w:val=\"left\"/>\
         <w:pPr><w:ind w:left=\"720\" w:hanging=\"360\"/></w:pPr></w:lvl>\
         </w:abstractNum>\
         <w:num w:numId=\"{BULLET_NUM_ID}\"><w:abstractNumId w:val=\"0\"/></w:num>\
         </w:numbering>",
        crate::docx::WML_NS,
    )
}

/// US Letter with one-inch margins.
fn page_setup() -> Vec<RawXml> {
    vec![
        RawXml {
            name: "pgSz".into(),
            xml: "<w:pgSz w:w=\"12240\" w:h=\"15840\"/>".into(),
        },
        RawXml {
            name: "pgMar".into(),
            xml: "<w:pgMar w:top=\"1440\" w:right=\"1440\" w:bottom=\"1440\" w:left=\"1440\" \
                  w:header=\"720\" w:footer=\"720\" w:gutter=\"0\"/>"
                .into(),
        },
    ]
}

fn body_run(text: &str, brand: &BrandProfile) -> Run {
    Run {
        props: RunProps {
            font: Some(brand.body_font.clone()),
            size: Some(brand.body_half_points()),
            ..Default::default()
        },
        ..Run::new(text)
    }
}

fn heading_paragraph(text: &str, level: u8, style_id: String, brand: &BrandProfile) -> Paragraph {
    let mut paragraph = Paragraph::with_style(&style_id);
    paragraph.props.spacing = Spacing {
        before: Some(if level > 1 { HEADING_SPACE_BEFORE } else { 0 }),
        after: Some(0),
        line: Some(LineSpacing::Multiple(1.0)),
    };
    paragraph.runs.push(Run {
        props: RunProps {
            font: Some(brand.heading_font.clone()),
            color: Some(Color::Rgb(brand.primary.rgb)),
            bold: Some(true),
            size: Some(brand.heading_half_points(level)),
            ..Default::default()
        },
        ..Run::new(text)
    });
    paragraph
}

/// Turns plain text into a new branded document, ready for the footer logo.
pub fn build_document(text: &str, brand: &BrandProfile) -> Document {
    let mut doc = Document::empty();
    doc.styles = branded_stylesheet(brand);
    let rules = &brand.headings;
    let mut blocks = Vec::new();

    for (index, line) in text.split('\n').enumerate() {
        let line = line.trim();
        if line.is_empty() {
            blocks.push(Block::Paragraph(Paragraph::default()));
            continue;
        }

        let paragraph = if let Some(level) = line_heading_level(line, index == 0, rules) {
            let style_id = doc.styles.ensure_heading(level);
            heading_paragraph(line, level, style_id, brand)
        } else if line.starts_with(['-', '\u{2022}']) {
            let item = line.trim_start_matches(['-', '\u{2022}']).trim();
            let mut paragraph = Paragraph::with_style(BULLET_STYLE);
            paragraph.runs.push(body_run(item, brand));
            paragraph
        } else if is_numbered_item(line, rules.numbered_prefix_window) {
            let mut paragraph = Paragraph::with_style(NUMBER_STYLE);
            paragraph.runs.push(body_run(line, brand));
            paragraph
        } else {
            let mut paragraph = Paragraph::default();
            paragraph.props.spacing = Spacing {
                before: None,
                after: Some(BODY_SPACE_AFTER),
                line: Some(LineSpacing::Multiple(1.15)),
            };
            paragraph.runs.push(body_run(line, brand));
            paragraph
        };
        blocks.push(Block::Paragraph(paragraph));
    }

    let section = &mut doc.sections[0];
    section.blocks = blocks;
    section.props.extra = page_setup();

    let numbering_part = format!("{}numbering.xml", doc.package.main_dir());
    doc.package
        .parts
        .insert(numbering_part.clone(), numbering_xml().into_bytes());
    doc.package.add_rel(REL_NUMBERING, "numbering.xml", false);
    doc.package.set_override(&numbering_part, CT_NUMBERING);

    log::info!("assembled {} paragraph(s) from text", doc.paragraphs().count());
    doc
}
