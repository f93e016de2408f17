use std::collections::BTreeMap;
use std::io::{Read, Seek};
use std::path::Path;

use crate::error::Error;
use crate::model::{
    Alignment, Block, Color, ContentTypes, Document, LineSpacing, Link, Namespaces, NumberingRef, Package,
    ParaProps, Paragraph, PartRef, RawXml, Relationship, Rgb, Run, RunProps, SINGLE_LINE, Section,
    SectionProps, Spacing, Style, StyleKind, StyleSheet, Table, TableCell, TableRow, Underline,
    REL_STYLES, rels_path_for,
};

pub(crate) const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(crate) const REL_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const MC_NS: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";

const CONTENT_TYPES: &str = "[Content_Types].xml";
const ROOT_RELS: &str = "_rels/.rels";

fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

fn twips_attr(node: roxmltree::Node, attr: &str) -> Option<u32> {
    node.attribute((WML_NS, attr))
        .and_then(|v| v.parse::<f32>().ok())
        .filter(|v| *v >= 0.0)
        .map(|v| v.round() as u32)
}

/// `<w:b/>`, `<w:b w:val="true"/>` and friends; only an explicit false value turns it off.
fn on_off(node: roxmltree::Node) -> bool {
    !matches!(
        node.attribute((WML_NS, "val")),
        Some("0" | "false" | "off")
    )
}

fn raw(node: roxmltree::Node, src: &str) -> RawXml {
    RawXml {
        name: node.tag_name().name().to_string(),
        xml: src[node.range()].to_string(),
    }
}

fn dml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(DML_NS))
}

fn latin_typeface<'a>(node: roxmltree::Node<'a, 'a>) -> Option<&'a str> {
    dml(node, "latin")
        .and_then(|n| n.attribute("typeface"))
        .filter(|tf| !tf.is_empty())
}

struct ThemeFonts {
    major: Option<String>,
    minor: Option<String>,
}

struct Ctx<'s> {
    src: &'s str,
    theme: &'s ThemeFonts,
    comment_marks: usize,
}

fn part_str<'p>(parts: &'p BTreeMap<String, Vec<u8>>, name: &str) -> Result<Option<&'p str>, Error> {
    match parts.get(name) {
        None => Ok(None),
        Some(bytes) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| Error::InvalidDocx(format!("{name} is not UTF-8: {e}")))?;
            Ok(Some(text.trim_start_matches('\u{feff}')))
        }
    }
}

fn parse_theme(xml_content: Option<&str>) -> ThemeFonts {
    let mut fonts = ThemeFonts { major: None, minor: None };
    let Some(xml_content) = xml_content else {
        return fonts;
    };
    let Ok(xml) = roxmltree::Document::parse(xml_content) else {
        log::warn!("theme part is not well-formed, theme fonts ignored");
        return fonts;
    };

    for node in xml.descendants() {
        if node.tag_name().namespace() != Some(DML_NS) {
            continue;
        }
        match node.tag_name().name() {
            "majorFont" => fonts.major = latin_typeface(node).map(str::to_string),
            "minorFont" => fonts.minor = latin_typeface(node).map(str::to_string),
            _ => {}
        }
    }
    fonts
}

fn resolve_font(rfonts: roxmltree::Node, theme: &ThemeFonts) -> Option<String> {
    if let Some(f) = rfonts.attribute((WML_NS, "ascii")) {
        return Some(f.to_string());
    }
    match rfonts.attribute((WML_NS, "asciiTheme")) {
        Some("majorHAnsi") => theme.major.clone(),
        Some("minorHAnsi") => theme.minor.clone(),
        _ => rfonts.attribute((WML_NS, "hAnsi")).map(str::to_string),
    }
}

fn root_namespaces(root: roxmltree::Node) -> Namespaces {
    Namespaces {
        decls: root
            .namespaces()
            .filter(|ns| ns.name() != Some("xml"))
            .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
            .collect(),
        ignorable: root.attribute((MC_NS, "Ignorable")).map(str::to_string),
    }
}

fn parse_alignment(val: &str) -> Alignment {
    match val {
        "left" | "start" => Alignment::Left,
        "center" => Alignment::Center,
        "right" | "end" => Alignment::Right,
        "both" | "justify" => Alignment::Justify,
        other => Alignment::Other(other.to_string()),
    }
}

fn parse_spacing(node: roxmltree::Node) -> Spacing {
    let line = twips_attr(node, "line").map(|line| match node.attribute((WML_NS, "lineRule")) {
        Some("exact") => LineSpacing::Exact(line),
        Some("atLeast") => LineSpacing::AtLeast(line),
        _ => LineSpacing::Multiple(line as f32 / SINGLE_LINE as f32),
    });
    Spacing {
        before: twips_attr(node, "before"),
        after: twips_attr(node, "after"),
        line,
    }
}

fn parse_run_props(rpr: roxmltree::Node, theme: &ThemeFonts, src: &str) -> RunProps {
    let mut props = RunProps::default();
    let mut size_cs = None;

    for child in rpr.children().filter(|n| n.is_element()) {
        if child.tag_name().namespace() != Some(WML_NS) {
            props.extra.push(raw(child, src));
            continue;
        }
        let val = child.attribute((WML_NS, "val"));
        match child.tag_name().name() {
            "rStyle" => props.style = val.map(str::to_string),
            "rFonts" => match resolve_font(child, theme) {
                Some(font) => props.font = Some(font),
                None => props.extra.push(raw(child, src)),
            },
            "b" => props.bold = Some(on_off(child)),
            "i" => props.italic = Some(on_off(child)),
            "smallCaps" => props.small_caps = Some(on_off(child)),
            "caps" => props.caps = Some(on_off(child)),
            "u" => {
                props.underline = Some(match val {
                    Some("none") => Underline::None,
                    Some(kind) => Underline::Line(kind.to_string()),
                    None => Underline::Line("single".to_string()),
                })
            }
            "color" => match val {
                Some("auto") => props.color = Some(Color::Auto),
                Some(hex) => match Rgb::from_hex(hex) {
                    Some(rgb) => props.color = Some(Color::Rgb(rgb)),
                    None => props.extra.push(raw(child, src)),
                },
                None => props.extra.push(raw(child, src)),
            },
            "sz" => {
                props.size = val
                    .and_then(|v| v.parse::<f32>().ok())
                    .map(|hp| hp.round() as u32)
            }
            "szCs" => size_cs = Some(raw(child, src)),
            _ => props.extra.push(raw(child, src)),
        }
    }

    if props.size.is_none()
        && let Some(size_cs) = size_cs
    {
        props.extra.push(size_cs);
    }
    props
}

fn parse_para_props(ppr: roxmltree::Node, src: &str) -> ParaProps {
    let mut props = ParaProps::default();

    for child in ppr.children().filter(|n| n.is_element()) {
        if child.tag_name().namespace() != Some(WML_NS) {
            props.extra.push(raw(child, src));
            continue;
        }
        match child.tag_name().name() {
            "pStyle" => props.style = child.attribute((WML_NS, "val")).map(str::to_string),
            "jc" => props.alignment = child.attribute((WML_NS, "val")).map(parse_alignment),
            "spacing" => props.spacing = parse_spacing(child),
            "numPr" => {
                props.numbering = wml_attr(child, "numId").map(|num_id| NumberingRef {
                    num_id: num_id.to_string(),
                    level: wml_attr(child, "ilvl")
                        .and_then(|v| v.parse::<u8>().ok())
                        .unwrap_or(0),
                })
            }
            // Section breaks are lifted into the section model by the body parser.
            "sectPr" => {}
            _ => props.extra.push(raw(child, src)),
        }
    }

    props
}

fn parse_section_props(sect: roxmltree::Node, src: &str) -> SectionProps {
    let mut props = SectionProps::default();
    for child in sect.children().filter(|n| n.is_element()) {
        let part_ref = || PartRef {
            kind: child
                .attribute((WML_NS, "type"))
                .unwrap_or("default")
                .to_string(),
            rel_id: child.attribute((REL_NS, "id")).unwrap_or_default().to_string(),
        };
        if is_wml(child, "headerReference") {
            props.headers.push(part_ref());
        } else if is_wml(child, "footerReference") {
            props.footers.push(part_ref());
        } else {
            props.extra.push(raw(child, src));
        }
    }
    props
}

/// Reads one `w:r`. A run mixing text with other content (symbols, hyphens,
/// page breaks, drawings) is split at each object so document order survives.
fn parse_run(node: roxmltree::Node, link: Option<&Link>, ctx: &mut Ctx) -> Vec<Run> {
    let props = node
        .children()
        .find(|n| is_wml(*n, "rPr"))
        .map(|n| parse_run_props(n, ctx.theme, ctx.src))
        .unwrap_or_default();
    let fresh = || Run {
        props: props.clone(),
        link: link.cloned(),
        ..Default::default()
    };

    let mut runs = Vec::new();
    let mut current = fresh();
    let mut has_content = false;

    for child in node.children().filter(|n| n.is_element()) {
        let text = if child.tag_name().namespace() != Some(WML_NS) {
            None
        } else {
            match child.tag_name().name() {
                "rPr" | "lastRenderedPageBreak" => continue,
                "commentReference" => {
                    ctx.comment_marks += 1;
                    continue;
                }
                "t" => Some(child.text().unwrap_or_default()),
                "tab" => Some("\t"),
                "br" if child.attribute((WML_NS, "type")).is_none_or(|t| t == "textWrapping") => {
                    Some("\n")
                }
                "cr" => Some("\n"),
                _ => None,
            }
        };

        match text {
            Some(text) => {
                if !current.objects.is_empty() {
                    runs.push(std::mem::replace(&mut current, fresh()));
                }
                current.text.push_str(text);
            }
            None => {
                if !current.text.is_empty() {
                    runs.push(std::mem::replace(&mut current, fresh()));
                }
                current.objects.push(raw(child, ctx.src));
            }
        }
        has_content = true;
    }

    if has_content {
        runs.push(current);
    }
    runs
}

fn opaque(node: roxmltree::Node, src: &str) -> Run {
    Run {
        opaque: Some(raw(node, src)),
        ..Default::default()
    }
}

/// Hyperlink children other than runs (tracked changes, fields, bookmarks)
/// stay inside the link as opaque entries.
fn parse_link_content(node: roxmltree::Node, link: &Link, runs: &mut Vec<Run>, ctx: &mut Ctx) {
    for child in node.children().filter(|n| n.is_element()) {
        if is_wml(child, "r") {
            runs.extend(parse_run(child, Some(link), ctx));
        } else if is_wml(child, "commentRangeStart") || is_wml(child, "commentRangeEnd") {
            ctx.comment_marks += 1;
        } else if !is_wml(child, "proofErr") {
            let mut entry = opaque(child, ctx.src);
            entry.link = Some(link.clone());
            runs.push(entry);
        }
    }
}

fn parse_paragraph(node: roxmltree::Node, ctx: &mut Ctx) -> Paragraph {
    let mut paragraph = Paragraph::default();

    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().namespace() != Some(WML_NS) {
            paragraph.runs.push(opaque(child, ctx.src));
            continue;
        }
        match child.tag_name().name() {
            "pPr" => paragraph.props = parse_para_props(child, ctx.src),
            "r" => paragraph.runs.extend(parse_run(child, None, ctx)),
            "hyperlink" => {
                let link = Link {
                    rel_id: child.attribute((REL_NS, "id")).map(str::to_string),
                    anchor: child.attribute((WML_NS, "anchor")).map(str::to_string),
                };
                parse_link_content(child, &link, &mut paragraph.runs, ctx);
            }
            "commentRangeStart" | "commentRangeEnd" => ctx.comment_marks += 1,
            "proofErr" => {}
            _ => paragraph.runs.push(opaque(child, ctx.src)),
        }
    }

    coalesce_runs(&mut paragraph.runs);
    paragraph
}

/// Merges neighbouring text runs that share every property, so a word split
/// across identical runs reads as one.
fn coalesce_runs(runs: &mut Vec<Run>) {
    let mut merged: Vec<Run> = Vec::with_capacity(runs.len());
    for run in runs.drain(..) {
        if let Some(last) = merged.last_mut()
            && last.is_plain_text()
            && run.is_plain_text()
            && last.props == run.props
            && last.link == run.link
        {
            last.text.push_str(&run.text);
            continue;
        }
        merged.push(run);
    }
    *runs = merged;
}

fn parse_table(node: roxmltree::Node, ctx: &mut Ctx) -> Table {
    let mut table = Table::default();
    for child in node.children().filter(|n| n.is_element()) {
        if is_wml(child, "tr") {
            table.rows.push(parse_row(child, ctx));
        } else if is_wml(child, "tblPr") || is_wml(child, "tblGrid") {
            table.props.push(raw(child, ctx.src));
        } else {
            log::debug!("dropping table child <{}>", child.tag_name().name());
        }
    }
    table
}

fn parse_row(node: roxmltree::Node, ctx: &mut Ctx) -> TableRow {
    let mut row = TableRow::default();
    for child in node.children().filter(|n| n.is_element()) {
        if is_wml(child, "tc") {
            let mut cell = TableCell::default();
            for inner in child.children().filter(|n| n.is_element()) {
                if is_wml(inner, "tcPr") {
                    cell.props.push(raw(inner, ctx.src));
                } else {
                    cell.blocks.push(parse_block(inner, ctx));
                }
            }
            row.cells.push(cell);
        } else if is_wml(child, "trPr") || is_wml(child, "tblPrEx") {
            row.props.push(raw(child, ctx.src));
        } else {
            log::debug!("dropping table row child <{}>", child.tag_name().name());
        }
    }
    row
}

fn parse_block(node: roxmltree::Node, ctx: &mut Ctx) -> Block {
    if is_wml(node, "p") {
        Block::Paragraph(parse_paragraph(node, ctx))
    } else if is_wml(node, "tbl") {
        Block::Table(parse_table(node, ctx))
    } else {
        Block::Raw(raw(node, ctx.src))
    }
}

fn parse_body(body: roxmltree::Node, ctx: &mut Ctx) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section::default();

    for node in body.children().filter(|n| n.is_element()) {
        if is_wml(node, "sectPr") {
            current.props = parse_section_props(node, ctx.src);
            continue;
        }
        let inner_sect = is_wml(node, "p")
            .then(|| wml(node, "pPr").and_then(|ppr| wml(ppr, "sectPr")))
            .flatten();
        current.blocks.push(parse_block(node, ctx));
        if let Some(sect) = inner_sect {
            current.props = parse_section_props(sect, ctx.src);
            sections.push(std::mem::take(&mut current));
        }
    }

    if !current.blocks.is_empty() || sections.is_empty() || current.props != SectionProps::default() {
        sections.push(current);
    }
    sections
}

fn parse_styles(xml_content: &str, theme: &ThemeFonts) -> Result<StyleSheet, Error> {
    let mut sheet = StyleSheet::default();
    let xml = roxmltree::Document::parse(xml_content)?;
    let root = xml.root_element();
    sheet.namespaces = root_namespaces(root);

    if let Some(doc_defaults) = wml(root, "docDefaults") {
        if let Some(rpr) = wml(doc_defaults, "rPrDefault").and_then(|n| wml(n, "rPr")) {
            sheet.default_run = parse_run_props(rpr, theme, xml_content);
        }
        if let Some(ppr) = wml(doc_defaults, "pPrDefault").and_then(|n| wml(n, "pPr")) {
            sheet.default_para = parse_para_props(ppr, xml_content);
        }
    }

    if let Some(latent) = wml(root, "latentStyles") {
        sheet.latent = Some(raw(latent, xml_content));
    }

    for style_node in root.children().filter(|n| is_wml(*n, "style")) {
        let Some(style_id) = style_node.attribute((WML_NS, "styleId")) else {
            continue;
        };
        let kind = match style_node.attribute((WML_NS, "type")) {
            Some("character") => StyleKind::Character,
            Some("table") => StyleKind::Table,
            Some("numbering") => StyleKind::Numbering,
            _ => StyleKind::Paragraph,
        };
        let name = wml_attr(style_node, "name").unwrap_or(style_id);
        let mut style = Style::new(style_id, name, kind);
        style.based_on = wml_attr(style_node, "basedOn").map(str::to_string);
        style.is_default = matches!(
            style_node.attribute((WML_NS, "default")),
            Some("1" | "true" | "on")
        );

        for child in style_node.children().filter(|n| n.is_element()) {
            if is_wml(child, "name") || is_wml(child, "basedOn") {
                continue;
            } else if is_wml(child, "rPr") {
                style.run = parse_run_props(child, theme, xml_content);
            } else if is_wml(child, "pPr") {
                style.para = parse_para_props(child, xml_content);
            } else {
                style.extra.push(raw(child, xml_content));
            }
        }
        sheet.insert(style);
    }

    Ok(sheet)
}

fn parse_rels(xml_content: &str) -> Result<Vec<Relationship>, Error> {
    let xml = roxmltree::Document::parse(xml_content)?;
    Ok(xml
        .root_element()
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
        .filter_map(|n| {
            Some(Relationship {
                id: n.attribute("Id")?.to_string(),
                rel_type: n.attribute("Type")?.to_string(),
                target: n.attribute("Target")?.to_string(),
                external: n.attribute("TargetMode") == Some("External"),
            })
        })
        .collect())
}

fn parse_content_types(xml_content: &str) -> Result<ContentTypes, Error> {
    let xml = roxmltree::Document::parse(xml_content)?;
    let mut types = ContentTypes::default();
    for node in xml.root_element().children().filter(|n| n.is_element()) {
        let Some(content_type) = node.attribute("ContentType") else {
            continue;
        };
        match node.tag_name().name() {
            "Default" => {
                if let Some(ext) = node.attribute("Extension") {
                    types.defaults.push((ext.to_string(), content_type.to_string()));
                }
            }
            "Override" => {
                if let Some(part) = node.attribute("PartName") {
                    types.overrides.push((part.to_string(), content_type.to_string()));
                }
            }
            _ => {}
        }
    }
    Ok(types)
}

fn main_part_name(parts: &BTreeMap<String, Vec<u8>>) -> Result<String, Error> {
    let from_rels = match part_str(parts, ROOT_RELS)? {
        Some(xml) => parse_rels(xml)?
            .into_iter()
            .find(|r| r.rel_type.ends_with("/officeDocument"))
            .map(|r| r.target.trim_start_matches('/').to_string()),
        None => None,
    };
    let name = from_rels.unwrap_or_else(|| "word/document.xml".to_string());
    if parts.contains_key(&name) {
        Ok(name)
    } else {
        Err(Error::InvalidDocx(format!("missing main document part {name}")))
    }
}

pub fn read(path: &Path) -> Result<Document, Error> {
    let file = std::fs::File::open(path)?;
    read_from(file)
}

pub fn read_from<R: Read + Seek>(reader: R) -> Result<Document, Error> {
    let mut zip = zip::ZipArchive::new(reader)?;
    let mut parts = BTreeMap::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        parts.insert(entry.name().to_string(), bytes);
    }

    let mut package = Package {
        main_part: main_part_name(&parts)?,
        ..Default::default()
    };

    if let Some(xml) = part_str(&parts, CONTENT_TYPES)? {
        package.content_types = parse_content_types(xml)?;
    }
    let main_rels = rels_path_for(&package.main_part);
    if let Some(xml) = part_str(&parts, &main_rels)? {
        package.rels = parse_rels(xml)?;
    }

    let theme_part = package
        .rels
        .iter()
        .find(|r| r.rel_type.ends_with("/theme"))
        .map(|r| package.target_path(r));
    let theme = parse_theme(match theme_part.as_deref() {
        Some(name) => part_str(&parts, name)?,
        None => None,
    });

    let styles_part = package
        .rel_of_type(REL_STYLES)
        .map(|r| package.target_path(r));
    let styles = match styles_part.as_deref() {
        Some(name) => match part_str(&parts, name)? {
            Some(xml) => parse_styles(xml, &theme)?,
            None => StyleSheet::default(),
        },
        None => StyleSheet::default(),
    };

    let (sections, comment_marks, namespaces) = {
        let xml_content = part_str(&parts, &package.main_part)?
            .ok_or_else(|| Error::InvalidDocx("missing main document part".into()))?;
        let xml = roxmltree::Document::parse(xml_content)?;
        let root = xml.root_element();

        let body =
            wml(root, "body").ok_or_else(|| Error::InvalidDocx("missing w:body".into()))?;

        let mut ctx = Ctx {
            src: xml_content,
            theme: &theme,
            comment_marks: 0,
        };
        let sections = parse_body(body, &mut ctx);
        (sections, ctx.comment_marks, root_namespaces(root))
    };

    // Regenerated by the writer.
    let mut regenerated = vec![CONTENT_TYPES.to_string(), package.main_part.clone(), main_rels];
    regenerated.extend(styles_part);
    for name in &regenerated {
        parts.remove(name);
    }
    package.parts = parts;

    log::debug!(
        "read {} section(s), {} style(s), {} passthrough part(s)",
        sections.len(),
        styles.styles.len(),
        package.parts.len()
    );

    Ok(Document {
        sections,
        styles,
        package,
        namespaces,
        comment_marks,
    })
}
