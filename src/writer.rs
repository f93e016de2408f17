//! Serializes a [`Document`] back into a DOCX package.
//!
//! The main document part, the style part, the main part's relationships and
//! `[Content_Types].xml` are regenerated from the model; every other part is
//! copied through unchanged.

use std::borrow::Cow;
use std::io::{Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;

use crate::docx::{REL_NS, WML_NS};
use crate::error::Error;
use crate::model::{
    Alignment, Block, Color, ContentTypes, Document, LineSpacing, Link, Namespaces, ParaProps,
    Paragraph, RawXml, Relationship, Run, RunProps, SINGLE_LINE, SectionProps, Style, StyleSheet,
    Table, Underline, REL_STYLES, rels_path_for,
};

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";
const MC_NS: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";
const PKG_RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

pub(crate) const CT_MAIN: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
pub(crate) const CT_STYLES: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
pub(crate) const CT_RELS: &str = "application/vnd.openxmlformats-package.relationships+xml";

const PPR_ORDER: &[&str] = &[
    "pStyle", "keepNext", "keepLines", "pageBreakBefore", "framePr", "widowControl", "numPr",
    "suppressLineNumbers", "pBdr", "shd", "tabs", "suppressAutoHyphens", "kinsoku", "wordWrap",
    "overflowPunct", "topLinePunct", "autoSpaceDE", "autoSpaceDN", "bidi", "adjustRightInd",
    "snapToGrid", "spacing", "ind", "contextualSpacing", "mirrorIndents", "suppressOverlap", "jc",
    "textDirection", "textAlignment", "textboxTightWrap", "outlineLvl", "divId", "cnfStyle", "rPr",
    "sectPr", "pPrChange",
];

const RPR_ORDER: &[&str] = &[
    "rStyle", "rFonts", "b", "bCs", "i", "iCs", "caps", "smallCaps", "strike", "dstrike",
    "outline", "shadow", "emboss", "imprint", "noProof", "snapToGrid", "vanish", "webHidden",
    "color", "spacing", "w", "kern", "position", "sz", "szCs", "highlight", "u", "effect", "bdr",
    "shd", "fitText", "vertAlign", "rtl", "cs", "em", "lang", "eastAsianLayout", "specVanish",
    "oMath", "rPrChange",
];

const STYLE_ORDER: &[&str] = &[
    "name", "aliases", "basedOn", "next", "link", "autoRedefine", "hidden", "uiPriority",
    "semiHidden", "unhideWhenUsed", "qFormat", "locked", "personal", "personalCompose",
    "personalReply", "rsid", "pPr", "rPr", "tblPr", "trPr", "tcPr", "tblStylePr",
];

const SECT_ORDER: &[&str] = &[
    "headerReference", "footerReference", "footnotePr", "endnotePr", "type", "pgSz", "pgMar",
    "paperSrc", "pgBorders", "lnNumType", "pgNumType", "cols", "formProt", "vAlign", "noEndnote",
    "titlePg", "textDirection", "bidi", "rtlGutter", "docGrid", "printerSettings", "sectPrChange",
];

pub(crate) fn esc(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}

/// Elements tagged with their local name, emitted in schema order.
struct Ordered<'o> {
    order: &'o [&'o str],
    items: Vec<(usize, String)>,
}

impl<'o> Ordered<'o> {
    fn new(order: &'o [&'o str]) -> Self {
        Ordered { order, items: Vec::new() }
    }

    fn push(&mut self, name: &str, xml: String) {
        let rank = self
            .order
            .iter()
            .position(|n| *n == name)
            .unwrap_or(self.order.len());
        self.items.push((rank, xml));
    }

    fn extend(&mut self, raws: &[RawXml]) {
        for raw in raws {
            self.push(&raw.name, raw.xml.clone());
        }
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn finish(mut self) -> String {
        self.items.sort_by_key(|(rank, _)| *rank);
        self.items.into_iter().map(|(_, xml)| xml).collect()
    }
}

fn on_off(name: &str, value: bool) -> String {
    if value {
        format!("<w:{name}/>")
    } else {
        format!("<w:{name} w:val=\"0\"/>")
    }
}

pub(crate) fn run_props_xml(props: &RunProps) -> String {
    let mut out = Ordered::new(RPR_ORDER);
    if let Some(style) = &props.style {
        out.push("rStyle", format!("<w:rStyle w:val=\"{}\"/>", esc(style)));
    }
    if let Some(font) = &props.font {
        let font = esc(font);
        out.push(
            "rFonts",
            format!("<w:rFonts w:ascii=\"{font}\" w:hAnsi=\"{font}\" w:cs=\"{font}\"/>"),
        );
    }
    if let Some(bold) = props.bold {
        out.push("b", on_off("b", bold));
    }
    if let Some(italic) = props.italic {
        out.push("i", on_off("i", italic));
    }
    if let Some(caps) = props.caps {
        out.push("caps", on_off("caps", caps));
    }
    if let Some(small_caps) = props.small_caps {
        out.push("smallCaps", on_off("smallCaps", small_caps));
    }
    match props.color {
        Some(Color::Auto) => out.push("color", "<w:color w:val=\"auto\"/>".to_string()),
        Some(Color::Rgb(rgb)) => out.push("color", format!("<w:color w:val=\"{}\"/>", rgb.to_hex())),
        None => {}
    }
    if let Some(size) = props.size {
        out.push("sz", format!("<w:sz w:val=\"{size}\"/>"));
        out.push("szCs", format!("<w:szCs w:val=\"{size}\"/>"));
    }
    match &props.underline {
        Some(Underline::None) => out.push("u", "<w:u w:val=\"none\"/>".to_string()),
        Some(Underline::Line(kind)) => out.push("u", format!("<w:u w:val=\"{}\"/>", esc(kind))),
        None => {}
    }
    out.extend(&props.extra);

    if out.is_empty() {
        String::new()
    } else {
        format!("<w:rPr>{}</w:rPr>", out.finish())
    }
}

fn alignment_val(alignment: &Alignment) -> Cow<'_, str> {
    match alignment {
        Alignment::Left => Cow::Borrowed("left"),
        Alignment::Center => Cow::Borrowed("center"),
        Alignment::Right => Cow::Borrowed("right"),
        Alignment::Justify => Cow::Borrowed("both"),
        Alignment::Other(val) => esc(val),
    }
}

fn spacing_xml(props: &ParaProps) -> Option<String> {
    let spacing = &props.spacing;
    if spacing.is_empty() {
        return None;
    }
    let mut xml = String::from("<w:spacing");
    if let Some(before) = spacing.before {
        xml.push_str(&format!(" w:before=\"{before}\""));
    }
    if let Some(after) = spacing.after {
        xml.push_str(&format!(" w:after=\"{after}\""));
    }
    match spacing.line {
        Some(LineSpacing::Multiple(factor)) => xml.push_str(&format!(
            " w:line=\"{}\" w:lineRule=\"auto\"",
            (factor * SINGLE_LINE as f32).round() as u32
        )),
        Some(LineSpacing::Exact(line)) => {
            xml.push_str(&format!(" w:line=\"{line}\" w:lineRule=\"exact\""))
        }
        Some(LineSpacing::AtLeast(line)) => {
            xml.push_str(&format!(" w:line=\"{line}\" w:lineRule=\"atLeast\""))
        }
        None => {}
    }
    xml.push_str("/>");
    Some(xml)
}

fn para_props_xml(props: &ParaProps, sect: Option<&SectionProps>) -> String {
    let mut out = Ordered::new(PPR_ORDER);
    if let Some(style) = &props.style {
        out.push("pStyle", format!("<w:pStyle w:val=\"{}\"/>", esc(style)));
    }
    if let Some(numbering) = &props.numbering {
        out.push(
            "numPr",
            format!(
                "<w:numPr><w:ilvl w:val=\"{}\"/><w:numId w:val=\"{}\"/></w:numPr>",
                numbering.level,
                esc(&numbering.num_id)
            ),
        );
    }
    if let Some(spacing) = spacing_xml(props) {
        out.push("spacing", spacing);
    }
    if let Some(alignment) = &props.alignment {
        out.push("jc", format!("<w:jc w:val=\"{}\"/>", alignment_val(alignment)));
    }
    out.extend(&props.extra);
    if let Some(sect) = sect {
        out.push("sectPr", section_props_xml(sect));
    }

    if out.is_empty() {
        String::new()
    } else {
        format!("<w:pPr>{}</w:pPr>", out.finish())
    }
}

fn section_props_xml(props: &SectionProps) -> String {
    let mut out = Ordered::new(SECT_ORDER);
    for header in &props.headers {
        out.push(
            "headerReference",
            format!(
                "<w:headerReference w:type=\"{}\" r:id=\"{}\"/>",
                esc(&header.kind),
                esc(&header.rel_id)
            ),
        );
    }
    for footer in &props.footers {
        out.push(
            "footerReference",
            format!(
                "<w:footerReference w:type=\"{}\" r:id=\"{}\"/>",
                esc(&footer.kind),
                esc(&footer.rel_id)
            ),
        );
    }
    out.extend(&props.extra);
    format!("<w:sectPr>{}</w:sectPr>", out.finish())
}

fn run_xml(run: &Run, out: &mut String) {
    if let Some(opaque) = &run.opaque {
        out.push_str(&opaque.xml);
        return;
    }
    out.push_str("<w:r>");
    out.push_str(&run_props_xml(&run.props));
    for object in &run.objects {
        out.push_str(&object.xml);
    }
    fn flush(segment: &mut String, out: &mut String) {
        if !segment.is_empty() {
            out.push_str(&format!("<w:t xml:space=\"preserve\">{}</w:t>", esc(segment)));
            segment.clear();
        }
    }

    let mut segment = String::new();
    for ch in run.text.chars() {
        match ch {
            '\t' => {
                flush(&mut segment, out);
                out.push_str("<w:tab/>");
            }
            '\n' => {
                flush(&mut segment, out);
                out.push_str("<w:br/>");
            }
            _ => segment.push(ch),
        }
    }
    flush(&mut segment, out);
    out.push_str("</w:r>");
}

fn open_link(link: &Link, out: &mut String) {
    out.push_str("<w:hyperlink");
    if let Some(rel_id) = &link.rel_id {
        out.push_str(&format!(" r:id=\"{}\"", esc(rel_id)));
    }
    if let Some(anchor) = &link.anchor {
        out.push_str(&format!(" w:anchor=\"{}\"", esc(anchor)));
    }
    out.push_str(" w:history=\"1\">");
}

pub(crate) fn paragraph_xml(paragraph: &Paragraph, sect: Option<&SectionProps>, out: &mut String) {
    out.push_str("<w:p>");
    out.push_str(&para_props_xml(&paragraph.props, sect));
    let mut open: Option<&Link> = None;
    for run in &paragraph.runs {
        if open != run.link.as_ref() {
            if open.is_some() {
                out.push_str("</w:hyperlink>");
            }
            if let Some(link) = &run.link {
                open_link(link, out);
            }
            open = run.link.as_ref();
        }
        run_xml(run, out);
    }
    if open.is_some() {
        out.push_str("</w:hyperlink>");
    }
    out.push_str("</w:p>");
}

fn table_xml(table: &Table, out: &mut String) {
    out.push_str("<w:tbl>");
    for prop in &table.props {
        out.push_str(&prop.xml);
    }
    for row in &table.rows {
        out.push_str("<w:tr>");
        for prop in &row.props {
            out.push_str(&prop.xml);
        }
        for cell in &row.cells {
            out.push_str("<w:tc>");
            for prop in &cell.props {
                out.push_str(&prop.xml);
            }
            if !matches!(cell.blocks.last(), Some(Block::Paragraph(_))) {
                blocks_xml(&cell.blocks, out);
                out.push_str("<w:p/>");
            } else {
                blocks_xml(&cell.blocks, out);
            }
            out.push_str("</w:tc>");
        }
        out.push_str("</w:tr>");
    }
    out.push_str("</w:tbl>");
}

fn blocks_xml(blocks: &[Block], out: &mut String) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => paragraph_xml(p, None, out),
            Block::Table(t) => table_xml(t, out),
            Block::Raw(raw) => out.push_str(&raw.xml),
        }
    }
}

/// Root element attributes: the source declarations plus the ones the
/// generated markup needs.
pub(crate) fn namespace_attrs(ns: &Namespaces, required: &[(&str, &str)]) -> String {
    let mut attrs = String::new();
    let mut declared: Vec<Option<&str>> = Vec::new();
    for (prefix, uri) in required {
        attrs.push_str(&format!(" xmlns:{prefix}=\"{}\"", esc(uri)));
        declared.push(Some(*prefix));
    }
    for (prefix, uri) in &ns.decls {
        if declared.contains(&prefix.as_deref()) {
            continue;
        }
        match prefix {
            Some(prefix) => attrs.push_str(&format!(" xmlns:{prefix}=\"{}\"", esc(uri))),
            None => attrs.push_str(&format!(" xmlns=\"{}\"", esc(uri))),
        }
        declared.push(prefix.as_deref());
    }
    let mc_declared = ns
        .decls
        .iter()
        .any(|(p, uri)| p.as_deref() == Some("mc") && uri == MC_NS);
    if let Some(ignorable) = &ns.ignorable
        && mc_declared
    {
        attrs.push_str(&format!(" mc:Ignorable=\"{}\"", esc(ignorable)));
    }
    attrs
}

pub fn render_document(doc: &Document) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str(&format!(
        "<w:document{}><w:body>",
        namespace_attrs(&doc.namespaces, &[("w", WML_NS), ("r", REL_NS)])
    ));

    let last = doc.sections.len().saturating_sub(1);
    for (i, section) in doc.sections.iter().enumerate() {
        if i == last {
            blocks_xml(&section.blocks, &mut out);
            out.push_str(&section_props_xml(&section.props));
            continue;
        }
        // A section break rides on the section's last paragraph.
        match section.blocks.split_last() {
            Some((Block::Paragraph(p), rest)) => {
                blocks_xml(rest, &mut out);
                paragraph_xml(p, Some(&section.props), &mut out);
            }
            _ => {
                blocks_xml(&section.blocks, &mut out);
                paragraph_xml(&Paragraph::default(), Some(&section.props), &mut out);
            }
        }
    }
    if doc.sections.is_empty() {
        out.push_str("<w:sectPr/>");
    }

    out.push_str("</w:body></w:document>");
    out
}

fn style_xml(style: &Style, out: &mut String) {
    out.push_str(&format!("<w:style w:type=\"{}\"", style.kind.as_str()));
    if style.is_default {
        out.push_str(" w:default=\"1\"");
    }
    out.push_str(&format!(" w:styleId=\"{}\">", esc(&style.id)));

    let mut children = Ordered::new(STYLE_ORDER);
    children.push("name", format!("<w:name w:val=\"{}\"/>", esc(&style.name)));
    if let Some(based_on) = &style.based_on {
        children.push("basedOn", format!("<w:basedOn w:val=\"{}\"/>", esc(based_on)));
    }
    let ppr = para_props_xml(&style.para, None);
    if !ppr.is_empty() {
        children.push("pPr", ppr);
    }
    let rpr = run_props_xml(&style.run);
    if !rpr.is_empty() {
        children.push("rPr", rpr);
    }
    children.extend(&style.extra);
    out.push_str(&children.finish());
    out.push_str("</w:style>");
}

pub fn render_styles(sheet: &StyleSheet) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str(&format!(
        "<w:styles{}>",
        namespace_attrs(&sheet.namespaces, &[("w", WML_NS), ("r", REL_NS)])
    ));

    let rpr = run_props_xml(&sheet.default_run);
    let ppr = para_props_xml(&sheet.default_para, None);
    if !rpr.is_empty() || !ppr.is_empty() {
        out.push_str("<w:docDefaults>");
        if !rpr.is_empty() {
            out.push_str(&format!("<w:rPrDefault>{rpr}</w:rPrDefault>"));
        }
        if !ppr.is_empty() {
            out.push_str(&format!("<w:pPrDefault>{ppr}</w:pPrDefault>"));
        }
        out.push_str("</w:docDefaults>");
    }
    if let Some(latent) = &sheet.latent {
        out.push_str(&latent.xml);
    }
    for style in sheet.styles.values() {
        style_xml(style, &mut out);
    }
    out.push_str("</w:styles>");
    out
}

pub(crate) fn render_rels(rels: &[Relationship]) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str(&format!("<Relationships xmlns=\"{PKG_RELS_NS}\">"));
    for rel in rels {
        out.push_str(&format!(
            "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"",
            esc(&rel.id),
            esc(&rel.rel_type),
            esc(&rel.target)
        ));
        if rel.external {
            out.push_str(" TargetMode=\"External\"");
        }
        out.push_str("/>");
    }
    out.push_str("</Relationships>");
    out
}

fn render_content_types(types: &ContentTypes) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str(&format!("<Types xmlns=\"{CONTENT_TYPES_NS}\">"));
    for (ext, content_type) in &types.defaults {
        out.push_str(&format!(
            "<Default Extension=\"{}\" ContentType=\"{}\"/>",
            esc(ext),
            esc(content_type)
        ));
    }
    for (part, content_type) in &types.overrides {
        out.push_str(&format!(
            "<Override PartName=\"{}\" ContentType=\"{}\"/>",
            esc(part),
            esc(content_type)
        ));
    }
    out.push_str("</Types>");
    out
}

fn root_rels(main_part: &str) -> String {
    render_rels(&[Relationship {
        id: "rId1".to_string(),
        rel_type: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument"
            .to_string(),
        target: main_part.to_string(),
        external: false,
    }])
}

pub fn write(doc: &Document, path: &Path) -> Result<(), Error> {
    let file = std::fs::File::create(path)?;
    write_to(doc, file)
}

pub fn write_to<W: Write + Seek>(doc: &Document, writer: W) -> Result<(), Error> {
    let package = &doc.package;
    let mut rels = package.rels.clone();
    let mut types = package.content_types.clone();

    let styles_part = match package.rel_of_type(REL_STYLES) {
        Some(rel) => package.target_path(rel),
        None => {
            let target = "styles.xml";
            rels.push(Relationship {
                id: crate::model::next_rel_id(&rels),
                rel_type: REL_STYLES.to_string(),
                target: target.to_string(),
                external: false,
            });
            format!("{}{target}", package.main_dir())
        }
    };

    for (ext, content_type) in [("rels", CT_RELS), ("xml", "application/xml")] {
        if !types.defaults.iter().any(|(e, _)| e.eq_ignore_ascii_case(ext)) {
            types.defaults.push((ext.to_string(), content_type.to_string()));
        }
    }
    let main_name = format!("/{}", package.main_part);
    if !types.overrides.iter().any(|(p, _)| *p == main_name) {
        types.overrides.push((main_name, CT_MAIN.to_string()));
    }
    let styles_name = format!("/{styles_part}");
    if !types.overrides.iter().any(|(p, _)| *p == styles_name) {
        types.overrides.push((styles_name, CT_STYLES.to_string()));
    }

    let mut zip = zip::ZipWriter::new(writer);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(render_content_types(&types).as_bytes())?;

    if !package.parts.contains_key("_rels/.rels") {
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(root_rels(&package.main_part).as_bytes())?;
    }

    zip.start_file(package.main_part.as_str(), options)?;
    zip.write_all(render_document(doc).as_bytes())?;

    zip.start_file(rels_path_for(&package.main_part), options)?;
    zip.write_all(render_rels(&rels).as_bytes())?;

    zip.start_file(styles_part.as_str(), options)?;
    zip.write_all(render_styles(&doc.styles).as_bytes())?;

    for (name, bytes) in &package.parts {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(bytes)?;
    }

    zip.finish()?;
    log::debug!("wrote package with {} passthrough part(s)", package.parts.len());
    Ok(())
}
