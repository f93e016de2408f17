use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Word's size when nothing in the style chain sets one (10pt).
pub const WORD_DEFAULT_HALF_POINTS: u32 = 20;
/// Twips per line for single line spacing.
pub const SINGLE_LINE: u32 = 240;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub [u8; 3]);

pub const BLACK: Rgb = Rgb([0, 0, 0]);

impl Rgb {
    pub fn from_hex(val: &str) -> Option<Rgb> {
        let val = val.strip_prefix('#').unwrap_or(val);
        if val.len() != 6 || !val.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&val[0..2], 16).ok()?;
        let g = u8::from_str_radix(&val[2..4], 16).ok()?;
        let b = u8::from_str_radix(&val[4..6], 16).ok()?;
        Some(Rgb([r, g, b]))
    }

    /// `RRGGBB`, the form `w:color/@w:val` takes.
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.0;
        format!("{r:02X}{g:02X}{b:02X}")
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::from_hex(&value).ok_or_else(|| format!("invalid color '{value}', expected #RRGGBB"))
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Auto,
    Rgb(Rgb),
}

impl Color {
    /// Anything other than automatic or black.
    pub fn is_non_default(self) -> bool {
        matches!(self, Color::Rgb(rgb) if rgb != BLACK)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
    Other(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Underline {
    None,
    Line(String),
}

impl Underline {
    pub fn is_visible(&self) -> bool {
        matches!(self, Underline::Line(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LineSpacing {
    /// Multiple of single spacing (`lineRule="auto"`).
    Multiple(f32),
    Exact(u32),
    AtLeast(u32),
}

/// Paragraph spacing; `before`/`after` in twips.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Spacing {
    pub before: Option<u32>,
    pub after: Option<u32>,
    pub line: Option<LineSpacing>,
}

impl Spacing {
    pub fn is_empty(&self) -> bool {
        self.before.is_none() && self.after.is_none() && self.line.is_none()
    }
}

/// An element the model does not interpret, kept verbatim.
#[derive(Clone, Debug, PartialEq)]
pub struct RawXml {
    /// Local name, used to keep schema order when re-emitting.
    pub name: String,
    pub xml: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunProps {
    pub style: Option<String>,
    pub font: Option<String>,
    /// Half-points.
    pub size: Option<u32>,
    pub color: Option<Color>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<Underline>,
    pub small_caps: Option<bool>,
    pub caps: Option<bool>,
    pub extra: Vec<RawXml>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NumberingRef {
    pub num_id: String,
    pub level: u8,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParaProps {
    pub style: Option<String>,
    pub alignment: Option<Alignment>,
    pub spacing: Spacing,
    pub numbering: Option<NumberingRef>,
    pub extra: Vec<RawXml>,
}

/// Membership of a run in a `w:hyperlink`.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub rel_id: Option<String>,
    pub anchor: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub props: RunProps,
    pub link: Option<Link>,
    /// Non-text run content (drawings, field characters). The reader keeps these
    /// in runs of their own, so a run carries either objects or text.
    pub objects: Vec<RawXml>,
    /// Set when this entry stands in for a paragraph child that is not a run
    /// (bookmark, field, tracked change); written back verbatim.
    pub opaque: Option<RawXml>,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Run {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn is_plain_text(&self) -> bool {
        self.objects.is_empty() && self.opaque.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Paragraph {
    pub props: ParaProps,
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn with_style(style: &str) -> Self {
        Paragraph {
            props: ParaProps {
                style: Some(style.to_string()),
                ..Default::default()
            },
            runs: Vec::new(),
        }
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// No visible text in the paragraph or any of its runs. Opaque entries
    /// holding text (tracked insertions, simple fields) count as visible.
    pub fn is_blank(&self) -> bool {
        self.text().trim().is_empty()
            && self.runs.iter().all(|r| {
                r.text.trim().is_empty()
                    && r
                        .opaque
                        .as_ref()
                        .is_none_or(|o| !o.xml.contains("<w:t>") && !o.xml.contains("<w:t "))
            })
    }

    /// First 50 characters of the text, for change-log locations.
    pub fn snippet(&self) -> String {
        self.text().chars().take(50).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableCell {
    pub props: Vec<RawXml>,
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableRow {
    pub props: Vec<RawXml>,
    pub cells: Vec<TableCell>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    /// `tblPr` and `tblGrid`, verbatim.
    pub props: Vec<RawXml>,
    pub rows: Vec<TableRow>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    Raw(RawXml),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PartRef {
    /// `default`, `first` or `even`.
    pub kind: String,
    pub rel_id: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SectionProps {
    pub headers: Vec<PartRef>,
    pub footers: Vec<PartRef>,
    pub extra: Vec<RawXml>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Section {
    pub blocks: Vec<Block>,
    pub props: SectionProps,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleKind {
    Paragraph,
    Character,
    Table,
    Numbering,
}

impl StyleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StyleKind::Paragraph => "paragraph",
            StyleKind::Character => "character",
            StyleKind::Table => "table",
            StyleKind::Numbering => "numbering",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Style {
    pub id: String,
    pub name: String,
    pub kind: StyleKind,
    pub based_on: Option<String>,
    pub is_default: bool,
    pub run: RunProps,
    pub para: ParaProps,
    /// Other style children (`next`, `link`, `qFormat`, `tblPr`, ...).
    pub extra: Vec<RawXml>,
}

impl Style {
    pub fn new(id: &str, name: &str, kind: StyleKind) -> Self {
        Style {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            based_on: None,
            is_default: false,
            run: RunProps::default(),
            para: ParaProps::default(),
            extra: Vec::new(),
        }
    }
}

/// Run properties after walking run, character style, paragraph style and
/// document defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedRun {
    pub font: Option<String>,
    pub size: u32,
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub small_caps: bool,
    pub caps: bool,
}

impl ResolvedRun {
    /// Underlined and colored: how a link looks, whether or not it is one.
    pub fn looks_like_link(&self) -> bool {
        self.underline && self.color.is_non_default()
    }
}

/// Namespace declarations of a source part's root element, re-declared on
/// write so verbatim fragments keep their prefixes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Namespaces {
    /// (prefix, uri); `None` is the default namespace.
    pub decls: Vec<(Option<String>, String)>,
    /// `mc:Ignorable` value.
    pub ignorable: Option<String>,
}

/// The document's shared style table, keyed by style id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleSheet {
    pub namespaces: Namespaces,
    pub default_run: RunProps,
    pub default_para: ParaProps,
    pub styles: BTreeMap<String, Style>,
    /// `w:latentStyles`, verbatim.
    pub latent: Option<RawXml>,
}

impl StyleSheet {
    pub fn get(&self, id: &str) -> Option<&Style> {
        self.styles.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Style> {
        self.styles.get_mut(id)
    }

    pub fn insert(&mut self, style: Style) {
        self.styles.insert(style.id.clone(), style);
    }

    /// Case-insensitive lookup by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&Style> {
        self.styles
            .values()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn default_paragraph_style(&self) -> Option<&Style> {
        self.styles
            .values()
            .find(|s| s.kind == StyleKind::Paragraph && s.is_default)
    }

    /// Name of the style a paragraph uses, falling back to the id itself for
    /// dangling references and to the default paragraph style when unset.
    pub fn paragraph_style_name(&self, style_id: Option<&str>) -> String {
        match style_id {
            Some(id) => self
                .get(id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| id.to_string()),
            None => self
                .default_paragraph_style()
                .map(|s| s.name.clone())
                .unwrap_or_else(|| "Normal".to_string()),
        }
    }

    /// The style and its `basedOn` ancestors, nearest first.
    pub fn chain(&self, id: &str) -> Result<Vec<&Style>, Error> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(id);
        while let Some(current) = next {
            if !seen.insert(current) {
                return Err(Error::Style(format!(
                    "style '{id}' has a circular basedOn chain"
                )));
            }
            let Some(style) = self.get(current) else {
                break;
            };
            chain.push(style);
            next = style.based_on.as_deref();
        }
        Ok(chain)
    }

    pub fn resolve_run(
        &self,
        paragraph_style: Option<&str>,
        run: &RunProps,
    ) -> Result<ResolvedRun, Error> {
        let mut layers: Vec<&RunProps> = vec![run];
        if let Some(char_style) = run.style.as_deref() {
            layers.extend(self.chain(char_style)?.into_iter().map(|s| &s.run));
        }
        let para_style = paragraph_style
            .map(str::to_string)
            .or_else(|| self.default_paragraph_style().map(|s| s.id.clone()));
        if let Some(para_style) = para_style.as_deref() {
            layers.extend(self.chain(para_style)?.into_iter().map(|s| &s.run));
        }
        layers.push(&self.default_run);

        fn first<'a, T>(
            layers: &[&'a RunProps],
            get: impl Fn(&'a RunProps) -> Option<&'a T>,
        ) -> Option<&'a T> {
            layers.iter().find_map(|l| get(*l))
        }

        Ok(ResolvedRun {
            font: first(&layers, |l| l.font.as_ref()).cloned(),
            size: first(&layers, |l| l.size.as_ref())
                .copied()
                .unwrap_or(WORD_DEFAULT_HALF_POINTS),
            color: first(&layers, |l| l.color.as_ref())
                .copied()
                .unwrap_or(Color::Auto),
            bold: first(&layers, |l| l.bold.as_ref()).copied().unwrap_or(false),
            italic: first(&layers, |l| l.italic.as_ref()).copied().unwrap_or(false),
            underline: first(&layers, |l| l.underline.as_ref())
                .is_some_and(Underline::is_visible),
            small_caps: first(&layers, |l| l.small_caps.as_ref())
                .copied()
                .unwrap_or(false),
            caps: first(&layers, |l| l.caps.as_ref()).copied().unwrap_or(false),
        })
    }

    /// Id of the paragraph style named `heading {level}`, created (based on
    /// the default paragraph style) when the document lacks it.
    pub fn ensure_heading(&mut self, level: u8) -> String {
        let name = format!("heading {level}");
        if let Some(style) = self.find_by_name(&name) {
            return style.id.clone();
        }
        let mut id = format!("Heading{level}");
        while self.styles.contains_key(&id) {
            id.push('_');
        }
        let mut style = Style::new(&id, &name, StyleKind::Paragraph);
        style.based_on = self.default_paragraph_style().map(|s| s.id.clone());
        style.extra.push(RawXml {
            name: "qFormat".into(),
            xml: "<w:qFormat/>".into(),
        });
        style.para.extra.push(RawXml {
            name: "outlineLvl".into(),
            xml: format!("<w:outlineLvl w:val=\"{}\"/>", level.saturating_sub(1)),
        });
        self.insert(style);
        id
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContentTypes {
    /// Extension -> content type.
    pub defaults: Vec<(String, String)>,
    /// Absolute part name (`/word/document.xml`) -> content type.
    pub overrides: Vec<(String, String)>,
}

/// The OPC package around the main document part.
#[derive(Clone, Debug, PartialEq)]
pub struct Package {
    /// Main document part, e.g. `word/document.xml`.
    pub main_part: String,
    /// Parts written back untouched, keyed by ZIP entry name.
    pub parts: BTreeMap<String, Vec<u8>>,
    /// Relationships of the main document part.
    pub rels: Vec<Relationship>,
    pub content_types: ContentTypes,
}

pub const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
pub const REL_NUMBERING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
pub const REL_FOOTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
pub const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
pub const REL_COMMENTS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";

impl Default for Package {
    fn default() -> Self {
        Package {
            main_part: "word/document.xml".to_string(),
            parts: BTreeMap::new(),
            rels: Vec::new(),
            content_types: ContentTypes::default(),
        }
    }
}

impl Package {
    /// Directory holding the main part, with trailing slash (`word/`).
    pub fn main_dir(&self) -> &str {
        match self.main_part.rfind('/') {
            Some(i) => &self.main_part[..=i],
            None => "",
        }
    }

    pub fn rel(&self, id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|r| r.id == id)
    }

    pub fn rel_of_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.rels.iter().find(|r| r.rel_type == rel_type)
    }

    /// Package path of an internal relationship target.
    pub fn target_path(&self, rel: &Relationship) -> String {
        match rel.target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("{}{}", self.main_dir(), rel.target),
        }
    }

    pub fn add_rel(&mut self, rel_type: &str, target: &str, external: bool) -> String {
        let id = next_rel_id(&self.rels);
        self.rels.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            external,
        });
        id
    }

    pub fn set_override(&mut self, part: &str, content_type: &str) {
        let name = format!("/{part}");
        self.content_types.overrides.retain(|(p, _)| *p != name);
        self.content_types
            .overrides
            .push((name, content_type.to_string()));
    }

    pub fn ensure_default(&mut self, ext: &str, content_type: &str) {
        let ext = ext.to_ascii_lowercase();
        if !self
            .content_types
            .defaults
            .iter()
            .any(|(e, _)| e.eq_ignore_ascii_case(&ext))
        {
            self.content_types
                .defaults
                .push((ext, content_type.to_string()));
        }
    }

    /// Removes a part with its relationships and content type override.
    pub fn remove_part(&mut self, path: &str) {
        self.parts.remove(path);
        let rels_path = rels_path_for(path);
        self.parts.remove(&rels_path);
        let name = format!("/{path}");
        self.content_types.overrides.retain(|(p, _)| *p != name);
    }

    /// First `{stem}{n}.{ext}` under `dir` not already in the package.
    pub fn unused_part_name(&self, dir: &str, stem: &str, ext: &str) -> String {
        (1..)
            .map(|n| format!("{dir}{stem}{n}.{ext}"))
            .find(|name| !self.parts.contains_key(name) && *name != self.main_part)
            .unwrap_or_else(|| format!("{dir}{stem}.{ext}"))
    }
}

pub fn next_rel_id(rels: &[Relationship]) -> String {
    let max = rels
        .iter()
        .filter_map(|r| r.id.strip_prefix("rId"))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("rId{}", max + 1)
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`.
pub fn rels_path_for(part: &str) -> String {
    match part.rfind('/') {
        Some(i) => format!("{}_rels/{}.rels", &part[..=i], &part[i + 1..]),
        None => format!("_rels/{part}.rels"),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub sections: Vec<Section>,
    pub styles: StyleSheet,
    pub package: Package,
    pub namespaces: Namespaces,
    /// Comment markers and references dropped while reading.
    pub comment_marks: usize,
}

impl Document {
    pub fn empty() -> Self {
        Document {
            sections: vec![Section::default()],
            styles: StyleSheet::default(),
            package: Package::default(),
            namespaces: Namespaces::default(),
            comment_marks: 0,
        }
    }

    /// Top-level paragraphs of every section, in order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.sections
            .iter()
            .flat_map(|s| s.blocks.iter())
            .filter_map(|b| match b {
                Block::Paragraph(p) => Some(p),
                _ => None,
            })
    }
}

/// Visits every paragraph inside the blocks, descending into table cells.
pub fn for_each_paragraph_mut(blocks: &mut [Block], f: &mut impl FnMut(&mut Paragraph)) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => f(p),
            Block::Table(t) => {
                for row in &mut t.rows {
                    for cell in &mut row.cells {
                        for_each_paragraph_mut(&mut cell.blocks, f);
                    }
                }
            }
            Block::Raw(_) => {}
        }
    }
}
