//! In-memory DOCX fixtures.
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault></w:docDefaults>
<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>
<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:qFormat/><w:pPr><w:spacing w:before="240" w:after="120"/></w:pPr><w:rPr><w:b/><w:color w:val="2F5496"/><w:sz w:val="32"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:sz w:val="26"/></w:rPr></w:style>
<w:style w:type="character" w:styleId="Hyperlink"><w:name w:val="Hyperlink"/><w:rPr><w:color w:val="0563C1"/><w:u w:val="single"/></w:rPr></w:style>
</w:styles>"#;

/// Builds a DOCX package around `body` (the children of `w:body`).
pub struct Fixture {
    body: String,
    parts: Vec<(String, String)>,
    rels: Vec<(String, String, String)>,
    overrides: Vec<(String, String)>,
}

impl Fixture {
    pub fn new(body: impl Into<String>) -> Self {
        Fixture {
            body: body.into(),
            parts: Vec::new(),
            rels: vec![(
                "rId10".into(),
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink"
                    .into(),
                "https://example.org/".into(),
            )],
            overrides: Vec::new(),
        }
    }

    /// Adds a part referenced from the main document part.
    pub fn part(mut self, name: &str, rel_type: &str, content_type: &str, xml: &str) -> Self {
        let id = format!("rId{}", 20 + self.parts.len());
        let target = name.strip_prefix("word/").unwrap_or(name);
        self.rels.push((id, rel_type.into(), target.into()));
        self.overrides.push((format!("/{name}"), content_type.into()));
        self.parts.push((name.into(), xml.into()));
        self
    }

    pub fn comments(self) -> Self {
        self.part(
            "word/comments.xml",
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.comments+xml",
            &format!(
                "<w:comments xmlns:w=\"{W_NS}\"><w:comment w:id=\"0\" w:author=\"Reviewer\">\
                 <w:p><w:r><w:t>Check this</w:t></w:r></w:p></w:comment></w:comments>"
            ),
        )
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        let mut types = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
             <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
             <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
             <Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
             <Override PartName=\"/word/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>\
             <Override PartName=\"/word/settings.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml\"/>",
        );
        for (part, content_type) in &self.overrides {
            types.push_str(&format!(
                "<Override PartName=\"{part}\" ContentType=\"{content_type}\"/>"
            ));
        }
        types.push_str("</Types>");

        let mut rels = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
             <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>\
             <Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings\" Target=\"settings.xml\"/>",
        );
        for (id, rel_type, target) in &self.rels {
            let mode = if target.starts_with("http") {
                " TargetMode=\"External\""
            } else {
                ""
            };
            rels.push_str(&format!(
                "<Relationship Id=\"{id}\" Type=\"{rel_type}\" Target=\"{target}\"{mode}/>"
            ));
        }
        rels.push_str("</Relationships>");

        let document = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"{W_NS}\" xmlns:r=\"{R_NS}\"><w:body>{}\
             <w:sectPr><w:pgSz w:w=\"12240\" w:h=\"15840\"/></w:sectPr></w:body></w:document>",
            self.body
        );

        let mut files: Vec<(String, String)> = vec![
            ("[Content_Types].xml".into(), types),
            (
                "_rels/.rels".into(),
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
                 <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
                 <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>\
                 </Relationships>"
                    .into(),
            ),
            ("word/document.xml".into(), document),
            ("word/_rels/document.xml.rels".into(), rels),
            ("word/styles.xml".into(), STYLES.into()),
            (
                "word/settings.xml".into(),
                format!("<w:settings xmlns:w=\"{W_NS}\"><w:zoom w:percent=\"110\"/></w:settings>"),
            ),
        ];
        files.extend(self.parts.iter().cloned());

        for (name, content) in files {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.bytes()).unwrap();
        path
    }
}

pub fn read(fixture: &Fixture) -> docx_brandfix::model::Document {
    docx_brandfix::docx::read_from(Cursor::new(fixture.bytes())).unwrap()
}

/// Writes the document and reads it back.
pub fn reread(doc: &docx_brandfix::model::Document) -> docx_brandfix::model::Document {
    let mut buf = Cursor::new(Vec::new());
    docx_brandfix::writer::write_to(doc, &mut buf).unwrap();
    buf.set_position(0);
    docx_brandfix::docx::read_from(buf).unwrap()
}

pub fn zip_entries(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let archive = zip::ZipArchive::new(file).unwrap();
    archive.file_names().map(str::to_string).collect()
}

pub fn t(text: &str) -> String {
    format!("<w:r><w:t xml:space=\"preserve\">{text}</w:t></w:r>")
}

pub fn rt(rpr: &str, text: &str) -> String {
    format!("<w:r><w:rPr>{rpr}</w:rPr><w:t xml:space=\"preserve\">{text}</w:t></w:r>")
}

pub fn p(content: &str) -> String {
    format!("<w:p>{content}</w:p>")
}

pub fn p_styled(style: &str, content: &str) -> String {
    format!("<w:p><w:pPr><w:pStyle w:val=\"{style}\"/></w:pPr>{content}</w:p>")
}

pub fn link(content: &str) -> String {
    format!("<w:hyperlink r:id=\"rId10\">{content}</w:hyperlink>")
}

/// A visible 8x2 PNG at `dir/assets/logo.png`.
pub fn write_logo(dir: &Path) {
    let assets = dir.join("assets");
    std::fs::create_dir_all(&assets).unwrap();
    let img = image::RgbImage::from_pixel(8, 2, image::Rgb([0x23, 0x2D, 0x4B]));
    img.save(assets.join("logo.png")).unwrap();
}

pub fn dir_is_empty_or_missing(dir: &Path) -> bool {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}
