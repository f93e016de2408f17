mod common;

use common::{Fixture, link, p, p_styled, read, reread, rt, t};
use docx_brandfix::model::{Alignment, Block, Color, Rgb, Underline};

#[test]
fn text_styles_and_links_survive_a_rewrite() {
    let body = [
        p_styled("Heading1", &t("Overview")),
        p(&format!("{}{}", t("See "), link(&rt("<w:rStyle w:val=\"Hyperlink\"/>", "the site")))),
        "<w:p><w:pPr><w:jc w:val=\"both\"/></w:pPr><w:r><w:t>Justified</w:t></w:r></w:p>".to_string(),
    ]
    .concat();
    let doc = read(&Fixture::new(body));
    let again = reread(&doc);

    let texts: Vec<String> = again.paragraphs().map(|p| p.text()).collect();
    assert_eq!(texts, ["Overview", "See the site", "Justified"]);

    let paragraphs: Vec<_> = again.paragraphs().collect();
    assert_eq!(paragraphs[0].props.style.as_deref(), Some("Heading1"));
    let linked = &paragraphs[1].runs[1];
    assert_eq!(linked.link.as_ref().and_then(|l| l.rel_id.as_deref()), Some("rId10"));
    assert_eq!(linked.props.style.as_deref(), Some("Hyperlink"));
    assert!(paragraphs[1].runs[0].link.is_none());
    assert_eq!(paragraphs[2].props.alignment, Some(Alignment::Justify));

    assert!(again.package.rel("rId10").is_some_and(|r| r.external));
    assert!(again.styles.get("Hyperlink").is_some());
}

#[test]
fn style_table_is_parsed() {
    let doc = read(&Fixture::new(p(&t("Body"))));
    let styles = &doc.styles;

    assert_eq!(styles.default_run.size, Some(22));
    assert_eq!(styles.default_run.font.as_deref(), Some("Calibri"));
    assert_eq!(styles.default_paragraph_style().map(|s| s.id.as_str()), Some("Normal"));

    let h1 = styles.find_by_name("Heading 1").unwrap();
    assert_eq!(h1.id, "Heading1");
    assert_eq!(h1.run.size, Some(32));
    assert_eq!(h1.run.color, Some(Color::Rgb(Rgb([0x2F, 0x54, 0x96]))));

    let link = styles.get("Hyperlink").unwrap();
    assert_eq!(link.run.underline, Some(Underline::Line("single".into())));
}

#[test]
fn unknown_markup_and_parts_pass_through() {
    let body = p(&rt(
        "<w:b/><w:shd w:val=\"clear\" w:fill=\"FFFF00\"/>",
        "Highlighted",
    ));
    let doc = read(&Fixture::new(body));
    let run = &doc.paragraphs().next().unwrap().runs[0];
    assert_eq!(run.props.bold, Some(true));
    assert!(run.props.extra.iter().any(|x| x.name == "shd"));

    let again = reread(&doc);
    let run = &again.paragraphs().next().unwrap().runs[0];
    assert!(run.props.extra.iter().any(|x| x.xml.contains("FFFF00")));
    assert!(again.package.parts.contains_key("word/settings.xml"));
    assert!(again.package.parts.contains_key("_rels/.rels"));
}

#[test]
fn tables_and_section_properties_survive() {
    let table = format!(
        "<w:tbl><w:tblPr><w:tblW w:w=\"0\" w:type=\"auto\"/></w:tblPr><w:tblGrid><w:gridCol w:w=\"4000\"/></w:tblGrid>\
         <w:tr><w:tc><w:tcPr><w:tcW w:w=\"4000\" w:type=\"dxa\"/></w:tcPr>{}</w:tc></w:tr></w:tbl>",
        p(&t("Cell text"))
    );
    let body = format!("{}{table}", p(&t("Before")));
    let doc = read(&Fixture::new(body));
    let again = reread(&doc);

    assert_eq!(again.sections.len(), 1);
    let blocks = &again.sections[0].blocks;
    assert!(matches!(blocks[1], Block::Table(_)));
    let Block::Table(table) = &blocks[1] else {
        unreachable!()
    };
    let Block::Paragraph(cell) = &table.rows[0].cells[0].blocks[0] else {
        panic!("cell should start with a paragraph");
    };
    assert_eq!(cell.text(), "Cell text");
    assert!(
        again.sections[0]
            .props
            .extra
            .iter()
            .any(|x| x.name == "pgSz")
    );
}

#[test]
fn comment_markers_are_counted_and_dropped() {
    let body = "<w:p><w:commentRangeStart w:id=\"0\"/><w:r><w:t>Reviewed</w:t></w:r>\
                <w:commentRangeEnd w:id=\"0\"/><w:r><w:commentReference w:id=\"0\"/></w:r></w:p>";
    let doc = read(&Fixture::new(body).comments());
    assert_eq!(doc.comment_marks, 3);
    let paragraph = doc.paragraphs().next().unwrap();
    assert_eq!(paragraph.text(), "Reviewed");
    assert_eq!(paragraph.runs.len(), 1);
    assert!(doc.package.parts.contains_key("word/comments.xml"));
}

#[test]
fn not_a_zip_is_an_error() {
    let result = docx_brandfix::docx::read_from(std::io::Cursor::new(b"plain text".to_vec()));
    assert!(result.is_err());
}

#[test]
fn inline_objects_keep_their_place_in_the_text() {
    let body = "<w:p><w:r><w:t>co</w:t><w:noBreakHyphen/><w:t>operate</w:t></w:r></w:p>\
                <w:p><w:r><w:t>Before</w:t><w:br w:type=\"page\"/><w:t>After</w:t></w:r></w:p>";
    let doc = reread(&read(&Fixture::new(body)));

    let texts: Vec<String> = doc.paragraphs().map(|p| p.text()).collect();
    assert_eq!(texts, ["cooperate", "BeforeAfter"]);

    let xml = docx_brandfix::writer::render_document(&doc);
    let co = xml.find(">co<").unwrap();
    let hyphen = xml.find("<w:noBreakHyphen/>").unwrap();
    let operate = xml.find(">operate<").unwrap();
    assert!(co < hyphen && hyphen < operate, "{xml}");

    let before = xml.find(">Before<").unwrap();
    let page = xml.find("<w:br w:type=\"page\"/>").unwrap();
    let after = xml.find(">After<").unwrap();
    assert!(before < page && page < after, "{xml}");
}

#[test]
fn hyperlink_keeps_tracked_changes_and_counts_comment_marks() {
    let body = p(&link(
        "<w:commentRangeStart w:id=\"0\"/>\
         <w:ins w:id=\"1\" w:author=\"Editor\" w:date=\"2024-01-01T00:00:00Z\">\
         <w:r><w:t>inserted</w:t></w:r></w:ins>\
         <w:bookmarkStart w:id=\"2\" w:name=\"mark\"/><w:bookmarkEnd w:id=\"2\"/>\
         <w:r><w:t> tail</w:t></w:r><w:commentRangeEnd w:id=\"0\"/>",
    ));
    let doc = read(&Fixture::new(body).comments());
    assert_eq!(doc.comment_marks, 2);

    let paragraph = doc.paragraphs().next().unwrap();
    assert!(paragraph.runs.iter().all(|r| r.link.is_some()));

    let xml = docx_brandfix::writer::render_document(&reread(&doc));
    assert_eq!(xml.matches("<w:hyperlink").count(), 1, "{xml}");
    let open = xml.find("<w:hyperlink").unwrap();
    let close = xml.find("</w:hyperlink>").unwrap();
    let inserted = xml.find(">inserted<").unwrap();
    let bookmark = xml.find("<w:bookmarkStart").unwrap();
    let tail = xml.find("> tail<").unwrap();
    assert!(open < inserted && inserted < bookmark && bookmark < tail && tail < close, "{xml}");
}
