mod common;

use std::path::{Path, PathBuf};

use common::{Fixture, dir_is_empty_or_missing, p, p_styled, rt, t, write_logo, zip_entries};
use docx_brandfix::{BrandProfile, Error, FixKind, Pipeline, PdfConverter};

fn sample() -> Fixture {
    Fixture::new(
        [
            p_styled("Heading1", &t("Quarterly Report")),
            p(&rt("<w:i/>", "Emphasised words")),
            p(""),
            p(&t("Closing line.")),
        ]
        .concat(),
    )
}

/// Stands in for an office suite by dropping a prepared DOCX.
struct PreparedConverter(Vec<u8>);

impl PdfConverter for PreparedConverter {
    fn convert(&self, pdf: &Path, out_dir: &Path) -> Result<PathBuf, Error> {
        let stem = pdf.file_stem().unwrap().to_string_lossy();
        let path = out_dir.join(format!("{stem}-converted.docx"));
        std::fs::write(&path, &self.0)?;
        Ok(path)
    }
}

struct BrokenConverter;

impl PdfConverter for BrokenConverter {
    fn convert(&self, _pdf: &Path, _out_dir: &Path) -> Result<PathBuf, Error> {
        Err(Error::Conversion("no office suite installed".into()))
    }
}

#[test]
fn unsupported_extension_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    std::fs::write(&input, "just text").unwrap();
    let out = dir.path().join("output");

    let err = Pipeline::new(BrandProfile::default(), &out)
        .fix(&input)
        .unwrap_err();
    assert!(matches!(&err, Error::UnsupportedFormat(ext) if ext == ".txt"));
    assert_eq!(
        err.to_string(),
        "Unsupported file format: .txt. Only DOCX and PDF are supported."
    );
    assert!(dir_is_empty_or_missing(&out));
}

#[test]
fn fixes_docx_and_adds_logo_footer() {
    let dir = tempfile::tempdir().unwrap();
    write_logo(dir.path());
    let input = sample().write(dir.path(), "report.docx");
    let out = dir.path().join("output");

    let outcome = Pipeline::new(BrandProfile::default(), &out)
        .with_assets(dir.path())
        .fix(&input)
        .unwrap();

    assert_eq!(outcome.document, out.join("report-Fixed.docx"));
    assert!(outcome.logo_added);
    let entries = zip_entries(&outcome.document);
    assert!(entries.iter().any(|e| e == "word/footer1.xml"));
    assert!(entries.iter().any(|e| e == "word/media/brand-logo1.png"));
    assert!(entries.iter().any(|e| e == "word/_rels/footer1.xml.rels"));
    assert!(entries.iter().any(|e| e == "word/settings.xml"));

    let fixed = docx_brandfix::docx::read(&outcome.document).unwrap();
    let footer = &fixed.sections[0].props.footers[0];
    assert_eq!(footer.kind, "default");
    let rel = fixed.package.rel(&footer.rel_id).unwrap();
    assert_eq!(fixed.package.target_path(rel), "word/footer1.xml");
    let texts: Vec<String> = fixed.paragraphs().map(|p| p.text()).collect();
    assert_eq!(texts, ["Quarterly Report", "Emphasised words", "Closing line."]);

    let report = std::fs::read_to_string(&outcome.change_log).unwrap();
    assert!(report.contains("DOCUMENT CORRECTION REPORT"));
    assert!(report.contains("Removed italic formatting"));
    assert!(report.contains("Added UVA Batten School logo to footer"));

    let summary = outcome.summary();
    assert_eq!(summary.total_fixes, outcome.log.len());
    assert_eq!(summary.font_fixes, outcome.log.count(FixKind::Font));
    assert!(summary.logo_added);

    let response = serde_json::to_value(outcome.response()).unwrap();
    assert_eq!(response["fixedDocument"], "/output/report-Fixed.docx");
    assert_eq!(response["message"], "Document fixed successfully!");
}

#[test]
fn missing_logo_is_logged_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample().write(dir.path(), "report.docx");
    let out = dir.path().join("output");

    let outcome = Pipeline::new(BrandProfile::default(), &out)
        .with_assets(dir.path())
        .fix(&input)
        .unwrap();

    assert!(!outcome.logo_added);
    let last = outcome.log.records().last().unwrap();
    assert_eq!(last.kind, FixKind::Logo);
    assert_eq!(last.description, "Logo file not found, skipped");
    assert!(!zip_entries(&outcome.document).iter().any(|e| e.contains("footer")));
}

#[test]
fn comments_do_not_reach_the_output() {
    let dir = tempfile::tempdir().unwrap();
    let body = "<w:p><w:commentRangeStart w:id=\"0\"/><w:r><w:t>Reviewed</w:t></w:r>\
                <w:commentRangeEnd w:id=\"0\"/></w:p>";
    let input = Fixture::new(body).comments().write(dir.path(), "draft.docx");
    let out = dir.path().join("output");

    let outcome = Pipeline::new(BrandProfile::default(), &out)
        .with_assets(dir.path())
        .fix(&input)
        .unwrap();

    assert!(!zip_entries(&outcome.document).iter().any(|e| e.contains("comments")));
    assert_eq!(
        outcome.log.records()[0].description,
        "Removed all Word comments from document"
    );
}

#[test]
fn pdf_is_converted_then_fixed() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.pdf");
    std::fs::write(&input, b"%PDF-1.4").unwrap();
    let out = dir.path().join("output");

    let outcome = Pipeline::new(BrandProfile::default(), &out)
        .with_assets(dir.path())
        .with_converter(Box::new(PreparedConverter(sample().bytes())))
        .fix(&input)
        .unwrap();

    assert_eq!(outcome.document, out.join("scan-Fixed.docx"));
    assert!(outcome.change_log.is_file());
}

#[test]
fn failed_conversion_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.PDF");
    std::fs::write(&input, b"%PDF-1.4").unwrap();
    let out = dir.path().join("output");

    let err = Pipeline::new(BrandProfile::default(), &out)
        .with_converter(Box::new(BrokenConverter))
        .fix(&input)
        .unwrap_err();
    assert!(matches!(err, Error::Conversion(_)));
    assert_eq!(err.to_string(), "PDF conversion failed: no office suite installed");
    assert!(dir_is_empty_or_missing(&out));
}

#[test]
fn creates_document_from_text() {
    let dir = tempfile::tempdir().unwrap();
    write_logo(dir.path());
    let out = dir.path().join("output");

    let outcome = Pipeline::new(BrandProfile::default(), &out)
        .with_assets(dir.path())
        .create("Title\n\n1. Data Management\nSome body text.\n- bullet one")
        .unwrap();

    let name = outcome.document.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("created-document-") && name.ends_with(".docx"));
    assert!(outcome.logo_added);

    let descriptions: Vec<&str> = outcome
        .log
        .records()
        .iter()
        .map(|r| r.description.as_str())
        .collect();
    assert_eq!(
        descriptions,
        [
            "Applied brand fonts throughout document",
            "Created proper heading structure",
            "Added UVA Batten School logo to footer",
        ]
    );

    let report = std::fs::read_to_string(&outcome.change_log).unwrap();
    assert!(report.contains("DOCUMENT CREATION REPORT"));
    assert_eq!(
        serde_json::to_value(outcome.response()).unwrap()["message"],
        "Document created successfully!"
    );

    let created = docx_brandfix::docx::read(&outcome.document).unwrap();
    assert_eq!(created.paragraphs().filter(|p| !p.is_blank()).count(), 4);
}

#[test]
fn blank_text_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("output");
    let err = Pipeline::new(BrandProfile::default(), &out)
        .create(" \n\t\n")
        .unwrap_err();
    assert!(matches!(err, Error::NoText));
    assert!(dir_is_empty_or_missing(&out));
}
