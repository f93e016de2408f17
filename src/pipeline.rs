//! Sequences the rule engine for one input: fix an existing document (after
//! an optional PDF conversion) or create one from text.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;

use crate::brand::BrandProfile;
use crate::changelog::{self, CORRECTION_TITLE, CREATION_TITLE, FixKind, FixLog, FixRecord};
use crate::convert::{ExternalConverter, PdfConverter};
use crate::error::Error;
use crate::{assemble, cleanup, docx, footer, normalize, writer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Fixed,
    Created,
}

/// Files written for one input and the fixes behind them.
#[derive(Debug)]
pub struct Outcome {
    pub mode: Mode,
    pub document: PathBuf,
    pub change_log: PathBuf,
    pub log: FixLog,
    pub logo_added: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub total_fixes: usize,
    pub font_fixes: usize,
    pub logo_added: bool,
}

/// JSON body returned by the document service on success.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "fixedDocument")]
    pub fixed_document: String,
    #[serde(rename = "changeLog")]
    pub change_log: String,
    pub summary: Summary,
    pub corrections: Vec<FixRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&Error> for ErrorResponse {
    fn from(e: &Error) -> Self {
        ErrorResponse {
            error: e.to_string(),
        }
    }
}

fn download_path(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("/output/{name}")
}

impl Outcome {
    pub fn summary(&self) -> Summary {
        Summary {
            total_fixes: self.log.len(),
            font_fixes: self.log.count(FixKind::Font),
            logo_added: self.logo_added,
        }
    }

    pub fn response(&self) -> ServiceResponse {
        let message = match self.mode {
            Mode::Fixed => "Document fixed successfully!",
            Mode::Created => "Document created successfully!",
        };
        ServiceResponse {
            success: true,
            message: message.to_string(),
            fixed_document: download_path(&self.document),
            change_log: download_path(&self.change_log),
            summary: self.summary(),
            corrections: self.log.records().to_vec(),
        }
    }
}

pub struct Pipeline {
    brand: BrandProfile,
    output_dir: PathBuf,
    asset_root: PathBuf,
    converter: Box<dyn PdfConverter>,
}

impl Pipeline {
    pub fn new(brand: BrandProfile, output_dir: impl Into<PathBuf>) -> Self {
        Pipeline {
            brand,
            output_dir: output_dir.into(),
            asset_root: PathBuf::from("."),
            converter: Box::new(ExternalConverter::default()),
        }
    }

    /// Directory the brand logo path is resolved against.
    pub fn with_assets(mut self, asset_root: impl Into<PathBuf>) -> Self {
        self.asset_root = asset_root.into();
        self
    }

    pub fn with_converter(mut self, converter: Box<dyn PdfConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Fixes a `.docx`, or a `.pdf` after converting it. Any other extension
    /// fails before anything is read or written.
    pub fn fix(&self, input: &Path) -> Result<Outcome, Error> {
        let ext = input
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
            .unwrap_or_default();
        let base = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| Error::UnsupportedFormat(ext.clone()))?;

        match ext.as_str() {
            ".docx" => self.fix_docx(input, &base),
            ".pdf" => {
                let scratch = tempfile::tempdir()?;
                let converted = self.converter.convert(input, scratch.path())?;
                self.fix_docx(&converted, &base)
            }
            _ => Err(Error::UnsupportedFormat(ext)),
        }
    }

    fn fix_docx(&self, path: &Path, base: &str) -> Result<Outcome, Error> {
        let brand = &self.brand;
        log::info!("fixing {}", path.display());
        let mut doc = docx::read(path)?;
        let mut log = FixLog::new();

        normalize::remove_comments(&mut doc, &mut log);
        normalize::promote_fake_headings(&mut doc, brand, &mut log);
        normalize::normalize_document(&mut doc, brand, &mut log);
        normalize::apply_style_table(&mut doc.styles, brand, &mut log);
        log::info!("formatting rules applied, {} fix(es) so far", log.len());

        cleanup::remove_empty_paragraphs(&mut doc, &mut log);
        cleanup::repair_text_spacing(&mut doc, &mut log);
        cleanup::repair_hyperlink_sizes(&mut doc, brand, &mut log);
        let logo_added = footer::add_logo(&mut doc, brand, &self.asset_root, &mut log)?;

        std::fs::create_dir_all(&self.output_dir)?;
        let document = self.output_dir.join(format!("{base}-Fixed.docx"));
        writer::write(&doc, &document)?;
        log::info!("saved {}", document.display());

        let change_log =
            changelog::write_report(&self.output_dir, CORRECTION_TITLE, &log, brand, Local::now())?;
        log::info!("{} fix(es) logged to {}", log.len(), change_log.display());

        Ok(Outcome {
            mode: Mode::Fixed,
            document,
            change_log,
            log,
            logo_added,
        })
    }

    /// Builds a branded document from plain text.
    pub fn create(&self, text: &str) -> Result<Outcome, Error> {
        if text.trim().is_empty() {
            return Err(Error::NoText);
        }
        let brand = &self.brand;
        let mut doc = assemble::build_document(text, brand);
        let mut log = FixLog::new();
        log.record(FixKind::Font, "Applied brand fonts throughout document", "All text");
        log.record(FixKind::Hierarchy, "Created proper heading structure", "Headings detected");
        let logo_added = footer::add_logo(&mut doc, brand, &self.asset_root, &mut log)?;

        std::fs::create_dir_all(&self.output_dir)?;
        let now = Local::now();
        let document = self
            .output_dir
            .join(format!("created-document-{}.docx", now.timestamp()));
        writer::write(&doc, &document)?;
        log::info!("saved {}", document.display());

        let change_log = changelog::write_report(&self.output_dir, CREATION_TITLE, &log, brand, now)?;

        Ok(Outcome {
            mode: Mode::Created,
            document,
            change_log,
            log,
            logo_added,
        })
    }
}
