//! PDF to DOCX conversion, delegated to an external program.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::Error;

pub trait PdfConverter {
    /// Converts `pdf` into a `.docx` inside `out_dir` and returns its path.
    fn convert(&self, pdf: &Path, out_dir: &Path) -> Result<PathBuf, Error>;
}

/// Runs an office suite headless, e.g.
/// `soffice --headless --infilter=writer_pdf_import --convert-to docx --outdir <dir> <pdf>`.
#[derive(Clone, Debug)]
pub struct ExternalConverter {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ExternalConverter {
    fn default() -> Self {
        ExternalConverter {
            program: "soffice".to_string(),
            args: ["--headless", "--infilter=writer_pdf_import", "--convert-to", "docx"]
                .iter()
                .map(|a| a.to_string())
                .collect(),
        }
    }
}

impl ExternalConverter {
    /// Same arguments, different executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        ExternalConverter {
            program: program.into(),
            ..Default::default()
        }
    }
}

impl PdfConverter for ExternalConverter {
    fn convert(&self, pdf: &Path, out_dir: &Path) -> Result<PathBuf, Error> {
        let stem = pdf
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Conversion(format!("{} has no file name", pdf.display())))?;

        log::info!("converting {} with {}", pdf.display(), self.program);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--outdir")
            .arg(out_dir)
            .arg(pdf)
            .output()
            .map_err(|e| Error::Conversion(format!("could not run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Conversion(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let produced = out_dir.join(format!("{stem}.docx"));
        if !produced.is_file() {
            return Err(Error::Conversion(format!(
                "{} produced no document for {}",
                self.program,
                pdf.display()
            )));
        }

        let converted = out_dir.join(format!(
            "{stem}-converted-{}.docx",
            chrono::Local::now().timestamp()
        ));
        std::fs::rename(&produced, &converted)
            .map_err(|e| Error::Conversion(format!("could not move converted document: {e}")))?;
        log::debug!("converted document at {}", converted.display());
        Ok(converted)
    }
}
