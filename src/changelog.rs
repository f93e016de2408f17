//! Fix records and the plain-text change-log report.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::brand::BrandProfile;
use crate::error::Error;

pub const CORRECTION_TITLE: &str = "DOCUMENT CORRECTION REPORT";
pub const CREATION_TITLE: &str = "DOCUMENT CREATION REPORT";

const RULE: usize = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FixKind {
    Font,
    Hierarchy,
    Accessibility,
    Logo,
}

impl FixKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FixKind::Font => "font",
            FixKind::Hierarchy => "hierarchy",
            FixKind::Accessibility => "accessibility",
            FixKind::Logo => "logo",
        }
    }

    fn capitalized(self) -> &'static str {
        match self {
            FixKind::Font => "Font",
            FixKind::Hierarchy => "Hierarchy",
            FixKind::Accessibility => "Accessibility",
            FixKind::Logo => "Logo",
        }
    }
}

impl fmt::Display for FixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FixRecord {
    #[serde(rename = "type")]
    pub kind: FixKind,
    pub description: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// Append-only list of every mutation applied to a document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FixLog {
    records: Vec<FixRecord>,
}

impl FixLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: FixKind, description: impl Into<String>, location: impl Into<String>) {
        self.push(FixRecord {
            kind,
            description: description.into(),
            location: location.into(),
            after: None,
        });
    }

    pub fn record_after(
        &mut self,
        kind: FixKind,
        description: impl Into<String>,
        location: impl Into<String>,
        after: impl Into<String>,
    ) {
        self.push(FixRecord {
            kind,
            description: description.into(),
            location: location.into(),
            after: Some(after.into()),
        });
    }

    fn push(&mut self, record: FixRecord) {
        log::debug!("[{}] {} @ {}", record.kind, record.description, record.location);
        self.records.push(record);
    }

    pub fn records(&self) -> &[FixRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, kind: FixKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    /// Records per kind, in the order each kind first appears.
    pub fn counts(&self) -> Vec<(FixKind, usize)> {
        let mut counts: Vec<(FixKind, usize)> = Vec::new();
        for record in &self.records {
            match counts.iter_mut().find(|(kind, _)| *kind == record.kind) {
                Some((_, n)) => *n += 1,
                None => counts.push((record.kind, 1)),
            }
        }
        counts
    }

    pub fn into_records(self) -> Vec<FixRecord> {
        self.records
    }
}

pub fn render_report(
    title: &str,
    log: &FixLog,
    brand: &BrandProfile,
    generated: DateTime<Local>,
) -> String {
    let heavy = "=".repeat(RULE);
    let light = "-".repeat(RULE);
    let mut out = String::new();

    out.push_str(&format!("{heavy}\n{title}\n"));
    out.push_str(&format!("Brand Kit: {}\n", brand.name));
    out.push_str(&format!("Generated: {}\n", generated.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("{heavy}\n\n"));

    out.push_str(&format!("SUMMARY\n{light}\n"));
    out.push_str(&format!("Total Corrections: {}\n\n", log.len()));
    for (kind, count) in log.counts() {
        out.push_str(&format!("  {} Corrections: {count}\n", kind.capitalized()));
    }

    out.push_str(&format!("\n\nDETAILED CHANGES\n{light}\n\n"));
    for (i, record) in log.records().iter().enumerate() {
        out.push_str(&format!(
            "{}. [{}] {}\n",
            i + 1,
            record.kind.as_str().to_uppercase(),
            record.description
        ));
        out.push_str(&format!("   Location: {}\n", record.location));
        if let Some(after) = &record.after {
            out.push_str(&format!("   After: {after}\n"));
        }
        out.push('\n');
    }

    out.push_str(&format!("\n{heavy}\nBRAND KIT APPLIED\n{light}\n"));
    out.push_str(&format!("Heading Font: {}\n", brand.heading_font));
    out.push_str(&format!("Body Font: {}\n", brand.body_font));
    out.push_str(&format!(
        "Primary Color: {} ({})\n",
        brand.primary.name, brand.primary.rgb
    ));
    out.push_str(&format!(
        "Accent Color: {} ({})\n",
        brand.accent.name, brand.accent.rgb
    ));
    out.push_str(&format!("{heavy}\n"));
    out
}

/// Writes `changelog-<timestamp>.txt` into `dir`.
pub fn write_report(
    dir: &Path,
    title: &str,
    log: &FixLog,
    brand: &BrandProfile,
    generated: DateTime<Local>,
) -> Result<PathBuf, Error> {
    let path = dir.join(format!("changelog-{}.txt", generated.timestamp()));
    std::fs::write(&path, render_report(title, log, brand, generated))?;
    Ok(path)
}
