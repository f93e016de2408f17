//! Brand Profile: the fonts, colors, sizes and heading heuristics the rule
//! engine enforces.
//!
//! A profile is built once (from [`BrandProfile::default`] or a JSON file) and
//! passed by reference into every step of the pipeline. Every field has a
//! default, so a JSON file only needs to name what it overrides:
//!
//! ```json
//! { "name": "Acme", "body_font": "Inter", "primary": { "name": "Acme Blue", "rgb": "#0033AA" } }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::Rgb;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandProfile {
    pub name: String,
    pub heading_font: String,
    pub body_font: String,
    /// Heading color.
    pub primary: BrandColor,
    pub accent: BrandColor,
    pub sizes: SizeScale,
    pub headings: HeadingRules,
    pub logo: LogoSpec,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrandColor {
    pub name: String,
    pub rgb: Rgb,
}

/// Point sizes per heading level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeScale {
    pub heading1: f32,
    pub heading2: f32,
    pub heading3: f32,
    pub body: f32,
}

/// Thresholds and vocabulary for heading inference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingRules {
    /// Paragraphs at or above this many characters are never headings.
    pub max_length: usize,
    /// Minimum run size (pt) for a bold fake heading to become level 1, 2, 3.
    pub fake_heading_sizes: [f32; 3],
    /// Section words that mark a short line as a level-3 heading.
    pub keywords: Vec<String>,
    /// A line ending in one of these is a sentence, not a heading.
    pub terminal_punctuation: Vec<char>,
    /// How many leading characters may hold the `". "` of a numbered line.
    pub numbered_prefix_window: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoSpec {
    /// Resolved against the asset root when relative.
    pub path: PathBuf,
    pub width_inches: f32,
}

impl Default for BrandProfile {
    fn default() -> Self {
        BrandProfile {
            name: "UVA Batten School".to_string(),
            heading_font: "Adobe Caslon Pro".to_string(),
            body_font: "Franklin Gothic".to_string(),
            primary: BrandColor {
                name: "UVA Navy Blue".to_string(),
                rgb: Rgb([0x23, 0x2D, 0x4B]),
            },
            accent: BrandColor {
                name: "UVA Orange".to_string(),
                rgb: Rgb([0xE5, 0x72, 0x00]),
            },
            sizes: SizeScale::default(),
            headings: HeadingRules::default(),
            logo: LogoSpec::default(),
        }
    }
}

impl Default for SizeScale {
    fn default() -> Self {
        SizeScale {
            heading1: 18.0,
            heading2: 15.0,
            heading3: 13.0,
            body: 11.0,
        }
    }
}

impl Default for HeadingRules {
    fn default() -> Self {
        let keywords = [
            "Management",
            "Review",
            "Audit",
            "Policy",
            "System",
            "Overview",
            "Introduction",
            "Conclusion",
            "Summary",
        ];
        HeadingRules {
            max_length: 80,
            fake_heading_sizes: [18.0, 15.0, 13.0],
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            terminal_punctuation: vec!['.', '!', '?', ':'],
            numbered_prefix_window: 5,
        }
    }
}

impl Default for LogoSpec {
    fn default() -> Self {
        LogoSpec {
            path: PathBuf::from("assets/logo.png"),
            width_inches: 4.0,
        }
    }
}

impl SizeScale {
    /// Point size for a heading level; levels past 3 share the level-3 size.
    pub fn heading(&self, level: u8) -> f32 {
        match level {
            0 | 1 => self.heading1,
            2 => self.heading2,
            _ => self.heading3,
        }
    }
}

/// Word stores font sizes in half-points.
pub fn half_points(pt: f32) -> u32 {
    (pt * 2.0).round() as u32
}

impl BrandProfile {
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let profile: BrandProfile = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.heading_font.trim().is_empty() || self.body_font.trim().is_empty() {
            return Err(Error::Config("font names must not be empty".into()));
        }
        let sizes = [
            self.sizes.heading1,
            self.sizes.heading2,
            self.sizes.heading3,
            self.sizes.body,
        ];
        if sizes.iter().any(|s| !(1.0..=1638.0).contains(s)) {
            return Err(Error::Config("font sizes must be between 1 and 1638 pt".into()));
        }
        if self.logo.width_inches <= 0.0 {
            return Err(Error::Config("logo width must be positive".into()));
        }
        Ok(())
    }

    pub fn body_half_points(&self) -> u32 {
        half_points(self.sizes.body)
    }

    pub fn heading_half_points(&self, level: u8) -> u32 {
        half_points(self.sizes.heading(level))
    }
}
