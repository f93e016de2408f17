pub mod assemble;
pub mod brand;
pub mod changelog;
pub mod cleanup;
pub mod convert;
pub mod docx;
mod error;
pub mod footer;
pub mod heading;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod writer;

pub use brand::BrandProfile;
pub use changelog::{FixKind, FixLog, FixRecord};
pub use convert::{ExternalConverter, PdfConverter};
pub use error::Error;
pub use pipeline::{ErrorResponse, Outcome, Pipeline, ServiceResponse, Summary};

use std::path::Path;

/// Fixes a `.docx` or `.pdf` with the default brand, writing
/// `<name>-Fixed.docx` and a change log into `output_dir`.
pub fn fix_document(input: &Path, output_dir: &Path) -> Result<Outcome, Error> {
    Pipeline::new(BrandProfile::default(), output_dir).fix(input)
}

/// Creates a branded document from plain text with the default brand.
pub fn create_document(text: &str, output_dir: &Path) -> Result<Outcome, Error> {
    Pipeline::new(BrandProfile::default(), output_dir).create(text)
}
