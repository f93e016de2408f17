use std::fmt;

#[derive(Debug)]
pub enum Error {
    InvalidDocx(String),
    UnsupportedFormat(String),
    Conversion(String),
    Config(String),
    Style(String),
    Image(String),
    NoText,
    Zip(zip::result::ZipError),
    Xml(roxmltree::Error),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidDocx(reason) => write!(f, "not a valid DOCX file: {reason}"),
            Error::UnsupportedFormat(ext) => write!(
                f,
                "Unsupported file format: {ext}. Only DOCX and PDF are supported."
            ),
            Error::Conversion(e) => write!(f, "PDF conversion failed: {e}"),
            Error::Config(e) => write!(f, "brand profile error: {e}"),
            Error::Style(e) => write!(f, "style error: {e}"),
            Error::Image(e) => write!(f, "image error: {e}"),
            Error::NoText => write!(f, "No text provided"),
            Error::Zip(e) => write!(f, "ZIP error: {e}"),
            Error::Xml(e) => write!(f, "XML error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Zip(e)
    }
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::Xml(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}
