// Document container: OOXML package I/O and the typed paragraph/run/table tree
// the tailoring protocol walks. Pure and synchronous; no tokio here.

pub mod model;
pub mod package;
pub mod walker;
pub mod xml;

#[cfg(test)]
pub(crate) mod fixtures;

use thiserror::Error;

pub use model::{Block, Cell, Document, Paragraph, Row};
pub use package::DocxPackage;

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("not a valid .docx archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("document XML is not well-formed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document XML is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("package is missing required part '{0}'")]
    MissingPart(String),

    #[error("unexpected document structure: {0}")]
    Malformed(String),
}
