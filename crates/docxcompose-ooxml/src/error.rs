//! Error types for OOXML package operations

use thiserror::Error;

/// Errors that can occur while reading, editing or writing a package
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// Error reading or writing the ZIP archive
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing or writing XML content
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed attribute in an XML start tag
    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    /// Required file not found in archive
    #[error("Required file not found: {0}")]
    MissingFile(String),

    /// A part referenced by a relationship is absent from the package
    #[error("Part {part} referenced from {source_part} is missing")]
    MissingPart { source_part: String, part: String },

    /// Invalid document structure
    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),

    /// An embedded part template failed to parse
    #[error("Broken part template {0}")]
    Template(&'static str),
}

/// Result type for OOXML operations
pub type Result<T> = std::result::Result<T, OoxmlError>;
