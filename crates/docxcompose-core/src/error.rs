//! Error types for document composition

use thiserror::Error;

use docxcompose_ooxml::OoxmlError;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("package error: {0}")]
    Ooxml(#[from] OoxmlError),

    /// A part the source document must have, given what it references
    #[error("{part} has no related part of type {rel_type}")]
    MissingPart { part: String, rel_type: String },

    #[error("relationship {id} not found in {part}")]
    MissingRelationship { part: String, id: String },

    #[error("invalid custom property: {0}")]
    InvalidProperty(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ComposeError>;
