//! # docxcompose-ooxml
//!
//! OOXML package handling for docxcompose.
//!
//! This crate provides:
//! - An in-memory zip container ([`OoxmlArchive`])
//! - Content type and relationship registries
//! - An arena-backed XML tree with namespace aware queries ([`XmlDocument`])
//! - A Word package model tying the above together ([`WordDocument`])
//! - Empty part templates for parts a document may lack
//!
//! ## Example
//!
//! ```no_run
//! use docxcompose_ooxml::{namespaces::W, WordDocument};
//!
//! let doc = WordDocument::open("document.docx")?;
//! let body = doc.body()?;
//! let paragraphs = doc.document().children_named(body, W, "p");
//! println!("{} paragraphs", paragraphs.len());
//! # Ok::<(), docxcompose_ooxml::OoxmlError>(())
//! ```

pub mod archive;
pub mod content_types;
pub mod docx;
pub mod error;
pub mod image;
pub mod namespaces;
pub mod relationships;
pub mod templates;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod xml;

pub use archive::OoxmlArchive;
pub use content_types::ContentTypes;
pub use docx::{WordDocument, PACKAGE};
pub use error::{OoxmlError, Result};
pub use indextree::NodeId;
pub use relationships::{RelationshipTarget, Relationships};
pub use templates::PartTemplate;
pub use xml::{QName, XmlDocument, XmlNode};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
