//! # docxcompose-core
//!
//! Merges Word documents into one while keeping what their content refers
//! to intact.
//!
//! Copying a paragraph from one package into another breaks every id it
//! carries: style ids, numbering ids, relationship ids of images and
//! hyperlinks, footnote ids. The [`Composer`] copies body blocks and then
//! repairs each kind of reference:
//!
//! - styles are matched by name and copied when missing ([`styles`])
//! - numbering definitions are copied under fresh ids, and numbered styles
//!   restart their list in each inserted document ([`numbering`])
//! - images are shared by content hash; OLE objects and diagrams are copied
//!   ([`media`])
//! - footnotes are copied and renumbered ([`footnotes`])
//! - external hyperlinks are related again ([`hyperlinks`])
//! - bookmarks and drawing ids are renumbered ([`renumber`])
//!
//! `DOCPROPERTY` fields of inserted documents are turned into plain text
//! beforehand ([`fields`]). Custom properties and plain-text content
//! controls can also be edited directly ([`properties`], [`sdt`]).
//!
//! ## Example
//!
//! ```no_run
//! use docxcompose_core::{compose, ComposeOptions};
//! use docxcompose_ooxml::WordDocument;
//!
//! let master = WordDocument::open("master.docx")?;
//! let parts = ["a.docx", "b.docx"]
//!     .iter()
//!     .map(WordDocument::open)
//!     .collect::<Result<Vec<_>, _>>()?;
//! let composed = compose(master, parts, ComposeOptions::default())?;
//! composed.save("composed.docx")?;
//! # Ok::<(), docxcompose_core::ComposeError>(())
//! ```

pub mod blocks;
pub mod composer;
pub mod context;
pub mod error;
pub mod fields;
pub mod footnotes;
pub mod headers;
pub mod hyperlinks;
pub mod media;
pub mod numbering;
mod parts;
pub mod properties;
pub mod renumber;
pub mod sdt;
pub mod styles;

pub use blocks::BlockKind;
pub use composer::{compose, ComposeOptions, ComposeReport, Composer};
pub use context::{CompositionContext, ReferenceMap};
pub use error::{ComposeError, Result};
pub use fields::{DocPropertyField, FieldKind};
pub use numbering::{NumberingOutcome, RestartOutcome};
pub use properties::{CustomProperties, PropertyValue};
pub use renumber::BookmarkNumbering;
pub use sdt::StructuredDocumentTags;
pub use styles::StyleOutcome;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
