//! Top-level body blocks

use docxcompose_ooxml::namespaces::W;
use docxcompose_ooxml::{NodeId, XmlDocument};

/// Kind of a `w:body` child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Table,
    /// The body's final `w:sectPr`
    SectionProperties,
    StructuredDocumentTag,
    Other,
}

impl BlockKind {
    pub fn classify(doc: &XmlDocument, node: NodeId) -> Self {
        match doc.name(node) {
            Some(name) if name.matches(W, "p") => BlockKind::Paragraph,
            Some(name) if name.matches(W, "tbl") => BlockKind::Table,
            Some(name) if name.matches(W, "sectPr") => BlockKind::SectionProperties,
            Some(name) if name.matches(W, "sdt") => BlockKind::StructuredDocumentTag,
            _ => BlockKind::Other,
        }
    }

    /// Whether composition copies blocks of this kind
    pub fn is_content(self) -> bool {
        self != BlockKind::SectionProperties
    }
}
