//! Part access shared by the composition steps

use docxcompose_ooxml::namespaces::W;
use docxcompose_ooxml::{NodeId, OoxmlError, WordDocument, XmlDocument};

use crate::error::Result;

pub(crate) fn xml_part<'a>(doc: &'a WordDocument, path: &str) -> Result<&'a XmlDocument> {
    doc.xml_part(path)
        .ok_or_else(|| OoxmlError::MissingFile(path.to_string()).into())
}

pub(crate) fn xml_part_mut<'a>(doc: &'a mut WordDocument, path: &str) -> Result<&'a mut XmlDocument> {
    doc.xml_part_mut(path)
        .ok_or_else(|| OoxmlError::MissingFile(path.to_string()).into())
}

/// Numeric value of an id attribute
pub(crate) fn parse_id(value: Option<&str>) -> Option<u32> {
    value.and_then(|v| v.trim().parse().ok())
}

/// First child of `parent` whose numeric attribute `local` equals `id`
pub(crate) fn child_with_id(
    doc: &XmlDocument,
    parent: NodeId,
    local: &str,
    id_attr: &str,
    id: u32,
) -> Option<NodeId> {
    doc.children_named(parent, W, local)
        .into_iter()
        .find(|child| parse_id(doc.attr(*child, W, id_attr)) == Some(id))
}
