//! Footnote relocation
//!
//! Footnote ids are unique within one footnotes part. Definitions referenced
//! by inserted content are copied into the target's footnotes part under
//! ids continuing after the target's own, and the references are rewritten
//! in lockstep.

use docxcompose_ooxml::namespaces::W;
use docxcompose_ooxml::relationships::Relationships;
use docxcompose_ooxml::{NodeId, PartTemplate, WordDocument, XmlDocument};

use crate::error::{ComposeError, Result};
use crate::hyperlinks::add_hyperlinks;
use crate::parts::xml_part_mut;

/// First id to give a copied footnote
///
/// One past the number of entries, the separator entries included, unless
/// sparse ids already use that.
pub fn next_footnote_id(footnotes: &XmlDocument) -> i64 {
    let entries = footnotes.children_named(footnotes.root(), W, "footnote");
    let max_id = entries
        .iter()
        .filter_map(|entry| footnotes.attr(*entry, W, "id"))
        .filter_map(|id| id.trim().parse::<i64>().ok())
        .max()
        .unwrap_or(0);
    (entries.len() as i64 + 1).max(max_id + 1)
}

fn find_footnote(footnotes: &XmlDocument, id: &str) -> Option<NodeId> {
    footnotes
        .children_named(footnotes.root(), W, "footnote")
        .into_iter()
        .find(|entry| footnotes.attr(*entry, W, "id") == Some(id))
}

/// Copy the footnotes referenced under `element` into the target; returns
/// how many were copied
pub fn add_footnotes(source: &WordDocument, target: &mut WordDocument, element: NodeId) -> Result<usize> {
    let references: Vec<(NodeId, String)> = {
        let doc = target.document();
        doc.descendants_named(element, W, "footnoteReference")
            .into_iter()
            .filter_map(|node| doc.attr(node, W, "id").map(|id| (node, id.to_string())))
            .collect()
    };
    if references.is_empty() {
        return Ok(0);
    }

    let missing = || ComposeError::MissingPart {
        part: source.main_part().to_string(),
        rel_type: Relationships::TYPE_FOOTNOTES.to_string(),
    };
    let source_path = source
        .part_by_reltype(source.main_part(), Relationships::TYPE_FOOTNOTES)
        .ok_or_else(missing)?;
    let source_footnotes = source.xml_part(&source_path).ok_or_else(missing)?;

    let target_path = target.ensure_part(PartTemplate::Footnotes)?;

    let mut copies = Vec::new();
    let mut renumbered = Vec::new();
    {
        let footnotes = xml_part_mut(target, &target_path)?;
        let mut next_id = next_footnote_id(footnotes);
        let root = footnotes.root();
        for (reference, id) in references {
            let Some(definition) = find_footnote(source_footnotes, &id) else {
                log::warn!("footnote {} is referenced but not defined in the source", id);
                continue;
            };
            let copy = footnotes.import(source_footnotes, definition);
            footnotes.set_attr(copy, W, "id", next_id.to_string());
            footnotes.append(root, copy);
            copies.push(copy);
            renumbered.push((reference, next_id));
            next_id += 1;
        }
    }

    let doc = target.document_mut();
    for (reference, id) in &renumbered {
        doc.set_attr(*reference, W, "id", id.to_string());
    }

    for copy in &copies {
        add_hyperlinks(source, &source_path, target, &target_path, *copy)?;
    }
    log::debug!("copied {} footnotes into {}", copies.len(), target_path);
    Ok(copies.len())
}
