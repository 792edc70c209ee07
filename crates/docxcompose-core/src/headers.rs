//! Header and footer references of inserted content
//!
//! Headers and footers are not merged: the target's own sections keep
//! governing the whole composite, so references carried by inserted section
//! breaks are dropped.

use docxcompose_ooxml::namespaces::W;
use docxcompose_ooxml::{NodeId, WordDocument};

/// Remove `w:headerReference` and `w:footerReference` elements under
/// `element`; returns how many were removed
pub fn remove_header_footer_references(target: &mut WordDocument, element: NodeId) -> usize {
    let doc = target.document_mut();
    let mut references = doc.descendants_named(element, W, "headerReference");
    references.extend(doc.descendants_named(element, W, "footerReference"));
    for reference in &references {
        doc.remove(*reference);
    }
    references.len()
}
