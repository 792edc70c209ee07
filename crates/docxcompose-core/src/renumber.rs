//! Document-wide renumbering of bookmarks and drawing objects
//!
//! Composition concatenates content whose bookmark and `wp:docPr` ids were
//! only unique within their own documents. These passes ignore the existing
//! values and number everything again in document order.

use std::collections::HashMap;

use docxcompose_ooxml::namespaces::{W, WP};
use docxcompose_ooxml::{NodeId, XmlDocument};

/// How bookmark end markers get their ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookmarkNumbering {
    /// Each end takes the new id of the start it closed before renumbering
    #[default]
    Paired,
    /// Starts and ends are numbered independently, both from 0
    Independent,
}

/// Renumber `w:bookmarkStart` and `w:bookmarkEnd` under `root`
pub fn renumber_bookmarks(doc: &mut XmlDocument, root: NodeId, mode: BookmarkNumbering) {
    let markers: Vec<NodeId> = doc
        .descendants(root)
        .into_iter()
        .filter(|node| doc.is(*node, W, "bookmarkStart") || doc.is(*node, W, "bookmarkEnd"))
        .collect();

    let mut assignments: Vec<(NodeId, u32)> = Vec::with_capacity(markers.len());
    match mode {
        BookmarkNumbering::Independent => {
            let (mut starts, mut ends) = (0, 0);
            for marker in markers {
                let counter = if doc.is(marker, W, "bookmarkStart") {
                    &mut starts
                } else {
                    &mut ends
                };
                assignments.push((marker, *counter));
                *counter += 1;
            }
        }
        BookmarkNumbering::Paired => {
            let mut open: HashMap<String, Vec<u32>> = HashMap::new();
            let mut unmatched = Vec::new();
            let mut next = 0;
            for marker in markers {
                let original = doc.attr(marker, W, "id").unwrap_or_default().to_string();
                if doc.is(marker, W, "bookmarkStart") {
                    open.entry(original).or_default().push(next);
                    assignments.push((marker, next));
                    next += 1;
                } else {
                    match open.get_mut(&original).and_then(|ids| ids.pop()) {
                        Some(id) => assignments.push((marker, id)),
                        None => unmatched.push(marker),
                    }
                }
            }
            for marker in unmatched {
                assignments.push((marker, next));
                next += 1;
            }
        }
    }

    for (marker, id) in assignments {
        doc.set_attr(marker, W, "id", id.to_string());
    }
}

/// Renumber `wp:docPr/@id` under `root` from 1
pub fn renumber_drawing_ids(doc: &mut XmlDocument, root: NodeId) {
    for (index, doc_pr) in doc.descendants_named(root, WP, "docPr").into_iter().enumerate() {
        doc.set_plain_attr(doc_pr, "id", (index + 1).to_string());
    }
}
