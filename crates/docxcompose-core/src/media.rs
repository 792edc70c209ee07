//! Images, embedded objects and diagrams
//!
//! Inserted content references binary parts through relationship ids of the
//! source's main part. Each reference is re-established from the target's
//! main part: images are stored once per distinct content, embedded objects
//! and diagram parts are copied under fresh part names.

use docxcompose_ooxml::docx::{part_extension, resolve_target};
use docxcompose_ooxml::image::{content_hash, content_type_for_extension};
use docxcompose_ooxml::namespaces::{Namespace, A, ASVG, DGM, O, R, V};
use docxcompose_ooxml::relationships::Relationships;
use docxcompose_ooxml::{NodeId, OoxmlError, RelationshipTarget, WordDocument};

use crate::error::{ComposeError, Result};

/// Attributes holding an image relationship id
const IMAGE_REFERENCES: [(Namespace, &str, &str); 3] = [
    (A, "blip", "embed"),
    (ASVG, "svgBlip", "embed"),
    (V, "imagedata", "id"),
];

/// Diagram parts referenced from `dgm:relIds`
const DIAGRAM_REFERENCES: [&str; 4] = ["dm", "lo", "qs", "cs"];

/// Relationship ids found on `(ns, element, attribute)` under `element`
fn references(
    target: &WordDocument,
    element: NodeId,
    ns: Namespace,
    local: &str,
    attr: &str,
) -> Vec<(NodeId, String)> {
    let doc = target.document();
    doc.descendants_named(element, ns, local)
        .into_iter()
        .filter_map(|node| doc.attr(node, R, attr).map(|id| (node, id.to_string())))
        .collect()
}

fn source_relationship<'a>(source: &'a WordDocument, r_id: &str) -> Result<&'a RelationshipTarget> {
    let part = source.main_part();
    source
        .relationships(part)
        .and_then(|rels| rels.get_target(r_id))
        .ok_or_else(|| ComposeError::MissingRelationship {
            part: part.to_string(),
            id: r_id.to_string(),
        })
}

fn source_bytes(source: &WordDocument, path: &str) -> Result<Vec<u8>> {
    source
        .part_data(path)?
        .ok_or_else(|| OoxmlError::MissingFile(path.to_string()).into())
}

/// Relocate the images referenced under `element`; returns how many
/// references were rewritten
///
/// An image already stored in the target with the same content is shared,
/// but every reference gets a relationship of its own.
pub fn add_images(source: &WordDocument, target: &mut WordDocument, element: NodeId) -> Result<usize> {
    let main = target.main_part().to_string();
    let mut count = 0;

    for (ns, local, attr) in IMAGE_REFERENCES {
        for (node, r_id) in references(target, element, ns, local, attr) {
            let rel = source_relationship(source, &r_id)?;
            let new_id = if rel.is_external() {
                target
                    .relationships_mut(&main)
                    .get_or_add_external(&rel.rel_type, &rel.target)
            } else {
                let path = resolve_target(source.main_part(), &rel.target);
                let data = source_bytes(source, &path)?;
                let image = match target.find_image_by_hash(&content_hash(&data)) {
                    Some(existing) => {
                        log::debug!("image {} already stored as {}", path, existing);
                        existing
                    }
                    None => {
                        let ext = part_extension(&path);
                        let content_type = source
                            .content_type(&path)
                            .unwrap_or_else(|| content_type_for_extension(&ext))
                            .to_string();
                        target.add_image_part(data, &ext, &content_type)
                    }
                };
                target.relate(&main, &image, Relationships::TYPE_IMAGE)
            };
            target.document_mut().set_attr(node, R, attr, new_id);
            count += 1;
        }
    }
    Ok(count)
}

/// Copy a related part to the lowest free name of `template` and relate
/// it from the target's main part with the source relationship type
fn copy_related_part(
    source: &WordDocument,
    target: &mut WordDocument,
    rel: &RelationshipTarget,
    template: &str,
) -> Result<String> {
    let main = target.main_part().to_string();
    let path = resolve_target(source.main_part(), &rel.target);
    let data = source_bytes(source, &path)?;
    let content_type = source
        .content_type(&path)
        .map(str::to_string)
        .unwrap_or_else(|| content_type_for_extension(&part_extension(&path)).to_string());

    let new_path = target.next_free_partname(template);
    target.add_binary_part(&new_path, &content_type, data);
    log::debug!("copied {} to {}", path, new_path);
    Ok(target.relate(&main, &new_path, &rel.rel_type))
}

/// Relocate embedded OLE objects (`o:OLEObject/@r:id`)
pub fn add_ole_objects(
    source: &WordDocument,
    target: &mut WordDocument,
    element: NodeId,
) -> Result<usize> {
    let mut count = 0;
    for (node, r_id) in references(target, element, O, "OLEObject", "id") {
        let rel = source_relationship(source, &r_id)?.clone();
        let new_id = if rel.is_external() {
            let main = target.main_part().to_string();
            target
                .relationships_mut(&main)
                .get_or_add_external(&rel.rel_type, &rel.target)
        } else {
            let ext = part_extension(&resolve_target(source.main_part(), &rel.target));
            copy_related_part(
                source,
                target,
                &rel,
                &format!("word/embeddings/oleObject%d.{}", ext),
            )?
        };
        target.document_mut().set_attr(node, R, "id", new_id);
        count += 1;
    }
    Ok(count)
}

/// Relocate SmartArt diagram parts (`dgm:relIds`)
pub fn add_diagrams(
    source: &WordDocument,
    target: &mut WordDocument,
    element: NodeId,
) -> Result<usize> {
    let rel_ids: Vec<NodeId> = target
        .document()
        .descendants_named(element, DGM, "relIds");
    let mut count = 0;

    for node in rel_ids {
        for attr in DIAGRAM_REFERENCES {
            let Some(r_id) = target.document().attr(node, R, attr).map(str::to_string) else {
                continue;
            };
            let rel = source_relationship(source, &r_id)?.clone();
            let path = resolve_target(source.main_part(), &rel.target);
            let template = format!("word/diagrams/{}%d.xml", diagram_stem(&path));
            let new_id = copy_related_part(source, target, &rel, &template)?;
            target.document_mut().set_attr(node, R, attr, new_id);
            count += 1;
        }
    }
    Ok(count)
}

/// File stem without its trailing number: `word/diagrams/data1.xml` is `data`
fn diagram_stem(path: &str) -> &str {
    let file = path.rsplit('/').next().unwrap_or(path);
    let stem = file.split('.').next().unwrap_or(file);
    let trimmed = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    if trimmed.is_empty() {
        "diagram"
    } else {
        trimmed
    }
}
