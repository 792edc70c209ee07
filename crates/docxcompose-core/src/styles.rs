//! Style merging
//!
//! Style ids are assigned per document and are localized: the same heading
//! style is `Heading1` in one document and `berschrift1` in another. Names
//! are stable, so references are resolved by name first and fall back to
//! the raw id when the target knows no style of that name.

use std::collections::HashMap;

use docxcompose_ooxml::namespaces::W;
use docxcompose_ooxml::relationships::Relationships;
use docxcompose_ooxml::{NodeId, WordDocument, XmlDocument};

use crate::context::{CompositionContext, ReferenceMap};
use crate::error::Result;
use crate::numbering::{abstract_num_id_of, add_numberings, numbering_part_path, NumberingOutcome};
use crate::parts::{parse_id, xml_part, xml_part_mut};

/// Elements referencing a style by id
const STYLE_REFERENCES: [&str; 3] = ["pStyle", "rStyle", "tblStyle"];

/// How one style reference of inserted content was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleOutcome {
    /// The target lacked the style; the source definition was copied
    Copied {
        style_id: String,
        numberings: Vec<NumberingOutcome>,
    },
    /// The target has a style of the same name
    Existing { source_id: String, target_id: String },
    /// No style of the same name; the target has one with the same id
    FellBackToIdentity { style_id: String },
    /// Neither document defines the style; the reference is kept
    Missing { style_id: String },
}

/// The `w:style` element with the given id
pub fn find_style(styles: &XmlDocument, style_id: &str) -> Option<NodeId> {
    styles
        .children_named(styles.root(), W, "style")
        .into_iter()
        .find(|style| styles.attr(*style, W, "styleId") == Some(style_id))
}

pub fn style_name(styles: &XmlDocument, style: NodeId) -> Option<String> {
    let name = styles.find_child(style, W, "name")?;
    styles.w_val(name).map(str::to_string)
}

/// Style id to style name
pub fn names_by_id(styles: &XmlDocument) -> HashMap<String, String> {
    styles
        .children_named(styles.root(), W, "style")
        .into_iter()
        .filter_map(|style| {
            let id = styles.attr(style, W, "styleId")?.to_string();
            Some((id, style_name(styles, style)?))
        })
        .collect()
}

/// Style name to style id
pub fn ids_by_name(styles: &XmlDocument) -> HashMap<String, String> {
    names_by_id(styles)
        .into_iter()
        .map(|(id, name)| (name, id))
        .collect()
}

pub fn styles_part_path(doc: &WordDocument) -> Option<String> {
    doc.part_by_reltype(doc.main_part(), Relationships::TYPE_STYLES)
        .filter(|path| doc.xml_part(path).is_some())
}

/// Style ids referenced under `element`, first occurrence order
pub fn referenced_style_ids(doc: &XmlDocument, element: NodeId) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for node in style_reference_nodes(doc, element) {
        if let Some(id) = doc.w_val(node) {
            if !ids.iter().any(|known| known == id) {
                ids.push(id.to_string());
            }
        }
    }
    ids
}

fn style_reference_nodes(doc: &XmlDocument, element: NodeId) -> Vec<NodeId> {
    doc.descendants(element)
        .into_iter()
        .filter(|node| STYLE_REFERENCES.iter().any(|local| doc.is(*node, W, local)))
        .collect()
}

/// Target id of the style sharing the source style's name
fn resolve_by_name(refs: &ReferenceMap, source_id: &str) -> Option<String> {
    let name = refs.source_style_names.as_ref()?.get(source_id)?;
    refs.target_style_ids.as_ref()?.get(name).cloned()
}

/// Abstract numbering behind the `numId` a style carries
fn style_abstract_num_id(doc: &WordDocument, style_id: &str) -> Option<u32> {
    let styles = doc.xml_part(&styles_part_path(doc)?)?;
    let style = find_style(styles, style_id)?;
    let num_id = parse_id(styles.w_val(styles.find_descendant(style, W, "numId")?))?;
    let numbering = doc.xml_part(&numbering_part_path(doc)?)?;
    abstract_num_id_of(numbering, num_id)
}

/// Copy the styles referenced under `element` that the target lacks and
/// rewrite the references to the target's ids
pub fn add_styles(
    ctx: &mut CompositionContext,
    source: &WordDocument,
    target: &mut WordDocument,
    element: NodeId,
) -> Result<Vec<StyleOutcome>> {
    let used = referenced_style_ids(target.document(), element);
    if used.is_empty() {
        return Ok(Vec::new());
    }
    let Some(target_path) = styles_part_path(target) else {
        log::debug!("target has no styles part, style references kept as they are");
        return Ok(Vec::new());
    };
    let source_styles = styles_part_path(source).and_then(|path| source.xml_part(&path));

    if ctx.refs.source_style_names.is_none() {
        ctx.refs.source_style_names = Some(source_styles.map(names_by_id).unwrap_or_default());
    }
    if ctx.refs.target_style_ids.is_none() {
        ctx.refs.target_style_ids = Some(ids_by_name(xml_part(target, &target_path)?));
    }

    let mut outcomes = Vec::new();
    let mut renames: HashMap<String, String> = HashMap::new();

    for style_id in used {
        let by_name = resolve_by_name(&ctx.refs, &style_id);
        let target_id = by_name.clone().unwrap_or_else(|| style_id.clone());

        if find_style(xml_part(target, &target_path)?, &target_id).is_some() {
            if let (Some(source_abstract), Some(target_abstract)) = (
                style_abstract_num_id(source, &style_id),
                style_abstract_num_id(target, &target_id),
            ) {
                ctx.refs
                    .abstract_num_ids
                    .entry(source_abstract)
                    .or_insert(target_abstract);
            }
            outcomes.push(match by_name {
                Some(_) => StyleOutcome::Existing {
                    source_id: style_id.clone(),
                    target_id: target_id.clone(),
                },
                None => StyleOutcome::FellBackToIdentity {
                    style_id: style_id.clone(),
                },
            });
            if target_id != style_id {
                renames.insert(style_id, target_id);
            }
            continue;
        }

        let Some(source_styles) = source_styles else {
            log::warn!("style {} is referenced but no styles part defines it", style_id);
            outcomes.push(StyleOutcome::Missing { style_id });
            continue;
        };
        let Some(style) = find_style(source_styles, &style_id) else {
            log::warn!("style {} is referenced but not defined in the source", style_id);
            outcomes.push(StyleOutcome::Missing { style_id });
            continue;
        };

        let (numberings, linked) =
            copy_style(ctx, source, source_styles, target, &target_path, style)?;
        outcomes.push(StyleOutcome::Copied {
            style_id: style_id.clone(),
            numberings,
        });

        // the paragraph style's character style and vice versa
        if let Some(linked_id) = linked {
            let linked_target = resolve_by_name(&ctx.refs, &linked_id).unwrap_or_else(|| linked_id.clone());
            if find_style(xml_part(target, &target_path)?, &linked_target).is_none() {
                if let Some(linked_style) = find_style(source_styles, &linked_id) {
                    let (numberings, _) =
                        copy_style(ctx, source, source_styles, target, &target_path, linked_style)?;
                    outcomes.push(StyleOutcome::Copied {
                        style_id: linked_id,
                        numberings,
                    });
                }
            } else if linked_target != linked_id {
                let styles = xml_part_mut(target, &target_path)?;
                if let Some(copy) = find_style(styles, &style_id) {
                    if let Some(link) = styles.find_child(copy, W, "link") {
                        styles.set_attr(link, W, "val", linked_target);
                    }
                }
            }
        }
    }

    if !renames.is_empty() {
        let doc = target.document_mut();
        for node in style_reference_nodes(doc, element) {
            let renamed = doc.w_val(node).and_then(|id| renames.get(id)).cloned();
            if let Some(target_id) = renamed {
                doc.set_attr(node, W, "val", target_id);
            }
        }
    }

    Ok(outcomes)
}

/// Append a copy of a source style to the target's styles part and bring
/// its numbering along; returns the numbering outcomes and the linked
/// style id
fn copy_style(
    ctx: &mut CompositionContext,
    source: &WordDocument,
    source_styles: &XmlDocument,
    target: &mut WordDocument,
    target_path: &str,
    style: NodeId,
) -> Result<(Vec<NumberingOutcome>, Option<String>)> {
    let styles = xml_part_mut(target, target_path)?;
    let copy = styles.import(source_styles, style);
    let root = styles.root();
    styles.append(root, copy);

    let id = styles.attr(copy, W, "styleId").map(str::to_string);
    let linked = styles
        .find_child(copy, W, "link")
        .and_then(|link| styles.w_val(link))
        .map(str::to_string);
    if let (Some(id), Some(name)) = (id.as_ref(), style_name(styles, copy)) {
        ctx.refs
            .target_style_ids
            .get_or_insert_with(HashMap::new)
            .entry(name)
            .or_insert_with(|| id.clone());
    }
    log::debug!("copied style {}", id.as_deref().unwrap_or("?"));

    let numberings = add_numberings(ctx, source, target, target_path, copy)?;
    Ok((numberings, linked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docxcompose_ooxml::test_utils::DocxBuilder;

    fn append_first_block(source: &WordDocument, target: &mut WordDocument) -> NodeId {
        let block = source.document().child_elements(source.body().unwrap())[0];
        let body = target.body().unwrap();
        let copy = target.document_mut().import(source.document(), block);
        target.document_mut().append(body, copy);
        copy
    }

    fn count_named(doc: &WordDocument, name: &str) -> usize {
        let styles = doc.xml_part("word/styles.xml").unwrap();
        names_by_id(styles).values().filter(|n| *n == name).count()
    }

    #[test]
    fn test_referenced_style_ids_dedups_in_order() {
        let doc = DocxBuilder::new()
            .body(
                r#"<w:tbl><w:tblPr><w:tblStyle w:val="Grid"/></w:tblPr><w:tr><w:tc>
                   <w:p><w:pPr><w:pStyle w:val="Body"/></w:pPr><w:r><w:rPr><w:rStyle w:val="Strong"/></w:rPr></w:r></w:p>
                   <w:p><w:pPr><w:pStyle w:val="Body"/></w:pPr></w:p></w:tc></w:tr></w:tbl>"#,
            )
            .document();
        let body = doc.body().unwrap();
        assert_eq!(
            referenced_style_ids(doc.document(), body),
            vec!["Grid", "Body", "Strong"]
        );
    }

    #[test]
    fn test_localized_style_maps_by_name() {
        let source = DocxBuilder::new()
            .body(r#"<w:p><w:pPr><w:pStyle w:val="berschrift1"/></w:pPr></w:p>"#)
            .styles(r#"<w:style w:type="paragraph" w:styleId="berschrift1"><w:name w:val="heading 1"/></w:style>"#)
            .document();
        let mut target = DocxBuilder::new()
            .body("")
            .styles(r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>"#)
            .document();
        let mut ctx = CompositionContext::new();

        let block = append_first_block(&source, &mut target);
        let outcomes = add_styles(&mut ctx, &source, &mut target, block).unwrap();
        assert_eq!(
            outcomes,
            vec![StyleOutcome::Existing {
                source_id: "berschrift1".to_string(),
                target_id: "Heading1".to_string()
            }]
        );
        let doc = target.document();
        let p_style = doc.find_descendant(block, W, "pStyle").unwrap();
        assert_eq!(doc.w_val(p_style), Some("Heading1"));
        assert_eq!(count_named(&target, "heading 1"), 1);
    }

    #[test]
    fn test_missing_style_is_copied_with_linked_style() {
        let source = DocxBuilder::new()
            .body(r#"<w:p><w:pPr><w:pStyle w:val="Quote"/></w:pPr></w:p>"#)
            .styles(
                r#"<w:style w:type="paragraph" w:styleId="Quote"><w:name w:val="Quote"/><w:link w:val="QuoteChar"/></w:style>
                   <w:style w:type="character" w:styleId="QuoteChar"><w:name w:val="Quote Char"/><w:link w:val="Quote"/></w:style>"#,
            )
            .document();
        let mut target = DocxBuilder::new()
            .body("")
            .styles(r#"<w:style w:type="paragraph" w:styleId="Normal"><w:name w:val="Normal"/></w:style>"#)
            .document();
        let mut ctx = CompositionContext::new();

        let block = append_first_block(&source, &mut target);
        let outcomes = add_styles(&mut ctx, &source, &mut target, block).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(&outcomes[0], StyleOutcome::Copied { style_id, .. } if style_id == "Quote"));
        assert!(matches!(&outcomes[1], StyleOutcome::Copied { style_id, .. } if style_id == "QuoteChar"));

        let styles = target.xml_part("word/styles.xml").unwrap();
        assert!(find_style(styles, "Quote").is_some());
        assert!(find_style(styles, "QuoteChar").is_some());

        // the same style again within the call is found in the target now
        let again = append_first_block(&source, &mut target);
        let outcomes = add_styles(&mut ctx, &source, &mut target, again).unwrap();
        assert_eq!(
            outcomes,
            vec![StyleOutcome::Existing {
                source_id: "Quote".to_string(),
                target_id: "Quote".to_string()
            }]
        );
        assert_eq!(count_named(&target, "Quote"), 1);
    }

    #[test]
    fn test_identity_fallback_and_missing() {
        let source = DocxBuilder::new()
            .body(r#"<w:p><w:pPr><w:pStyle w:val="Shared"/></w:pPr><w:r><w:rPr><w:rStyle w:val="Ghost"/></w:rPr></w:r></w:p>"#)
            .styles(r#"<w:style w:type="paragraph" w:styleId="Shared"><w:name w:val="Source Name"/></w:style>"#)
            .document();
        let mut target = DocxBuilder::new()
            .body("")
            .styles(r#"<w:style w:type="paragraph" w:styleId="Shared"><w:name w:val="Target Name"/></w:style>"#)
            .document();
        let mut ctx = CompositionContext::new();

        let block = append_first_block(&source, &mut target);
        let outcomes = add_styles(&mut ctx, &source, &mut target, block).unwrap();
        assert_eq!(
            outcomes,
            vec![
                StyleOutcome::FellBackToIdentity {
                    style_id: "Shared".to_string()
                },
                StyleOutcome::Missing {
                    style_id: "Ghost".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_copied_style_brings_numbering() {
        let source = DocxBuilder::new()
            .body(r#"<w:p><w:pPr><w:pStyle w:val="ListNumber"/></w:pPr></w:p>"#)
            .styles(r#"<w:style w:type="paragraph" w:styleId="ListNumber"><w:name w:val="List Number"/><w:pPr><w:numPr><w:numId w:val="3"/></w:numPr></w:pPr></w:style>"#)
            .numbering(r#"<w:abstractNum w:abstractNumId="0"><w:nsid w:val="00000001"/><w:lvl w:ilvl="0"><w:numFmt w:val="decimal"/><w:pStyle w:val="ListNumber"/></w:lvl></w:abstractNum><w:num w:numId="3"><w:abstractNumId w:val="0"/></w:num>"#)
            .document();
        let mut target = DocxBuilder::new()
            .body("")
            .styles(r#"<w:style w:type="paragraph" w:styleId="Normal"><w:name w:val="Normal"/></w:style>"#)
            .document();
        let mut ctx = CompositionContext::new();

        let block = append_first_block(&source, &mut target);
        let outcomes = add_styles(&mut ctx, &source, &mut target, block).unwrap();
        let StyleOutcome::Copied { numberings, .. } = &outcomes[0] else {
            panic!("expected a copied style, got {:?}", outcomes[0]);
        };
        assert_eq!(
            numberings,
            &vec![NumberingOutcome::Remapped {
                source: 3,
                target: 1,
                abstract_num_id: 0,
                abstract_reused: false
            }]
        );

        let styles = target.xml_part("word/styles.xml").unwrap();
        let style = find_style(styles, "ListNumber").unwrap();
        let num_id = styles.find_descendant(style, W, "numId").unwrap();
        assert_eq!(styles.w_val(num_id), Some("1"));
        assert_eq!(ctx.refs.map_num_id(3), 1);
    }

    #[test]
    fn test_existing_numbered_style_maps_abstract_numbering() {
        let numbering = r#"<w:abstractNum w:abstractNumId="4"><w:lvl w:ilvl="0"><w:numFmt w:val="decimal"/></w:lvl></w:abstractNum><w:num w:numId="2"><w:abstractNumId w:val="4"/></w:num>"#;
        let style = r#"<w:style w:type="paragraph" w:styleId="ListNumber"><w:name w:val="List Number"/><w:pPr><w:numPr><w:numId w:val="2"/></w:numPr></w:pPr></w:style>"#;
        let source = DocxBuilder::new()
            .body(r#"<w:p><w:pPr><w:pStyle w:val="ListNumber"/></w:pPr></w:p>"#)
            .styles(style)
            .numbering(&numbering.replace(r#"w:abstractNumId="4""#, r#"w:abstractNumId="7""#).replace(r#"<w:abstractNumId w:val="4"/>"#, r#"<w:abstractNumId w:val="7"/>"#))
            .document();
        let mut target = DocxBuilder::new().body("").styles(style).numbering(numbering).document();
        let mut ctx = CompositionContext::new();

        let block = append_first_block(&source, &mut target);
        add_styles(&mut ctx, &source, &mut target, block).unwrap();
        assert_eq!(ctx.refs.abstract_num_ids.get(&7), Some(&4));
    }

    #[test]
    fn test_target_without_styles_part_keeps_references() {
        let source = DocxBuilder::new()
            .body(r#"<w:p><w:pPr><w:pStyle w:val="Body"/></w:pPr></w:p>"#)
            .styles(r#"<w:style w:type="paragraph" w:styleId="Body"><w:name w:val="Body"/></w:style>"#)
            .document();
        let mut target = DocxBuilder::new().body("").document();
        let mut ctx = CompositionContext::new();

        let block = append_first_block(&source, &mut target);
        assert!(add_styles(&mut ctx, &source, &mut target, block).unwrap().is_empty());
        let doc = target.document();
        assert_eq!(doc.w_val(doc.find_descendant(block, W, "pStyle").unwrap()), Some("Body"));
    }
}
