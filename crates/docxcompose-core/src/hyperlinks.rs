//! External hyperlink relocation

use docxcompose_ooxml::namespaces::{R, W};
use docxcompose_ooxml::{NodeId, WordDocument};

use crate::error::Result;
use crate::parts::{xml_part, xml_part_mut};

/// Re-establish the external hyperlinks under `element`
///
/// `element` lives in the target part `target_part`; its relationship ids
/// still refer to `source_part` of `source`. Links to the same URL share
/// one relationship. Anchors and internal targets are left alone. Returns
/// the number of rewritten links.
pub fn add_hyperlinks(
    source: &WordDocument,
    source_part: &str,
    target: &mut WordDocument,
    target_part: &str,
    element: NodeId,
) -> Result<usize> {
    let links: Vec<(NodeId, String)> = {
        let doc = xml_part(target, target_part)?;
        doc.descendants_named(element, W, "hyperlink")
            .into_iter()
            .filter_map(|link| doc.attr(link, R, "id").map(|id| (link, id.to_string())))
            .collect()
    };

    let mut rewritten = Vec::new();
    for (link, r_id) in links {
        let Some(rel) = source
            .relationships(source_part)
            .and_then(|rels| rels.get_target(&r_id))
        else {
            log::warn!("hyperlink {} has no relationship in {}", r_id, source_part);
            continue;
        };
        if !rel.is_external() {
            continue;
        }
        let new_id = target
            .relationships_mut(target_part)
            .get_or_add_external(&rel.rel_type, &rel.target);
        rewritten.push((link, new_id));
    }

    let count = rewritten.len();
    if count > 0 {
        let doc = xml_part_mut(target, target_part)?;
        for (link, new_id) in rewritten {
            doc.set_attr(link, R, "id", new_id);
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docxcompose_ooxml::relationships::Relationships;
    use docxcompose_ooxml::test_utils::DocxBuilder;

    #[test]
    fn test_external_links_share_relationships() {
        let source = DocxBuilder::new()
            .body(
                r#"<w:p><w:hyperlink r:id="rId10"><w:r><w:t>one</w:t></w:r></w:hyperlink>
                   <w:hyperlink r:id="rId11"><w:r><w:t>two</w:t></w:r></w:hyperlink>
                   <w:hyperlink w:anchor="_Toc1"><w:r><w:t>anchor</w:t></w:r></w:hyperlink>
                   <w:hyperlink r:id="rId99"><w:r><w:t>dangling</w:t></w:r></w:hyperlink></w:p>"#,
            )
            .external("rId10", Relationships::TYPE_HYPERLINK, "https://example.com/a")
            .external("rId11", Relationships::TYPE_HYPERLINK, "https://example.com/a")
            .document();
        let mut target = DocxBuilder::new()
            .body("")
            .external("rId10", Relationships::TYPE_HYPERLINK, "https://example.com/a")
            .document();

        let block = source.document().child_elements(source.body().unwrap())[0];
        let body = target.body().unwrap();
        let copy = target.document_mut().import(source.document(), block);
        target.document_mut().append(body, copy);

        let count = add_hyperlinks(&source, "word/document.xml", &mut target, "word/document.xml", copy).unwrap();
        assert_eq!(count, 2);

        let doc = target.document();
        let ids: Vec<Option<&str>> = doc
            .descendants_named(copy, W, "hyperlink")
            .into_iter()
            .map(|link| doc.attr(link, R, "id"))
            .collect();
        assert_eq!(ids, vec![Some("rId10"), Some("rId10"), None, Some("rId99")]);
        assert_eq!(target.relationships("word/document.xml").unwrap().len(), 1);
    }
}
