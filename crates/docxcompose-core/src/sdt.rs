//! Plain-text content controls (`w:sdt`)

use docxcompose_ooxml::namespaces::W;
use docxcompose_ooxml::{NodeId, WordDocument, XmlDocument};

use crate::error::Result;

/// Content controls in the body of a document, addressed by alias
pub struct StructuredDocumentTags<'a> {
    doc: &'a mut WordDocument,
}

impl<'a> StructuredDocumentTags<'a> {
    pub fn new(doc: &'a mut WordDocument) -> Self {
        Self { doc }
    }

    /// Tags whose `w:sdtPr/w:alias` equals `alias`, in document order
    pub fn tags_by_alias(&self, alias: &str) -> Result<Vec<NodeId>> {
        let body = self.doc.body()?;
        Ok(tags_in(self.doc.document(), body, alias))
    }

    /// Text of the first plain-text tag named `alias`
    pub fn get_text(&self, alias: &str) -> Result<Option<String>> {
        let xml = self.doc.document();
        for tag in self.tags_by_alias(alias)? {
            if plain_text_props(xml, tag).is_none() {
                continue;
            }
            let Some(content) = xml.find_child(tag, W, "sdtContent") else {
                continue;
            };
            if let Some(first) = run_texts(xml, content).first() {
                return Ok(Some(xml.text(*first)));
            }
        }
        Ok(None)
    }

    /// Replace the text of every plain-text tag named `alias`; returns the
    /// number of tags changed
    ///
    /// Single-line tags get newlines replaced by spaces. In multi-line tags
    /// each further line follows a `w:br` in the first text's run.
    pub fn set_text(&mut self, alias: &str, text: &str) -> Result<usize> {
        let tags = self.tags_by_alias(alias)?;
        let xml = self.doc.document_mut();
        let text = text.trim();

        let mut changed = 0;
        for tag in tags {
            let Some(plain_text) = plain_text_props(xml, tag) else {
                log::debug!("content control {:?} is not plain text", alias);
                continue;
            };
            let multiline = xml.attr(plain_text, W, "multiLine").is_some();
            let Some(content) = xml.find_child(tag, W, "sdtContent") else {
                continue;
            };
            let texts = run_texts(xml, content);
            let Some((&first, surplus)) = texts.split_first() else {
                continue;
            };
            let Some(run) = xml.parent(first) else {
                continue;
            };

            let normalized = if multiline {
                text.to_string()
            } else {
                text.replace('\n', " ")
            };
            let mut lines = normalized.split('\n');
            xml.set_text(first, lines.next().unwrap_or_default());

            let placeholder = xml.select_first(tag, "w:sdtPr/w:showingPlcHdr");
            if let Some(placeholder) = placeholder {
                xml.remove(placeholder);
                if let Some(run_props) = xml.find_child(run, W, "rPr") {
                    xml.remove(run_props);
                }
            }

            for other in surplus {
                if xml.is_removed(*other) {
                    continue;
                }
                match xml.parent(*other) {
                    Some(parent) if parent == run => xml.remove(*other),
                    Some(parent) => xml.remove(parent),
                    None => {}
                }
            }

            for line in lines {
                let br = xml.create_element(W, "br");
                xml.append(run, br);
                let copy = xml.deep_clone(first);
                xml.set_text(copy, line);
                xml.append(run, copy);
            }
            changed += 1;
        }
        Ok(changed)
    }
}

fn tags_in(xml: &XmlDocument, root: NodeId, alias: &str) -> Vec<NodeId> {
    xml.descendants_named(root, W, "sdt")
        .into_iter()
        .filter(|tag| {
            xml.select_first(*tag, "w:sdtPr/w:alias")
                .and_then(|node| xml.w_val(node))
                == Some(alias)
        })
        .collect()
}

fn plain_text_props(xml: &XmlDocument, tag: NodeId) -> Option<NodeId> {
    xml.select_first(tag, "w:sdtPr/w:text")
}

/// `w:t` elements directly inside runs
fn run_texts(xml: &XmlDocument, content: NodeId) -> Vec<NodeId> {
    xml.descendants_named(content, W, "t")
        .into_iter()
        .filter(|t| xml.parent(*t).is_some_and(|parent| xml.is(parent, W, "r")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docxcompose_ooxml::test_utils::DocxBuilder;

    fn tag(alias: &str, props: &str, content: &str) -> String {
        format!(
            r#"<w:sdt><w:sdtPr><w:alias w:val="{alias}"/>{props}</w:sdtPr><w:sdtContent>{content}</w:sdtContent></w:sdt>"#
        )
    }

    #[test]
    fn test_get_text() {
        let mut doc = DocxBuilder::new()
            .body(&format!(
                "{}{}",
                tag("Client", "", "<w:p><w:r><w:t>rich</w:t></w:r></w:p>"),
                tag("Client", "<w:text/>", "<w:p><w:r><w:t>ACME</w:t></w:r><w:r><w:t> Corp</w:t></w:r></w:p>")
            ))
            .document();
        let tags = StructuredDocumentTags::new(&mut doc);
        assert_eq!(tags.tags_by_alias("Client").unwrap().len(), 2);
        assert_eq!(tags.get_text("Client").unwrap().as_deref(), Some("ACME"));
        assert_eq!(tags.get_text("Other").unwrap(), None);
    }

    #[test]
    fn test_set_text_single_line() {
        let mut doc = DocxBuilder::new()
            .body(&tag(
                "Client",
                "<w:showingPlcHdr/><w:text/>",
                r#"<w:p><w:r><w:rPr><w:rStyle w:val="PlaceholderText"/></w:rPr><w:t>Click here</w:t><w:t> to</w:t></w:r><w:r><w:t> enter</w:t></w:r></w:p>"#,
            ))
            .document();

        let mut tags = StructuredDocumentTags::new(&mut doc);
        assert_eq!(tags.set_text("Client", "  ACME\nCorp  ").unwrap(), 1);
        assert_eq!(tags.get_text("Client").unwrap().as_deref(), Some("ACME Corp"));

        let xml = doc.document();
        let root = xml.root();
        assert!(xml.find_descendant(root, W, "showingPlcHdr").is_none());
        assert!(xml.find_descendant(root, W, "rPr").is_none());
        assert_eq!(xml.descendants_named(root, W, "r").len(), 1);
        assert_eq!(xml.descendants_named(root, W, "t").len(), 1);
    }

    #[test]
    fn test_set_text_multiline() {
        let mut doc = DocxBuilder::new()
            .body(&tag(
                "Address",
                r#"<w:text w:multiLine="1"/>"#,
                "<w:p><w:r><w:t>old</w:t></w:r></w:p>",
            ))
            .document();

        StructuredDocumentTags::new(&mut doc)
            .set_text("Address", "Main Street 1\n3000 Bern")
            .unwrap();

        let xml = doc.document();
        let run = xml.find_descendant(xml.root(), W, "r").unwrap();
        let children: Vec<String> = xml
            .child_elements(run)
            .into_iter()
            .map(|child| xml.name(child).map(|n| n.local.clone()).unwrap_or_default())
            .collect();
        assert_eq!(children, vec!["t", "br", "t"]);
        assert_eq!(xml.text(run), "Main Street 13000 Bern");
    }

    #[test]
    fn test_rich_text_tags_are_left_alone() {
        let mut doc = DocxBuilder::new()
            .body(&tag("Notes", "", "<w:p><w:r><w:t>keep</w:t></w:r></w:p>"))
            .document();
        assert_eq!(StructuredDocumentTags::new(&mut doc).set_text("Notes", "new").unwrap(), 0);
        assert_eq!(doc.document().text(doc.body().unwrap()), "keep");
    }
}
