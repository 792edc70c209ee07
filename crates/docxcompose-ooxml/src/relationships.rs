//! Relationship collections (`_rels/*.rels`)
//!
//! Every part that references other parts or external resources owns a
//! relationship collection mapping `rId` strings to targets. Composition
//! mostly adds entries: copied images, embeddings and diagrams get fresh
//! internal relationships, hyperlinks reuse an identical external one when
//! the collection already has it.
//!
//! # Example
//!
//! ```
//! use docxcompose_ooxml::Relationships;
//!
//! let mut rels = Relationships::new();
//! let image = rels.add("media/image1.png", Relationships::TYPE_IMAGE);
//! let link = rels.get_or_add_external(Relationships::TYPE_HYPERLINK, "https://example.com");
//! assert_eq!(image, "rId1");
//! assert_eq!(link, "rId2");
//! assert_eq!(rels.get_or_add_external(Relationships::TYPE_HYPERLINK, "https://example.com"), "rId2");
//! ```

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};
use crate::namespaces::PR;

/// Target mode value for relationships pointing outside the package
pub const TARGET_MODE_EXTERNAL: &str = "External";

/// Relationship type URIs used by composition
impl Relationships {
    pub const TYPE_OFFICE_DOCUMENT: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const TYPE_CUSTOM_PROPERTIES: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/custom-properties";
    pub const TYPE_STYLES: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
    pub const TYPE_NUMBERING: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
    pub const TYPE_FOOTNOTES: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footnotes";
    pub const TYPE_HEADER: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
    pub const TYPE_FOOTER: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
    pub const TYPE_HYPERLINK: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
    pub const TYPE_IMAGE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    pub const TYPE_PACKAGE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/package";
    pub const TYPE_DIAGRAM_DATA: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/diagramData";
    pub const TYPE_DIAGRAM_LAYOUT: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/diagramLayout";
    pub const TYPE_DIAGRAM_QUICK_STYLE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/diagramQuickStyle";
    pub const TYPE_DIAGRAM_COLORS: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/diagramColors";
}

/// Ordered relationships of one part
#[derive(Debug, Clone)]
pub struct Relationships {
    /// Relationship IDs in document order
    order: Vec<String>,
    map: HashMap<String, RelationshipTarget>,
    /// Numeric suffix for the next generated `rId`
    next_id_counter: u32,
}

impl Default for Relationships {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            map: HashMap::new(),
            next_id_counter: 1,
        }
    }
}

/// A relationship target with its type and mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipTarget {
    /// Part path relative to the source part, or an external URI
    pub target: String,
    pub rel_type: String,
    /// `Some("External")` for targets outside the package
    pub target_mode: Option<String>,
}

impl RelationshipTarget {
    pub fn is_external(&self) -> bool {
        self.target_mode.as_deref() == Some(TARGET_MODE_EXTERNAL)
    }
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `.rels` part
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut rels = Self::new();
        let mut max_id: u32 = 0;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let mut id = None;
                        let mut target = None;
                        let mut rel_type = None;
                        let mut target_mode = None;

                        for attr in e.attributes() {
                            let attr = attr?;
                            let value = attr.unescape_value()?.into_owned();
                            match attr.key.as_ref() {
                                b"Id" => id = Some(value),
                                b"Target" => target = Some(value),
                                b"Type" => rel_type = Some(value),
                                b"TargetMode" => target_mode = Some(value),
                                _ => {}
                            }
                        }

                        if let (Some(id), Some(target)) = (id, target) {
                            if let Some(num) = extract_id_number(&id) {
                                max_id = max_id.max(num);
                            }
                            rels.insert(
                                id,
                                RelationshipTarget {
                                    target,
                                    rel_type: rel_type.unwrap_or_default(),
                                    target_mode,
                                },
                            );
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        rels.next_id_counter = max_id + 1;
        Ok(rels)
    }

    fn insert(&mut self, id: String, rel: RelationshipTarget) {
        if !self.map.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.map.insert(id, rel);
    }

    fn next_id(&mut self) -> String {
        loop {
            let id = format!("rId{}", self.next_id_counter);
            self.next_id_counter += 1;
            if !self.map.contains_key(&id) {
                return id;
            }
        }
    }

    /// Add an internal relationship and return its new ID
    pub fn add(&mut self, target: impl Into<String>, rel_type: impl Into<String>) -> String {
        self.add_with_mode(target, rel_type, None)
    }

    /// Add a relationship with an explicit target mode
    pub fn add_with_mode(
        &mut self,
        target: impl Into<String>,
        rel_type: impl Into<String>,
        target_mode: Option<String>,
    ) -> String {
        let id = self.next_id();
        self.insert(
            id.clone(),
            RelationshipTarget {
                target: target.into(),
                rel_type: rel_type.into(),
                target_mode,
            },
        );
        id
    }

    /// ID of an external relationship with this type and target, adding one
    /// if none exists
    pub fn get_or_add_external(&mut self, rel_type: &str, target: &str) -> String {
        let existing = self
            .iter()
            .find(|(_, rel)| rel.is_external() && rel.rel_type == rel_type && rel.target == target)
            .map(|(id, _)| id.to_string());
        match existing {
            Some(id) => id,
            None => self.add_with_mode(target, rel_type, Some(TARGET_MODE_EXTERNAL.to_string())),
        }
    }

    /// First internal relationship of the given type
    pub fn find_by_type(&self, rel_type: &str) -> Option<(&str, &RelationshipTarget)> {
        self.iter()
            .find(|(_, rel)| rel.rel_type == rel_type && !rel.is_external())
    }

    /// All relationships of the given type, in order
    pub fn all_by_type<'a>(
        &'a self,
        rel_type: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a RelationshipTarget)> + 'a {
        self.iter().filter(move |(_, rel)| rel.rel_type == rel_type)
    }

    /// Remove a relationship
    pub fn remove(&mut self, id: &str) -> Option<RelationshipTarget> {
        let removed = self.map.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some(removed)
    }

    /// Serialize to a `.rels` part
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str("\r\n");
        xml.push_str(&format!(r#"<Relationships xmlns="{}">"#, PR.uri));

        for (id, rel) in self.iter() {
            xml.push_str("<Relationship");
            xml.push_str(&format!(r#" Id="{}""#, escape_xml(id)));
            xml.push_str(&format!(r#" Type="{}""#, escape_xml(&rel.rel_type)));
            xml.push_str(&format!(r#" Target="{}""#, escape_xml(&rel.target)));
            if let Some(mode) = &rel.target_mode {
                xml.push_str(&format!(r#" TargetMode="{}""#, escape_xml(mode)));
            }
            xml.push_str("/>");
        }

        xml.push_str("</Relationships>");
        xml
    }

    /// Target string for a relationship ID
    pub fn get(&self, id: &str) -> Option<&str> {
        self.map.get(id).map(|r| r.target.as_str())
    }

    pub fn get_target(&self, id: &str) -> Option<&RelationshipTarget> {
        self.map.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.map.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationshipTarget)> {
        self.order
            .iter()
            .filter_map(|id| self.map.get(id).map(|rel| (id.as_str(), rel)))
    }

    /// The ID the next `add` would generate
    pub fn peek_next_id(&self) -> String {
        let mut counter = self.next_id_counter;
        loop {
            let id = format!("rId{}", counter);
            if !self.map.contains_key(&id) {
                return id;
            }
            counter += 1;
        }
    }
}

/// Numeric portion of a relationship ID (`rId5` -> 5)
fn extract_id_number(id: &str) -> Option<u32> {
    id.strip_prefix("rId")
        .or_else(|| id.strip_prefix("RId"))
        .or_else(|| id.strip_prefix("rid"))
        .and_then(|num_str| num_str.parse().ok())
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
