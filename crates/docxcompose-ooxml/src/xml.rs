//! Arena-backed XML tree
//!
//! Parts are parsed into an [`XmlDocument`]: an `indextree` arena of
//! [`XmlNode`]s addressed by `NodeId`. Element and attribute names keep both
//! the prefix they were written with and the namespace URI it resolved to,
//! so queries match on URI while serialization reproduces the original
//! prefixes.
//!
//! Subtrees move between documents through [`XmlDocument::import`], which
//! copies the nodes into the destination arena and declares any namespace
//! binding the copy relies on that the destination does not already make.

use indextree::{Arena, NodeId};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{OoxmlError, Result};
use crate::namespaces::{qualify, Namespace, W, XML};

/// A namespace declaration: `None` prefix is the default namespace
pub type NamespaceDecl = (Option<String>, String);

/// Qualified name of an element or attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<String>,
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    /// Name in `ns`, written with the given prefix
    pub fn with_prefix(prefix: Option<String>, ns: Namespace, local: &str) -> Self {
        Self {
            prefix,
            namespace: Some(ns.uri.to_string()),
            local: local.to_string(),
        }
    }

    /// Name without namespace
    pub fn plain(local: &str) -> Self {
        Self {
            prefix: None,
            namespace: None,
            local: local.to_string(),
        }
    }

    pub fn matches(&self, ns: Namespace, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == Some(ns.uri)
    }

    /// Name as written in markup, e.g. `w:p`
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub name: QName,
    /// `xmlns` declarations made on this element
    pub namespace_decls: Vec<NamespaceDecl>,
    pub attributes: Vec<Attribute>,
}

impl Element {
    fn attribute(&self, ns: Option<Namespace>, local: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| match ns {
            Some(ns) => attr.name.matches(ns, local),
            None => attr.name.namespace.is_none() && attr.name.local == local,
        })
    }
}

#[derive(Debug, Clone)]
pub enum XmlNode {
    Element(Element),
    Text(String),
    Comment(String),
}

/// A parsed XML part
#[derive(Debug)]
pub struct XmlDocument {
    arena: Arena<XmlNode>,
    root: NodeId,
}

impl XmlDocument {
    /// Create a document holding only a root element bound to `ns`
    pub fn new(ns: Namespace, local: &str) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(XmlNode::Element(Element {
            name: QName::with_prefix(Some(ns.prefix.to_string()), ns, local),
            namespace_decls: vec![(Some(ns.prefix.to_string()), ns.uri.to_string())],
            attributes: Vec::new(),
        }));
        Self { arena, root }
    }

    /// Parse XML bytes into a tree
    ///
    /// Whitespace-only text is dropped except where it is content: inside
    /// text-bearing WordprocessingML elements, variant-type values, and
    /// elements marked `xml:space="preserve"`.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(false);

        let mut arena = Arena::new();
        let mut open: Vec<NodeId> = Vec::new();
        let mut scopes: Vec<Vec<NamespaceDecl>> = Vec::new();
        let mut root = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(start) => {
                    let element = read_element(&start, &mut scopes)?;
                    let id = arena.new_node(XmlNode::Element(element));
                    attach(&mut arena, open.last().copied(), &mut root, id)?;
                    open.push(id);
                }
                Event::Empty(start) => {
                    let element = read_element(&start, &mut scopes)?;
                    scopes.pop();
                    let id = arena.new_node(XmlNode::Element(element));
                    attach(&mut arena, open.last().copied(), &mut root, id)?;
                }
                Event::End(_) => {
                    open.pop();
                    scopes.pop();
                }
                Event::Text(text) => {
                    if let Some(&parent) = open.last() {
                        let text = text.unescape()?.into_owned();
                        if !text.trim().is_empty() || keeps_whitespace(&arena, parent) {
                            let id = arena.new_node(XmlNode::Text(text));
                            parent.append(id, &mut arena);
                        }
                    }
                }
                Event::CData(data) => {
                    if let Some(&parent) = open.last() {
                        let text = String::from_utf8_lossy(&data).into_owned();
                        let id = arena.new_node(XmlNode::Text(text));
                        parent.append(id, &mut arena);
                    }
                }
                Event::Comment(comment) => {
                    if let Some(&parent) = open.last() {
                        let text = String::from_utf8_lossy(&comment).into_owned();
                        let id = arena.new_node(XmlNode::Comment(text));
                        parent.append(id, &mut arena);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let root = root.ok_or_else(|| {
            OoxmlError::InvalidStructure("XML content has no root element".to_string())
        })?;
        Ok(Self { arena, root })
    }

    /// Serialize with a standalone UTF-8 declaration
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new(
            "1.0",
            Some("UTF-8"),
            Some("yes"),
        )))?;
        writer.get_mut().extend_from_slice(b"\r\n");
        self.write_node(&mut writer, self.root)?;
        Ok(writer.into_inner())
    }

    pub fn to_xml_string(&self) -> Result<String> {
        let bytes = self.to_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<()> {
        match self.arena[id].get() {
            XmlNode::Element(element) => {
                let qname = element.name.qualified();
                let mut start = BytesStart::new(qname.as_str());
                for (prefix, uri) in &element.namespace_decls {
                    let key = match prefix {
                        Some(prefix) => format!("xmlns:{}", prefix),
                        None => "xmlns".to_string(),
                    };
                    start.push_attribute((key.as_str(), uri.as_str()));
                }
                for attr in &element.attributes {
                    let key = attr.name.qualified();
                    start.push_attribute((key.as_str(), attr.value.as_str()));
                }

                if id.children(&self.arena).next().is_none() {
                    writer.write_event(Event::Empty(start))?;
                } else {
                    writer.write_event(Event::Start(start))?;
                    for child in id.children(&self.arena) {
                        self.write_node(writer, child)?;
                    }
                    writer.write_event(Event::End(BytesEnd::new(qname.as_str())))?;
                }
            }
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            XmlNode::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Node inspection
    // ---------------------------------------------------------------------

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &XmlNode {
        self.arena[id].get()
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.arena.get(id).map(|node| node.get()) {
            Some(XmlNode::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.arena.get_mut(id).map(|node| node.get_mut()) {
            Some(XmlNode::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn name(&self, id: NodeId) -> Option<&QName> {
        self.element(id).map(|element| &element.name)
    }

    /// True if `id` is the element `ns:local`
    pub fn is(&self, id: NodeId, ns: Namespace, local: &str) -> bool {
        self.name(id).is_some_and(|name| name.matches(ns, local))
    }

    /// Namespaced attribute value
    pub fn attr(&self, id: NodeId, ns: Namespace, local: &str) -> Option<&str> {
        self.element(id)
            .and_then(|element| element.attribute(Some(ns), local))
            .map(|attr| attr.value.as_str())
    }

    /// Attribute without namespace, e.g. `wp:docPr/@id`
    pub fn plain_attr(&self, id: NodeId, local: &str) -> Option<&str> {
        self.element(id)
            .and_then(|element| element.attribute(None, local))
            .map(|attr| attr.value.as_str())
    }

    /// Shorthand for the ubiquitous `w:val`
    pub fn w_val(&self, id: NodeId) -> Option<&str> {
        self.attr(id, W, "val")
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|node| node.parent())
    }

    /// All child nodes, text and comments included
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        id.children(&self.arena).collect()
    }

    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        id.children(&self.arena)
            .filter(|child| self.is_element(*child))
            .collect()
    }

    pub fn find_child(&self, id: NodeId, ns: Namespace, local: &str) -> Option<NodeId> {
        id.children(&self.arena)
            .find(|child| self.is(*child, ns, local))
    }

    pub fn children_named(&self, id: NodeId, ns: Namespace, local: &str) -> Vec<NodeId> {
        id.children(&self.arena)
            .filter(|child| self.is(*child, ns, local))
            .collect()
    }

    /// Descendant elements in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        id.descendants(&self.arena)
            .skip(1)
            .filter(|node| self.is_element(*node))
            .collect()
    }

    pub fn descendants_named(&self, id: NodeId, ns: Namespace, local: &str) -> Vec<NodeId> {
        id.descendants(&self.arena)
            .skip(1)
            .filter(|node| self.is(*node, ns, local))
            .collect()
    }

    pub fn find_descendant(&self, id: NodeId, ns: Namespace, local: &str) -> Option<NodeId> {
        id.descendants(&self.arena)
            .skip(1)
            .find(|node| self.is(*node, ns, local))
    }

    /// Elements reached from `id` by a child path in conventional prefixes,
    /// e.g. `w:pPr/w:numPr/w:numId`; empty when a prefix is unknown
    pub fn select(&self, id: NodeId, path: &str) -> Vec<NodeId> {
        let mut current = vec![id];
        for step in path.split('/') {
            let Some((ns, local)) = qualify(step) else {
                return Vec::new();
            };
            current = current
                .into_iter()
                .flat_map(|node| self.children_named(node, ns, local))
                .collect();
        }
        current
    }

    /// First element reached by [`XmlDocument::select`]
    pub fn select_first(&self, id: NodeId, path: &str) -> Option<NodeId> {
        self.select(id, path).into_iter().next()
    }

    /// Nearest ancestor named `ns:local`
    pub fn ancestor_named(&self, id: NodeId, ns: Namespace, local: &str) -> Option<NodeId> {
        id.ancestors(&self.arena)
            .skip(1)
            .find(|node| self.is(*node, ns, local))
    }

    /// Position of `id` among its parent's element children
    pub fn element_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.child_elements(parent)
            .iter()
            .position(|child| *child == id)
    }

    /// Concatenated text content of `id` and its descendants
    pub fn text(&self, id: NodeId) -> String {
        id.descendants(&self.arena)
            .filter_map(|node| match self.arena[node].get() {
                XmlNode::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// True once `id` has been removed from the arena
    pub fn is_removed(&self, id: NodeId) -> bool {
        id.is_removed(&self.arena)
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    /// Create a detached element in `ns`
    pub fn create_element(&mut self, ns: Namespace, local: &str) -> NodeId {
        let prefix = self.bind_prefix(ns, false);
        self.arena.new_node(XmlNode::Element(Element {
            name: QName::with_prefix(prefix, ns, local),
            namespace_decls: Vec::new(),
            attributes: Vec::new(),
        }))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.arena.new_node(XmlNode::Text(text.into()))
    }

    pub fn set_attr(&mut self, id: NodeId, ns: Namespace, local: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(attr) = self
            .element_mut(id)
            .and_then(|element| element.attributes.iter_mut().find(|a| a.name.matches(ns, local)))
        {
            attr.value = value;
            return;
        }
        let prefix = self.bind_prefix(ns, true);
        if let Some(element) = self.element_mut(id) {
            element.attributes.push(Attribute {
                name: QName::with_prefix(prefix, ns, local),
                value,
            });
        }
    }

    pub fn set_plain_attr(&mut self, id: NodeId, local: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(element) = self.element_mut(id) {
            let existing = element
                .attributes
                .iter()
                .position(|a| a.name.namespace.is_none() && a.name.local == local);
            match existing {
                Some(index) => element.attributes[index].value = value,
                None => element.attributes.push(Attribute {
                    name: QName::plain(local),
                    value,
                }),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, ns: Namespace, local: &str) -> Option<String> {
        let element = self.element_mut(id)?;
        let index = element
            .attributes
            .iter()
            .position(|a| a.name.matches(ns, local))?;
        Some(element.attributes.remove(index).value)
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        parent.append(child, &mut self.arena);
    }

    pub fn insert_before(&mut self, sibling: NodeId, node: NodeId) {
        sibling.insert_before(node, &mut self.arena);
    }

    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) {
        sibling.insert_after(node, &mut self.arena);
    }

    /// Insert `child` so that it becomes element child number `index`;
    /// past the end it is appended
    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        match self.child_elements(parent).get(index) {
            Some(&sibling) => self.insert_before(sibling, child),
            None => self.append(parent, child),
        }
    }

    /// Find the child `ns:local` or append a new one
    pub fn ensure_child(&mut self, parent: NodeId, ns: Namespace, local: &str) -> NodeId {
        if let Some(child) = self.find_child(parent, ns, local) {
            return child;
        }
        let child = self.create_element(ns, local);
        self.append(parent, child);
        child
    }

    /// Unlink `id` from its parent, keeping the subtree alive
    pub fn detach(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }

    /// Remove `id` and its subtree
    pub fn remove(&mut self, id: NodeId) {
        id.remove_subtree(&mut self.arena);
    }

    /// Replace the content of `id` with a single text node
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        for child in self.children(id) {
            self.remove(child);
        }
        let node = self.create_text(text);
        self.append(id, node);
    }

    /// Copy a subtree within this document; the copy is detached
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.arena[id].get().clone();
        let copy = self.arena.new_node(data);
        for child in self.children(id) {
            let child_copy = self.deep_clone(child);
            copy.append(child_copy, &mut self.arena);
        }
        copy
    }

    /// Copy a subtree of `source` into this document; the copy is detached
    ///
    /// Namespace bindings used by the copy and not made by this document's
    /// root are declared on the copied element.
    pub fn import(&mut self, source: &XmlDocument, id: NodeId) -> NodeId {
        let copy = self.copy_from(source, id);

        let mut scope = self
            .element(self.root)
            .map(|root| root.namespace_decls.clone())
            .unwrap_or_default();
        let mut missing = Vec::new();
        self.unbound_namespaces(copy, &mut scope, &mut missing);

        if let Some(element) = self.element_mut(copy) {
            element.namespace_decls.extend(missing);
        }
        copy
    }

    fn copy_from(&mut self, source: &XmlDocument, id: NodeId) -> NodeId {
        let copy = self.arena.new_node(source.arena[id].get().clone());
        for child in id.children(&source.arena) {
            let child_copy = self.copy_from(source, child);
            copy.append(child_copy, &mut self.arena);
        }
        copy
    }

    fn unbound_namespaces(
        &self,
        id: NodeId,
        scope: &mut Vec<NamespaceDecl>,
        missing: &mut Vec<NamespaceDecl>,
    ) {
        let XmlNode::Element(element) = self.arena[id].get() else {
            return;
        };
        let depth = scope.len();
        scope.extend(element.namespace_decls.iter().cloned());

        let names = std::iter::once(&element.name).chain(element.attributes.iter().map(|a| &a.name));
        for name in names {
            let Some(uri) = &name.namespace else {
                continue;
            };
            if name.prefix.as_deref() == Some(XML.prefix) {
                continue;
            }
            let binding = (name.prefix.clone(), uri.clone());
            if !scope.contains(&binding) && !missing.contains(&binding) {
                missing.push(binding);
            }
        }

        for child in id.children(&self.arena) {
            self.unbound_namespaces(child, scope, missing);
        }
        scope.truncate(depth);
    }

    /// Prefix under which `ns` is bound at the root, declaring it if needed.
    /// Attributes never use the default namespace.
    fn bind_prefix(&mut self, ns: Namespace, for_attribute: bool) -> Option<String> {
        if ns == XML {
            return Some(XML.prefix.to_string());
        }
        let root = self.root;
        let decls = self
            .element(root)
            .map(|element| element.namespace_decls.clone())
            .unwrap_or_default();

        if let Some((prefix, _)) = decls
            .iter()
            .find(|(prefix, uri)| uri == ns.uri && (prefix.is_some() || !for_attribute))
        {
            return prefix.clone();
        }

        let taken = |candidate: &str| {
            decls
                .iter()
                .any(|(prefix, _)| prefix.as_deref() == Some(candidate))
        };
        let mut prefix = ns.prefix.to_string();
        let mut counter = 1;
        while taken(&prefix) {
            prefix = format!("{}{}", ns.prefix, counter);
            counter += 1;
        }

        if let Some(element) = self.element_mut(root) {
            element
                .namespace_decls
                .push((Some(prefix.clone()), ns.uri.to_string()));
        }
        Some(prefix)
    }
}

fn attach(
    arena: &mut Arena<XmlNode>,
    parent: Option<NodeId>,
    root: &mut Option<NodeId>,
    id: NodeId,
) -> Result<()> {
    match (parent, *root) {
        (Some(parent), _) => {
            parent.append(id, arena);
            Ok(())
        }
        (None, None) => {
            *root = Some(id);
            Ok(())
        }
        (None, Some(_)) => Err(OoxmlError::InvalidStructure(
            "XML content has more than one root element".to_string(),
        )),
    }
}

fn read_element(start: &BytesStart<'_>, scopes: &mut Vec<Vec<NamespaceDecl>>) -> Result<Element> {
    let raw_name = utf8(start.name().as_ref())?.to_string();
    let mut namespace_decls = Vec::new();
    let mut raw_attributes = Vec::new();

    for attr in start.attributes() {
        let attr = attr?;
        let key = utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        if key == "xmlns" {
            namespace_decls.push((None, value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            namespace_decls.push((Some(prefix.to_string()), value));
        } else {
            raw_attributes.push((key, value));
        }
    }

    scopes.push(namespace_decls.clone());
    let name = resolve(&raw_name, scopes, true);
    let attributes = raw_attributes
        .into_iter()
        .map(|(key, value)| Attribute {
            name: resolve(&key, scopes, false),
            value,
        })
        .collect();

    Ok(Element {
        name,
        namespace_decls,
        attributes,
    })
}

fn resolve(raw: &str, scopes: &[Vec<NamespaceDecl>], use_default: bool) -> QName {
    let (prefix, local) = match raw.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, raw),
    };
    let namespace = match prefix {
        Some(p) if p == XML.prefix => Some(XML.uri.to_string()),
        None if !use_default => None,
        _ => scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|(declared, _)| declared.as_deref() == prefix)
            .map(|(_, uri)| uri.clone())
            .filter(|uri| !uri.is_empty()),
    };
    QName {
        prefix: prefix.map(str::to_string),
        namespace,
        local: local.to_string(),
    }
}

fn keeps_whitespace(arena: &Arena<XmlNode>, parent: NodeId) -> bool {
    let XmlNode::Element(element) = arena[parent].get() else {
        return false;
    };
    if element
        .attribute(Some(XML), "space")
        .is_some_and(|attr| attr.value == "preserve")
    {
        return true;
    }
    let name = &element.name;
    ["t", "instrText", "delText", "delInstrText"]
        .iter()
        .any(|local| name.matches(W, local))
        || name.namespace.as_deref() == Some(crate::namespaces::VT.uri)
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map_err(|e| OoxmlError::InvalidStructure(format!("name is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::{A, R, WP};

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <w:body>
    <w:p><w:r><w:t xml:space="preserve"> padded </w:t></w:r></w:p>
    <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>a &amp; b</w:t></w:r></w:p>
    <!-- note -->
  </w:body>
</w:document>"#;

    #[test]
    fn test_parse_and_query() {
        let doc = XmlDocument::parse(DOC.as_bytes()).unwrap();
        let body = doc.find_child(doc.root(), W, "body").unwrap();
        assert_eq!(doc.child_elements(body).len(), 2);

        let styles = doc.descendants_named(body, W, "pStyle");
        assert_eq!(styles.len(), 1);
        assert_eq!(doc.w_val(styles[0]), Some("Heading1"));

        let texts = doc.descendants_named(body, W, "t");
        assert_eq!(doc.text(texts[0]), " padded ");
        assert_eq!(doc.text(texts[1]), "a & b");
    }

    #[test]
    fn test_select_child_path() {
        let doc = XmlDocument::parse(DOC.as_bytes()).unwrap();
        let root = doc.root();
        assert_eq!(doc.select(root, "w:body/w:p").len(), 2);

        let style = doc.select_first(root, "w:body/w:p/w:pPr/w:pStyle").unwrap();
        assert_eq!(doc.w_val(style), Some("Heading1"));
        assert!(doc.select(root, "w:body/w:tbl").is_empty());
        assert!(doc.select(root, "zz:body").is_empty());
        assert!(doc.select(root, "body").is_empty());
    }

    #[test]
    fn test_serialize_keeps_prefixes_and_escapes() {
        let doc = XmlDocument::parse(DOC.as_bytes()).unwrap();
        let xml = doc.to_xml_string().unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
        assert!(xml.contains(r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#));
        assert!(xml.contains(r#"<w:t xml:space="preserve"> padded </w:t>"#));
        assert!(xml.contains("a &amp; b"));
        assert!(xml.contains("<!-- note -->"));

        let reparsed = XmlDocument::parse(xml.as_bytes()).unwrap();
        let body = reparsed.find_child(reparsed.root(), W, "body").unwrap();
        assert_eq!(reparsed.child_elements(body).len(), 2);
    }

    #[test]
    fn test_matching_goes_through_uri() {
        let xml = r#"<x:document xmlns:x="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><x:body/></x:document>"#;
        let doc = XmlDocument::parse(xml.as_bytes()).unwrap();
        assert!(doc.is(doc.root(), W, "document"));
        assert!(doc.find_child(doc.root(), W, "body").is_some());
    }

    #[test]
    fn test_import_declares_missing_namespaces() {
        let source_xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body><w:p><w:r><w:drawing><wp:inline><wp:docPr id="7" name="Picture"/><a:blip r:embed="rId4"/></wp:inline></w:drawing></w:r></w:p></w:body></w:document>"#;
        let source = XmlDocument::parse(source_xml.as_bytes()).unwrap();
        let source_body = source.find_child(source.root(), W, "body").unwrap();
        let paragraph = source.child_elements(source_body)[0];

        let mut target = XmlDocument::parse(DOC.as_bytes()).unwrap();
        let target_body = target.find_child(target.root(), W, "body").unwrap();
        let copy = target.import(&source, paragraph);
        target.insert_at(target_body, 0, copy);

        let blip = target.find_descendant(copy, A, "blip").unwrap();
        assert_eq!(target.attr(blip, R, "embed"), Some("rId4"));
        let doc_pr = target.find_descendant(copy, WP, "docPr").unwrap();
        assert_eq!(target.plain_attr(doc_pr, "id"), Some("7"));

        let decls = &target.element(copy).unwrap().namespace_decls;
        assert!(decls.contains(&(Some("wp".to_string()), WP.uri.to_string())));
        assert!(decls.contains(&(Some("a".to_string()), A.uri.to_string())));
        // w and r are bound at the target root already
        assert!(!decls.iter().any(|(p, _)| p.as_deref() == Some("w")));
        assert!(!decls.iter().any(|(p, _)| p.as_deref() == Some("r")));

        assert_eq!(target.element_index(copy), Some(0));
        let xml = target.to_xml_string().unwrap();
        assert!(XmlDocument::parse(xml.as_bytes()).is_ok());
    }

    #[test]
    fn test_deep_clone_is_independent() {
        let mut doc = XmlDocument::parse(DOC.as_bytes()).unwrap();
        let style = doc.descendants_named(doc.root(), W, "pStyle")[0];
        let paragraph = doc.ancestor_named(style, W, "p").unwrap();

        let copy = doc.deep_clone(paragraph);
        doc.insert_after(paragraph, copy);
        let copied_style = doc.find_descendant(copy, W, "pStyle").unwrap();
        doc.set_attr(copied_style, W, "val", "Heading2");

        assert_eq!(doc.w_val(style), Some("Heading1"));
        assert_eq!(doc.w_val(copied_style), Some("Heading2"));
    }

    #[test]
    fn test_create_element_binds_unknown_namespace() {
        let mut doc = XmlDocument::new(W, "numbering");
        let child = doc.create_element(A, "blip");
        doc.append(doc.root(), child);
        doc.set_attr(child, R, "embed", "rId1");

        let xml = doc.to_xml_string().unwrap();
        assert!(xml.contains(r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main""#));
        assert!(xml.contains(r#"<a:blip r:embed="rId1"/>"#));
    }

    #[test]
    fn test_remove_and_set_text() {
        let mut doc = XmlDocument::parse(DOC.as_bytes()).unwrap();
        let body = doc.find_child(doc.root(), W, "body").unwrap();
        let first = doc.child_elements(body)[0];
        doc.remove(first);
        assert!(doc.is_removed(first));
        assert_eq!(doc.child_elements(body).len(), 1);

        let t = doc.descendants_named(body, W, "t")[0];
        doc.set_text(t, "replaced");
        assert_eq!(doc.text(t), "replaced");
    }

    #[test]
    fn test_rejects_empty_content() {
        assert!(XmlDocument::parse(b"").is_err());
    }
}
