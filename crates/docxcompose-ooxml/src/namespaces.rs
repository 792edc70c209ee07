//! Namespace registry
//!
//! Every element and attribute query in docxcompose is expressed as a
//! `(Namespace, local_name)` pair. The prefixes here are the conventional
//! ones Word writes; documents may bind the same URI to another prefix and
//! lookups still match because comparison goes through the URI.

/// A namespace with its conventional prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub prefix: &'static str,
    pub uri: &'static str,
}

impl Namespace {
    pub const fn new(prefix: &'static str, uri: &'static str) -> Self {
        Self { prefix, uri }
    }
}

pub const W: Namespace = Namespace::new(
    "w",
    "http://schemas.openxmlformats.org/wordprocessingml/2006/main",
);
pub const WP: Namespace = Namespace::new(
    "wp",
    "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing",
);
pub const A: Namespace = Namespace::new("a", "http://schemas.openxmlformats.org/drawingml/2006/main");
pub const PIC: Namespace =
    Namespace::new("pic", "http://schemas.openxmlformats.org/drawingml/2006/picture");
pub const R: Namespace = Namespace::new(
    "r",
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
);
pub const V: Namespace = Namespace::new("v", "urn:schemas-microsoft-com:vml");
pub const O: Namespace = Namespace::new("o", "urn:schemas-microsoft-com:office:office");
pub const CP: Namespace = Namespace::new(
    "cp",
    "http://schemas.openxmlformats.org/officeDocument/2006/custom-properties",
);
pub const VT: Namespace = Namespace::new(
    "vt",
    "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes",
);
pub const DGM: Namespace =
    Namespace::new("dgm", "http://schemas.openxmlformats.org/drawingml/2006/diagram");
pub const ASVG: Namespace = Namespace::new(
    "asvg",
    "http://schemas.microsoft.com/office/drawing/2016/SVG/main",
);
pub const MC: Namespace = Namespace::new(
    "mc",
    "http://schemas.openxmlformats.org/markup-compatibility/2006",
);
pub const XML: Namespace = Namespace::new("xml", "http://www.w3.org/XML/1998/namespace");

/// Package relationships (`_rels/*.rels`)
pub const PR: Namespace = Namespace::new(
    "pr",
    "http://schemas.openxmlformats.org/package/2006/relationships",
);

/// Content types (`[Content_Types].xml`)
pub const CT: Namespace = Namespace::new(
    "ct",
    "http://schemas.openxmlformats.org/package/2006/content-types",
);

/// All known namespaces
pub const REGISTRY: &[Namespace] = &[W, WP, A, PIC, R, V, O, CP, VT, DGM, ASVG, MC, XML, PR, CT];

/// Find a namespace by its conventional prefix
pub fn lookup(prefix: &str) -> Option<Namespace> {
    REGISTRY.iter().copied().find(|ns| ns.prefix == prefix)
}

/// Split a prefixed name such as `w:p` into its namespace and local part
pub fn qualify(qname: &str) -> Option<(Namespace, &str)> {
    let (prefix, local) = qname.split_once(':')?;
    lookup(prefix).map(|ns| (ns, local))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_prefix() {
        assert_eq!(lookup("w"), Some(W));
        assert!(lookup("zz").is_none());
    }

    #[test]
    fn test_qualify() {
        let (ns, local) = qualify("dgm:relIds").unwrap();
        assert_eq!(ns, DGM);
        assert_eq!(local, "relIds");
        assert!(qualify("plain").is_none());
        assert!(qualify("unknown:thing").is_none());
    }
}
