//! Content type registry (`[Content_Types].xml`)
//!
//! A part's content type is its `Override` entry if one exists, otherwise
//! the `Default` for its extension.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};
use crate::namespaces::CT;

/// Path of the content type registry inside the package
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

pub const CT_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
pub const CT_XML: &str = "application/xml";
pub const CT_NUMBERING: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml";
pub const CT_FOOTNOTES: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.footnotes+xml";
pub const CT_STYLES: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
pub const CT_HEADER: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
pub const CT_FOOTER: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";
pub const CT_CUSTOM_PROPERTIES: &str =
    "application/vnd.openxmlformats-officedocument.custom-properties+xml";
pub const CT_OLE_OBJECT: &str = "application/vnd.openxmlformats-officedocument.oleObject";

/// Default and override content type mappings, in document order
#[derive(Debug, Clone, Default)]
pub struct ContentTypes {
    /// Lowercased extension to content type
    defaults: Vec<(String, String)>,
    /// Absolute part name (`/word/document.xml`) to content type
    overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn new() -> Self {
        Self {
            defaults: vec![
                ("rels".to_string(), CT_RELATIONSHIPS.to_string()),
                ("xml".to_string(), CT_XML.to_string()),
            ],
            overrides: Vec::new(),
        }
    }

    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut types = Self::default();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if matches!(e.local_name().as_ref(), b"Default" | b"Override") =>
                {
                    let is_default = e.local_name().as_ref() == b"Default";
                    let mut key = None;
                    let mut content_type = None;
                    for attr in e.attributes() {
                        let attr = attr?;
                        match attr.key.as_ref() {
                            b"Extension" | b"PartName" => {
                                key = Some(attr.unescape_value()?.into_owned());
                            }
                            b"ContentType" => {
                                content_type = Some(attr.unescape_value()?.into_owned());
                            }
                            _ => {}
                        }
                    }

                    if let (Some(key), Some(content_type)) = (key, content_type) {
                        if is_default {
                            types.add_default(&key, &content_type);
                        } else {
                            types.add_override(&key, &content_type);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(types)
    }

    /// Content type of a part; `path` may be given with or without the
    /// leading slash
    pub fn content_type_for(&self, path: &str) -> Option<&str> {
        let partname = partname(path);
        if let Some((_, ct)) = self
            .overrides
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&partname))
        {
            return Some(ct);
        }
        let ext = extension(path)?.to_ascii_lowercase();
        self.defaults
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, ct)| ct.as_str())
    }

    pub fn default_for(&self, ext: &str) -> Option<&str> {
        let ext = ext.to_ascii_lowercase();
        self.defaults
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, ct)| ct.as_str())
    }

    pub fn add_default(&mut self, ext: &str, content_type: &str) {
        let ext = ext.to_ascii_lowercase();
        match self.defaults.iter_mut().find(|(e, _)| *e == ext) {
            Some(entry) => entry.1 = content_type.to_string(),
            None => self.defaults.push((ext, content_type.to_string())),
        }
    }

    pub fn add_override(&mut self, path: &str, content_type: &str) {
        let name = partname(path);
        match self.overrides.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = content_type.to_string(),
            None => self.overrides.push((name, content_type.to_string())),
        }
    }

    pub fn remove_override(&mut self, path: &str) {
        let name = partname(path);
        self.overrides.retain(|(n, _)| *n != name);
    }

    /// Register `path` with `content_type`: nothing when already resolved
    /// to it, a new `Default` when the extension has none, otherwise an
    /// `Override`
    pub fn register(&mut self, path: &str, content_type: &str) {
        if self.content_type_for(path) == Some(content_type) {
            return;
        }
        match extension(path) {
            Some(ext) if self.default_for(ext).is_none() => self.add_default(ext, content_type),
            _ => self.add_override(path, content_type),
        }
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str("\r\n");
        xml.push_str(&format!(r#"<Types xmlns="{}">"#, CT.uri));
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(ct)
            ));
        }
        for (name, ct) in &self.overrides {
            xml.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(name),
                escape_xml(ct)
            ));
        }
        xml.push_str("</Types>");
        xml
    }
}

fn partname(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Extension of the last path segment, without the dot
pub fn extension(path: &str) -> Option<&str> {
    let file = path.rsplit('/').next()?;
    file.rsplit_once('.').map(|(_, ext)| ext)
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPES: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="PNG" ContentType="image/png"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

    #[test]
    fn test_override_wins_over_default() {
        let types = ContentTypes::parse(TYPES).unwrap();
        assert_eq!(
            types.content_type_for("word/document.xml"),
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml")
        );
        assert_eq!(types.content_type_for("/word/styles.xml"), Some(CT_XML));
        assert_eq!(types.content_type_for("word/media/image1.png"), Some("image/png"));
        assert_eq!(types.content_type_for("word/media/image1.emf"), None);
    }

    #[test]
    fn test_register_prefers_defaults_for_new_extensions() {
        let mut types = ContentTypes::parse(TYPES).unwrap();

        types.register("word/media/image2.emf", "image/x-emf");
        assert_eq!(types.default_for("emf"), Some("image/x-emf"));

        types.register("word/numbering.xml", CT_NUMBERING);
        assert_eq!(types.content_type_for("word/numbering.xml"), Some(CT_NUMBERING));

        // already resolvable: nothing added
        types.register("word/media/image3.png", "image/png");
        assert!(!types.to_xml().contains("image3"));
    }

    #[test]
    fn test_to_xml_round_trip() {
        let mut types = ContentTypes::new();
        types.add_override("word/footnotes.xml", CT_FOOTNOTES);
        let xml = types.to_xml();
        assert!(xml.contains(r#"<Override PartName="/word/footnotes.xml""#));

        let reparsed = ContentTypes::parse(xml.as_bytes()).unwrap();
        assert_eq!(reparsed.content_type_for("word/footnotes.xml"), Some(CT_FOOTNOTES));
        assert_eq!(reparsed.content_type_for("_rels/.rels"), Some(CT_RELATIONSHIPS));

        let mut removed = reparsed.clone();
        removed.remove_override("/word/footnotes.xml");
        assert_eq!(removed.content_type_for("word/footnotes.xml"), Some(CT_XML));
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("word/media/image1.jpeg"), Some("jpeg"));
        assert_eq!(extension("_rels/.rels"), Some("rels"));
        assert_eq!(extension("word/media/noext"), None);
    }
}
