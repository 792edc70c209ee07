//! Test utilities for building in-memory Word packages
//!
//! Fixtures are written with `ZipWriter` straight into a byte buffer, so
//! tests need no binary files on disk.
//!
//! # Example
//!
//! ```
//! use docxcompose_ooxml::test_utils::DocxBuilder;
//!
//! let doc = DocxBuilder::new()
//!     .body(r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p>"#)
//!     .document();
//! assert!(doc.body().is_ok());
//! ```
//!
//! Relationship IDs `rId1` to `rId3` of the main part are reserved for the
//! styles, numbering and footnotes parts; fixtures adding their own
//! relationships should start at `rId10`.

use std::io::{Cursor, Write};

use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::archive::OoxmlArchive;
use crate::content_types::{
    ContentTypes, CONTENT_TYPES_PATH, CT_CUSTOM_PROPERTIES, CT_FOOTER, CT_FOOTNOTES, CT_HEADER,
    CT_NUMBERING, CT_STYLES,
};
use crate::docx::{relative_target, WordDocument, PACKAGE_RELS_PATH};
use crate::namespaces::{A, ASVG, CP, DGM, O, PIC, R, V, VT, W, WP};
use crate::relationships::{Relationships, TARGET_MODE_EXTERNAL};

const CT_MAIN: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";

/// Namespace declarations for WordprocessingML part roots
pub fn wml_namespaces() -> String {
    [W, R, WP, A, PIC, V, O]
        .iter()
        .map(|ns| format!(r#" xmlns:{}="{}""#, ns.prefix, ns.uri))
        .collect()
}

struct ExtraPart {
    path: String,
    content_type: String,
    data: Vec<u8>,
    relationship: Option<(String, String)>,
}

/// Builder for a minimal but well-formed .docx package
#[derive(Default)]
pub struct DocxBuilder {
    body: String,
    styles: Option<String>,
    numbering: Option<String>,
    footnotes: Option<String>,
    custom_properties: Option<String>,
    headers: Vec<(String, String, bool)>,
    parts: Vec<ExtraPart>,
    part_rels: Vec<(String, String, String, String)>,
    external: Vec<(String, String, String)>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content of `w:body`
    pub fn body(mut self, xml: &str) -> Self {
        self.body = xml.to_string();
        self
    }

    /// Content of `w:styles`
    pub fn styles(mut self, xml: &str) -> Self {
        self.styles = Some(xml.to_string());
        self
    }

    /// Content of `w:numbering`
    pub fn numbering(mut self, xml: &str) -> Self {
        self.numbering = Some(xml.to_string());
        self
    }

    /// Content of `w:footnotes`
    pub fn footnotes(mut self, xml: &str) -> Self {
        self.footnotes = Some(xml.to_string());
        self
    }

    /// `property` elements of the custom properties part
    pub fn custom_properties(mut self, xml: &str) -> Self {
        self.custom_properties = Some(xml.to_string());
        self
    }

    /// Header part related from the main part as `r_id`
    pub fn header(mut self, r_id: &str, xml: &str) -> Self {
        self.headers.push((r_id.to_string(), xml.to_string(), true));
        self
    }

    /// Footer part related from the main part as `r_id`
    pub fn footer(mut self, r_id: &str, xml: &str) -> Self {
        self.headers.push((r_id.to_string(), xml.to_string(), false));
        self
    }

    /// Arbitrary part related from the main part
    pub fn related_part(
        mut self,
        r_id: &str,
        rel_type: &str,
        path: &str,
        content_type: &str,
        data: &[u8],
    ) -> Self {
        self.parts.push(ExtraPart {
            path: path.to_string(),
            content_type: content_type.to_string(),
            data: data.to_vec(),
            relationship: Some((r_id.to_string(), rel_type.to_string())),
        });
        self
    }

    /// Relationship from a non-main part, e.g. a hyperlink in the footnotes
    pub fn part_relationship(mut self, part: &str, r_id: &str, rel_type: &str, target: &str) -> Self {
        self.part_rels.push((
            part.to_string(),
            r_id.to_string(),
            rel_type.to_string(),
            target.to_string(),
        ));
        self
    }

    /// External relationship of the main part
    pub fn external(mut self, r_id: &str, rel_type: &str, target: &str) -> Self {
        self.external
            .push((r_id.to_string(), rel_type.to_string(), target.to_string()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let ns = wml_namespaces();

        let mut content_types = ContentTypes::new();
        content_types.add_override("word/document.xml", CT_MAIN);

        let mut package_rels = Relationships::new();
        package_rels.add("word/document.xml", Relationships::TYPE_OFFICE_DOCUMENT);

        let mut main_rels = Vec::new();
        let mut files: Vec<(String, Vec<u8>)> = Vec::new();

        files.push((
            "word/document.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document{}><w:body>{}</w:body></w:document>"#,
                ns, self.body
            )
            .into_bytes(),
        ));

        let singletons = [
            (&self.styles, "rId1", "styles", Relationships::TYPE_STYLES, CT_STYLES),
            (&self.numbering, "rId2", "numbering", Relationships::TYPE_NUMBERING, CT_NUMBERING),
            (&self.footnotes, "rId3", "footnotes", Relationships::TYPE_FOOTNOTES, CT_FOOTNOTES),
        ];
        for (content, r_id, root, rel_type, content_type) in singletons {
            if let Some(content) = content {
                let path = format!("word/{}.xml", root);
                files.push((
                    path.clone(),
                    format!(
                        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:{root}{ns}>{content}</w:{root}>"#
                    )
                    .into_bytes(),
                ));
                content_types.add_override(&path, content_type);
                main_rels.push((r_id.to_string(), rel_type.to_string(), format!("{}.xml", root), None));
            }
        }

        let (mut header_no, mut footer_no) = (0, 0);
        for (r_id, content, is_header) in &self.headers {
            let (root, name, rel_type, content_type) = if *is_header {
                header_no += 1;
                ("hdr", format!("header{}.xml", header_no), Relationships::TYPE_HEADER, CT_HEADER)
            } else {
                footer_no += 1;
                ("ftr", format!("footer{}.xml", footer_no), Relationships::TYPE_FOOTER, CT_FOOTER)
            };
            let path = format!("word/{}", name);
            files.push((
                path.clone(),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:{root}{ns}>{content}</w:{root}>"#
                )
                .into_bytes(),
            ));
            content_types.add_override(&path, content_type);
            main_rels.push((r_id.clone(), rel_type.to_string(), name, None));
        }

        for part in &self.parts {
            files.push((part.path.clone(), part.data.clone()));
            content_types.add_override(&part.path, &part.content_type);
            if let Some((r_id, rel_type)) = &part.relationship {
                main_rels.push((
                    r_id.clone(),
                    rel_type.clone(),
                    relative_target("word/document.xml", &part.path),
                    None,
                ));
            }
        }

        for (r_id, rel_type, target) in &self.external {
            main_rels.push((
                r_id.clone(),
                rel_type.clone(),
                target.clone(),
                Some(TARGET_MODE_EXTERNAL),
            ));
        }

        if let Some(properties) = &self.custom_properties {
            files.push((
                "docProps/custom.xml".to_string(),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Properties xmlns="{}" xmlns:vt="{}">{}</Properties>"#,
                    CP.uri, VT.uri, properties
                )
                .into_bytes(),
            ));
            content_types.add_override("docProps/custom.xml", CT_CUSTOM_PROPERTIES);
            package_rels.add("docProps/custom.xml", Relationships::TYPE_CUSTOM_PROPERTIES);
        }

        files.push((CONTENT_TYPES_PATH.to_string(), content_types.to_xml().into_bytes()));
        files.push((PACKAGE_RELS_PATH.to_string(), package_rels.to_xml().into_bytes()));
        files.push((
            "word/_rels/document.xml.rels".to_string(),
            rels_xml(main_rels.iter().map(|(id, ty, target, mode)| {
                (id.as_str(), ty.as_str(), target.as_str(), *mode)
            }))
            .into_bytes(),
        ));

        let mut by_part: Vec<&str> = self.part_rels.iter().map(|(part, ..)| part.as_str()).collect();
        by_part.dedup();
        for part in by_part {
            let rels = self
                .part_rels
                .iter()
                .filter(|(p, ..)| p == part)
                .map(|(_, id, ty, target)| {
                    let mode = target.contains("://").then_some(TARGET_MODE_EXTERNAL);
                    (id.as_str(), ty.as_str(), target.as_str(), mode)
                });
            files.push((crate::docx::rels_path_for(part), rels_xml(rels).into_bytes()));
        }

        for (path, data) in files {
            zip.start_file(path.as_str(), options).unwrap();
            zip.write_all(&data).unwrap();
        }
        zip.finish().unwrap();
        buffer.into_inner()
    }

    /// Build and open the package
    pub fn document(&self) -> WordDocument {
        WordDocument::from_bytes(&self.build()).unwrap()
    }
}

fn rels_xml<'a>(rels: impl Iterator<Item = (&'a str, &'a str, &'a str, Option<&'a str>)>) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{}">"#,
        crate::namespaces::PR.uri
    );
    for (id, rel_type, target, mode) in rels {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}""#,
            id,
            rel_type,
            target.replace('&', "&amp;")
        ));
        if let Some(mode) = mode {
            xml.push_str(&format!(r#" TargetMode="{}""#, mode));
        }
        xml.push_str("/>");
    }
    xml.push_str("</Relationships>");
    xml
}

/// Any file content from a package byte array
pub fn extract_file(docx: &[u8], path: &str) -> Option<String> {
    let archive = OoxmlArchive::from_bytes(docx).unwrap();
    archive
        .get(path)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}

/// Diagram namespace declaration, for fixtures carrying SmartArt
pub fn diagram_namespace() -> String {
    format!(r#" xmlns:dgm="{}""#, DGM.uri)
}

/// SVG blip namespace declaration
pub fn svg_namespace() -> String {
    format!(r#" xmlns:asvg="{}""#, ASVG.uri)
}
