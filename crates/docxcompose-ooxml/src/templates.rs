//! Empty part templates
//!
//! Used when composition needs a part the target document lacks. The
//! templates ship inside the binary, so a template that fails to parse is a
//! packaging defect and surfaces as [`OoxmlError::Template`].

use crate::content_types::{
    CT_CUSTOM_PROPERTIES, CT_FOOTER, CT_FOOTNOTES, CT_HEADER, CT_NUMBERING,
};
use crate::error::{OoxmlError, Result};
use crate::relationships::Relationships;
use crate::xml::XmlDocument;

const NUMBERING: &[u8] = include_bytes!("../templates/numbering.xml");
const FOOTNOTES: &[u8] = include_bytes!("../templates/footnotes.xml");
const CUSTOM_PROPERTIES: &[u8] = include_bytes!("../templates/custom.xml");
const HEADER: &[u8] = include_bytes!("../templates/header.xml");
const FOOTER: &[u8] = include_bytes!("../templates/footer.xml");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartTemplate {
    Numbering,
    /// Holds the separator (-1) and continuation separator (0) entries
    Footnotes,
    CustomProperties,
    Header,
    Footer,
}

impl PartTemplate {
    pub fn name(self) -> &'static str {
        match self {
            PartTemplate::Numbering => "numbering.xml",
            PartTemplate::Footnotes => "footnotes.xml",
            PartTemplate::CustomProperties => "custom.xml",
            PartTemplate::Header => "header.xml",
            PartTemplate::Footer => "footer.xml",
        }
    }

    pub fn bytes(self) -> &'static [u8] {
        match self {
            PartTemplate::Numbering => NUMBERING,
            PartTemplate::Footnotes => FOOTNOTES,
            PartTemplate::CustomProperties => CUSTOM_PROPERTIES,
            PartTemplate::Header => HEADER,
            PartTemplate::Footer => FOOTER,
        }
    }

    /// Part name pattern; `%d` is replaced by the lowest free number when
    /// the part cannot have its plain name
    pub fn partname_template(self) -> &'static str {
        match self {
            PartTemplate::Numbering => "word/numbering%d.xml",
            PartTemplate::Footnotes => "word/footnotes%d.xml",
            PartTemplate::CustomProperties => "docProps/custom%d.xml",
            PartTemplate::Header => "word/header%d.xml",
            PartTemplate::Footer => "word/footer%d.xml",
        }
    }

    /// A document holds at most one part of this kind
    pub fn is_singleton(self) -> bool {
        !matches!(self, PartTemplate::Header | PartTemplate::Footer)
    }

    /// Related from the package rather than from the main document part
    pub fn is_package_level(self) -> bool {
        self == PartTemplate::CustomProperties
    }

    pub fn content_type(self) -> &'static str {
        match self {
            PartTemplate::Numbering => CT_NUMBERING,
            PartTemplate::Footnotes => CT_FOOTNOTES,
            PartTemplate::CustomProperties => CT_CUSTOM_PROPERTIES,
            PartTemplate::Header => CT_HEADER,
            PartTemplate::Footer => CT_FOOTER,
        }
    }

    pub fn rel_type(self) -> &'static str {
        match self {
            PartTemplate::Numbering => Relationships::TYPE_NUMBERING,
            PartTemplate::Footnotes => Relationships::TYPE_FOOTNOTES,
            PartTemplate::CustomProperties => Relationships::TYPE_CUSTOM_PROPERTIES,
            PartTemplate::Header => Relationships::TYPE_HEADER,
            PartTemplate::Footer => Relationships::TYPE_FOOTER,
        }
    }

    pub fn parse(self) -> Result<XmlDocument> {
        XmlDocument::parse(self.bytes()).map_err(|_| OoxmlError::Template(self.name()))
    }
}
