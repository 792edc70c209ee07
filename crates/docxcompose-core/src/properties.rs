//! Custom document properties (`docProps/custom.xml`)
//!
//! Properties are read into an owned [`CustomProperties`] value, edited
//! there and written back with [`CustomProperties::save_to`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use docxcompose_ooxml::namespaces::{CP, VT};
use docxcompose_ooxml::relationships::Relationships;
use docxcompose_ooxml::{NodeId, PartTemplate, WordDocument, XmlDocument};

use crate::error::{ComposeError, Result};
use crate::parts::xml_part_mut;

/// Format id Word uses for user defined properties
pub const FMTID_USER_DEFINED: &str = "{D5CDD505-2E9C-101B-9397-08002B2CF9AE}";

/// First `pid` available to custom properties
const FIRST_PID: u32 = 2;

/// Date format used when a field does not specify one
pub const DEFAULT_DATE_FORMAT: &str = "%d.%m.%Y";

/// A typed property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(DateTime<Utc>),
}

impl PropertyValue {
    /// Parse a `vt:*` value element
    fn parse(doc: &XmlDocument, value: NodeId) -> Result<Self> {
        let text = doc.text(value);
        let local = doc
            .name(value)
            .map(|name| name.local.clone())
            .unwrap_or_default();
        let invalid = || ComposeError::InvalidProperty(format!("vt:{} value {:?}", local, text));

        Ok(match local.as_str() {
            "i1" | "i2" | "i4" | "i8" | "int" | "ui1" | "ui2" | "ui4" | "ui8" | "uint" => {
                PropertyValue::Int(text.trim().parse().map_err(|_| invalid())?)
            }
            "r4" | "r8" | "decimal" => PropertyValue::Float(text.trim().parse().map_err(|_| invalid())?),
            "bool" => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => PropertyValue::Bool(true),
                "false" | "0" => PropertyValue::Bool(false),
                _ => return Err(invalid()),
            },
            "filetime" | "date" => PropertyValue::DateTime(parse_w3cdtf(&text).ok_or_else(invalid)?),
            _ => PropertyValue::Text(text),
        })
    }

    /// `vt` element name used when writing
    fn vt_name(&self) -> &'static str {
        match self {
            PropertyValue::Text(_) => "lpwstr",
            PropertyValue::Int(_) => "i4",
            PropertyValue::Float(_) => "r8",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::DateTime(_) => "filetime",
        }
    }

    /// Value as stored in the properties part
    fn to_vt_text(&self) -> String {
        match self {
            PropertyValue::Text(text) => text.clone(),
            PropertyValue::Int(value) => value.to_string(),
            PropertyValue::Float(value) => value.to_string(),
            PropertyValue::Bool(value) => value.to_string(),
            PropertyValue::DateTime(value) => value.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }

    /// Value as a field displays it; dates follow `date_format`, a Word
    /// date picture such as `dd.MM.yyyy`
    pub fn display(&self, date_format: Option<&str>) -> String {
        match self {
            PropertyValue::Text(text) => text.clone(),
            PropertyValue::Int(value) => value.to_string(),
            PropertyValue::Float(value) => value.to_string(),
            PropertyValue::Bool(true) => "Y".to_string(),
            PropertyValue::Bool(false) => "N".to_string(),
            PropertyValue::DateTime(value) => {
                let format = date_format
                    .map(word_date_format)
                    .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
                value.format(&format).to_string()
            }
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropertyValue::DateTime(value)
    }
}

/// Parse a W3CDTF timestamp: full date and time with zone, or its
/// shorter forms
fn parse_w3cdtf(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(value) = DateTime::parse_from_rfc3339(text) {
        return Some(value.with_timezone(&Utc));
    }
    let naive = text.trim_end_matches('Z');
    if let Ok(value) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S") {
        return Some(value.and_utc());
    }
    if let Ok(value) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M") {
        return Some(value.and_utc());
    }
    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|value| value.and_utc())
}

/// Translate a Word date picture (`\@ "dd.MM.yyyy"`) to a chrono format
pub fn word_date_format(picture: &str) -> String {
    let chars: Vec<char> = picture.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            // quoted literal
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }
        if picture[char_offset(&chars, i)..].starts_with("AM/PM") {
            out.push_str("%p");
            i += 5;
            continue;
        }
        if picture[char_offset(&chars, i)..].starts_with("am/pm") {
            out.push_str("%P");
            i += 5;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&other| other == c).count();
        let token = match (c, run) {
            ('y', 1..=2) => Some("%y"),
            ('y', _) => Some("%Y"),
            ('M', 1) => Some("%-m"),
            ('M', 2) => Some("%m"),
            ('M', 3) => Some("%b"),
            ('M', _) => Some("%B"),
            ('d', 1) => Some("%-d"),
            ('d', 2) => Some("%d"),
            ('d', 3) => Some("%a"),
            ('d', _) => Some("%A"),
            ('H', 1) => Some("%-H"),
            ('H', _) => Some("%H"),
            ('h', 1) => Some("%-I"),
            ('h', _) => Some("%I"),
            ('m', 1) => Some("%-M"),
            ('m', _) => Some("%M"),
            ('s', 1) => Some("%-S"),
            ('s', _) => Some("%S"),
            _ => None,
        };
        match token {
            Some(token) => {
                out.push_str(token);
                i += run;
            }
            None => {
                push_literal(&mut out, c);
                i += 1;
            }
        }
    }
    out
}

fn char_offset(chars: &[char], index: usize) -> usize {
    chars[..index].iter().map(|c| c.len_utf8()).sum()
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

/// One named property
#[derive(Debug, Clone, PartialEq)]
pub struct CustomProperty {
    pub name: String,
    pub value: PropertyValue,
    pub pid: u32,
}

/// The custom properties of a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomProperties {
    properties: Vec<CustomProperty>,
}

impl CustomProperties {
    /// Read the properties of `doc`; empty when it has no custom
    /// properties part
    pub fn from_document(doc: &WordDocument) -> Result<Self> {
        match doc
            .package_part_by_reltype(Relationships::TYPE_CUSTOM_PROPERTIES)
            .and_then(|path| doc.xml_part(&path))
        {
            Some(part) => Self::parse(part),
            None => Ok(Self::default()),
        }
    }

    /// Names of the properties of `doc`, without looking at their values
    ///
    /// Unlike [`CustomProperties::from_document`] this never fails on a
    /// malformed value.
    pub fn names_from_document(doc: &WordDocument) -> Vec<String> {
        let Some(part) = doc
            .package_part_by_reltype(Relationships::TYPE_CUSTOM_PROPERTIES)
            .and_then(|path| doc.xml_part(&path))
        else {
            return Vec::new();
        };
        part.children_named(part.root(), CP, "property")
            .into_iter()
            .filter_map(|node| part.plain_attr(node, "name"))
            .map(str::to_string)
            .collect()
    }

    pub fn parse(part: &XmlDocument) -> Result<Self> {
        let mut properties = Vec::new();
        for (index, node) in part
            .children_named(part.root(), CP, "property")
            .into_iter()
            .enumerate()
        {
            let Some(name) = part.plain_attr(node, "name") else {
                continue;
            };
            let Some(value) = part.child_elements(node).into_iter().next() else {
                continue;
            };
            let pid = part
                .plain_attr(node, "pid")
                .and_then(|pid| pid.parse().ok())
                .unwrap_or(FIRST_PID + index as u32);
            properties.push(CustomProperty {
                name: name.to_string(),
                value: PropertyValue::parse(part, value)?,
                pid,
            });
        }
        Ok(Self { properties })
    }

    pub fn names(&self) -> Vec<&str> {
        self.properties.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CustomProperty> {
        self.properties.iter()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Change a property's value, adding the property if it is new
    pub fn set(&mut self, name: &str, value: impl Into<PropertyValue>) {
        let value = value.into();
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.push(name, value),
        }
    }

    /// Add a new property; fails if the name is taken
    pub fn add(&mut self, name: &str, value: impl Into<PropertyValue>) -> Result<()> {
        if self.get(name).is_some() {
            return Err(ComposeError::InvalidProperty(format!(
                "property {:?} already exists",
                name
            )));
        }
        self.push(name, value.into());
        Ok(())
    }

    /// Remove a property; returns whether it existed
    pub fn delete(&mut self, name: &str) -> bool {
        let before = self.properties.len();
        self.properties.retain(|p| p.name != name);
        self.properties.len() != before
    }

    fn push(&mut self, name: &str, value: PropertyValue) {
        let pid = self
            .properties
            .iter()
            .map(|p| p.pid + 1)
            .max()
            .unwrap_or(FIRST_PID)
            .max(FIRST_PID);
        self.properties.push(CustomProperty {
            name: name.to_string(),
            value,
            pid,
        });
    }

    /// Write the properties into `doc`, creating the part if needed
    pub fn save_to(&self, doc: &mut WordDocument) -> Result<()> {
        let path = doc.ensure_part(PartTemplate::CustomProperties)?;
        let part = xml_part_mut(doc, &path)?;
        let root = part.root();
        for child in part.children(root) {
            part.remove(child);
        }
        for property in &self.properties {
            let node = part.create_element(CP, "property");
            part.set_plain_attr(node, "fmtid", FMTID_USER_DEFINED);
            part.set_plain_attr(node, "pid", property.pid.to_string());
            part.set_plain_attr(node, "name", property.name.clone());
            let value = part.create_element(VT, property.value.vt_name());
            let text = part.create_text(property.value.to_vt_text());
            part.append(value, text);
            part.append(node, value);
            part.append(root, node);
        }
        log::debug!("wrote {} custom properties to {}", self.properties.len(), path);
        Ok(())
    }
}
