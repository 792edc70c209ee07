//! `DOCPROPERTY` fields
//!
//! A field comes in two encodings. The simple one is a single
//! `w:fldSimple` element carrying the instruction in `w:instr` and the
//! cached value as child runs. The complex one spreads over runs:
//!
//! ```text
//! <w:r><w:fldChar w:fldCharType="begin"/></w:r>
//! <w:r><w:instrText> DOCPROPERTY "Title" </w:instrText></w:r>
//! <w:r><w:fldChar w:fldCharType="separate"/></w:r>
//! <w:r><w:t>cached value</w:t></w:r>
//! <w:r><w:fldChar w:fldCharType="end"/></w:r>
//! ```
//!
//! The instruction may be split over several runs, the separate marker may
//! be missing, fields may nest and a field may span paragraphs.

use docxcompose_ooxml::namespaces::W;
use docxcompose_ooxml::relationships::Relationships;
use docxcompose_ooxml::{NodeId, WordDocument, XmlDocument};

use crate::error::Result;
use crate::parts::{xml_part, xml_part_mut};
use crate::properties::CustomProperties;

/// Physical encoding of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Simple {
        node: NodeId,
    },
    Complex {
        begin: NodeId,
        /// Runs between begin and separate (or end)
        code_runs: Vec<NodeId>,
        separate: Option<NodeId>,
        /// Runs between separate and end holding the cached value
        result_runs: Vec<NodeId>,
        end: NodeId,
    },
}

/// A `DOCPROPERTY` field found in one part of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPropertyField {
    /// Part holding the field
    pub part: String,
    pub kind: FieldKind,
    /// Referenced property
    pub name: String,
    /// Word date picture given with `\@`
    pub date_format: Option<String>,
}

/// Property name and date format of a `DOCPROPERTY` instruction
///
/// Returns `None` for other field types.
pub fn parse_instruction(instruction: &str) -> Option<(String, Option<String>)> {
    let instruction = instruction.trim();
    let keyword_end = instruction
        .find(char::is_whitespace)
        .unwrap_or(instruction.len());
    if !instruction[..keyword_end].eq_ignore_ascii_case("DOCPROPERTY") {
        return None;
    }
    let rest = instruction[keyword_end..].trim_start();

    let (name, switches) = match rest.strip_prefix('"') {
        Some(quoted) => match quoted.find('"') {
            Some(close) => (&quoted[..close], &quoted[close + 1..]),
            None => (quoted, ""),
        },
        None => match rest.find('\\') {
            Some(switch) => (&rest[..switch], &rest[switch..]),
            None => (rest, ""),
        },
    };
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let date_format = switches.find("\\@").map(|at| {
        let value = switches[at + 2..].trim_start();
        match value.strip_prefix('"') {
            Some(quoted) => quoted.split('"').next().unwrap_or_default().to_string(),
            None => value
                .split(char::is_whitespace)
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    });

    Some((name.to_string(), date_format.filter(|f| !f.is_empty())))
}

/// Parts searched for fields: the main part, then headers and footers
fn field_parts(doc: &WordDocument) -> Vec<String> {
    let main = doc.main_part().to_string();
    let mut parts = vec![main.clone()];
    parts.extend(doc.parts_by_reltype(&main, Relationships::TYPE_HEADER));
    parts.extend(doc.parts_by_reltype(&main, Relationships::TYPE_FOOTER));
    parts
}

/// Every `DOCPROPERTY` field of `doc`, part by part in document order
pub fn find_fields(doc: &WordDocument) -> Result<Vec<DocPropertyField>> {
    let mut fields = Vec::new();
    for part in field_parts(doc) {
        let xml = xml_part(doc, &part)?;
        scan_part(xml, &part, &mut fields);
    }
    Ok(fields)
}

#[derive(Default)]
struct OpenField {
    begin: Option<NodeId>,
    instruction: String,
    code_runs: Vec<NodeId>,
    separate: Option<NodeId>,
    result_runs: Vec<NodeId>,
}

fn field_char_type<'a>(xml: &'a XmlDocument, run: NodeId) -> Option<&'a str> {
    xml.find_child(run, W, "fldChar")
        .and_then(|fld_char| xml.attr(fld_char, W, "fldCharType"))
}

fn scan_part(xml: &XmlDocument, part: &str, fields: &mut Vec<DocPropertyField>) {
    let root = xml.root();

    for node in xml.descendants_named(root, W, "fldSimple") {
        let Some((name, date_format)) = xml.attr(node, W, "instr").and_then(parse_instruction)
        else {
            continue;
        };
        fields.push(DocPropertyField {
            part: part.to_string(),
            kind: FieldKind::Simple { node },
            name,
            date_format,
        });
    }

    let mut open: Vec<OpenField> = Vec::new();
    for run in xml.descendants_named(root, W, "r") {
        match field_char_type(xml, run) {
            Some("begin") => {
                add_to_open(&mut open, run);
                open.push(OpenField {
                    begin: Some(run),
                    ..OpenField::default()
                });
            }
            Some("separate") => {
                let Some((field, enclosing)) = open.split_last_mut() else {
                    continue;
                };
                if field.separate.is_none() {
                    field.separate = Some(run);
                    add_to_open(enclosing, run);
                } else {
                    add_to_open(&mut open, run);
                }
            }
            Some("end") => {
                let Some(field) = open.pop() else {
                    log::debug!("unbalanced field end in {}", part);
                    continue;
                };
                add_to_open(&mut open, run);
                let (Some(begin), Some((name, date_format))) =
                    (field.begin, parse_instruction(&field.instruction))
                else {
                    continue;
                };
                fields.push(DocPropertyField {
                    part: part.to_string(),
                    kind: FieldKind::Complex {
                        begin,
                        code_runs: field.code_runs,
                        separate: field.separate,
                        result_runs: field.result_runs,
                        end: run,
                    },
                    name,
                    date_format,
                });
            }
            _ => {
                if let Some(field) = open.last_mut() {
                    if field.separate.is_none() {
                        for instr in xml.children_named(run, W, "instrText") {
                            field.instruction.push_str(&xml.text(instr));
                        }
                    }
                }
                add_to_open(&mut open, run);
            }
        }
    }
    if !open.is_empty() {
        log::debug!("{} unterminated fields in {}", open.len(), part);
    }
}

/// Record `run` as code or result of every field still open
fn add_to_open(open: &mut [OpenField], run: NodeId) {
    for field in open.iter_mut() {
        match field.separate {
            None => field.code_runs.push(run),
            Some(_) => field.result_runs.push(run),
        }
    }
}

/// Turn the fields of property `name` into plain text, keeping the cached
/// value; returns the number of dissolved fields
pub fn dissolve_fields(doc: &mut WordDocument, name: &str) -> Result<usize> {
    let fields: Vec<DocPropertyField> = find_fields(doc)?
        .into_iter()
        .filter(|field| field.name == name)
        .collect();

    let mut dissolved = 0;
    for field in &fields {
        let xml = xml_part_mut(doc, &field.part)?;
        match &field.kind {
            FieldKind::Simple { node } => {
                if xml.is_removed(*node) {
                    continue;
                }
                for child in xml.children(*node) {
                    xml.detach(child);
                    xml.insert_before(*node, child);
                }
                xml.remove(*node);
            }
            FieldKind::Complex {
                begin,
                code_runs,
                separate,
                end,
                ..
            } => {
                let markers = std::iter::once(begin)
                    .chain(code_runs)
                    .chain(separate)
                    .chain(std::iter::once(end));
                for run in markers {
                    if !xml.is_removed(*run) {
                        xml.remove(*run);
                    }
                }
            }
        }
        dissolved += 1;
    }
    if dissolved > 0 {
        log::debug!("dissolved {} DOCPROPERTY fields of {:?}", dissolved, name);
    }
    Ok(dissolved)
}

/// Write the current value of property `name` into its fields; returns
/// the number of updated fields
pub fn update_fields(doc: &mut WordDocument, props: &CustomProperties, name: &str) -> Result<usize> {
    let Some(value) = props.get(name) else {
        return Ok(0);
    };
    let fields: Vec<DocPropertyField> = find_fields(doc)?
        .into_iter()
        .filter(|field| field.name == name)
        .collect();

    let mut updated = 0;
    for field in &fields {
        let xml = xml_part_mut(doc, &field.part)?;
        let texts: Vec<NodeId> = match &field.kind {
            FieldKind::Simple { node } => xml.descendants_named(*node, W, "t"),
            FieldKind::Complex { result_runs, .. } => result_runs
                .iter()
                .flat_map(|run| xml.descendants_named(*run, W, "t"))
                .collect(),
        };
        let Some((first, surplus)) = texts.split_first() else {
            log::debug!("field {:?} in {} has no cached text", name, field.part);
            continue;
        };
        xml.set_text(*first, value.display(field.date_format.as_deref()));
        for text in surplus {
            xml.remove(*text);
        }
        updated += 1;
    }
    Ok(updated)
}

/// Update the fields of every property of `props`
pub fn update_all(doc: &mut WordDocument, props: &CustomProperties) -> Result<usize> {
    let mut updated = 0;
    for name in props.names() {
        updated += update_fields(doc, props, name)?;
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docxcompose_ooxml::test_utils::DocxBuilder;

    fn complex(instr: &[&str], cached: Option<&str>) -> String {
        let mut xml = String::from(r#"<w:r><w:fldChar w:fldCharType="begin"/></w:r>"#);
        for part in instr {
            xml.push_str(&format!(r#"<w:r><w:instrText xml:space="preserve">{}</w:instrText></w:r>"#, part));
        }
        if let Some(cached) = cached {
            xml.push_str(r#"<w:r><w:fldChar w:fldCharType="separate"/></w:r>"#);
            xml.push_str(&format!("<w:r><w:t>{}</w:t></w:r>", cached));
        }
        xml.push_str(r#"<w:r><w:fldChar w:fldCharType="end"/></w:r>"#);
        xml
    }

    fn simple(instr: &str, cached: &str) -> String {
        format!(r#"<w:fldSimple w:instr="{}"><w:r><w:t>{}</w:t></w:r></w:fldSimple>"#, instr, cached)
    }

    fn body_text(doc: &WordDocument) -> String {
        let xml = doc.document();
        xml.text(doc.body().unwrap())
    }

    #[test]
    fn test_parse_instruction() {
        assert_eq!(
            parse_instruction(r#" DOCPROPERTY "Client Name" \* MERGEFORMAT "#),
            Some(("Client Name".to_string(), None))
        );
        assert_eq!(
            parse_instruction(r#"DOCPROPERTY Client Name \* MERGEFORMAT"#),
            Some(("Client Name".to_string(), None))
        );
        assert_eq!(
            parse_instruction(r#"docproperty "Due" \@ "dd.MM.yyyy" \* MERGEFORMAT"#),
            Some(("Due".to_string(), Some("dd.MM.yyyy".to_string())))
        );
        assert_eq!(
            parse_instruction(r#"DOCPROPERTY Due \@ yyyy"#),
            Some(("Due".to_string(), Some("yyyy".to_string())))
        );
        assert_eq!(parse_instruction("PAGE"), None);
        assert_eq!(parse_instruction("DOCPROPERTY"), None);
        assert_eq!(parse_instruction("DOCPROPERTYX Title"), None);
    }

    #[test]
    fn test_find_fields_in_body_headers_and_footers() {
        let doc = DocxBuilder::new()
            .body(&format!(
                "<w:p>{}</w:p><w:p>{}</w:p>",
                simple(r#" DOCPROPERTY "Title" "#, "T"),
                complex(&[" DOCPROPERTY ", "\"Client\" "], Some("C"))
            ))
            .header("rId10", &format!("<w:p>{}</w:p>", complex(&[" DOCPROPERTY Title "], Some("T"))))
            .footer("rId11", &format!("<w:p>{}</w:p>", simple(" PAGE ", "1")))
            .document();

        let fields = find_fields(&doc).unwrap();
        let found: Vec<(&str, &str)> = fields.iter().map(|f| (f.part.as_str(), f.name.as_str())).collect();
        assert_eq!(
            found,
            vec![
                ("word/document.xml", "Title"),
                ("word/document.xml", "Client"),
                ("word/header1.xml", "Title"),
            ]
        );
        assert!(matches!(fields[1].kind, FieldKind::Complex { separate: Some(_), ref code_runs, .. } if code_runs.len() == 2));
    }

    #[test]
    fn test_nested_field_in_result() {
        let nested = complex(&[" PAGE "], Some("3"));
        let doc = DocxBuilder::new()
            .body(&format!(
                r#"<w:p><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText> DOCPROPERTY Title </w:instrText></w:r><w:r><w:fldChar w:fldCharType="separate"/></w:r>{}<w:r><w:fldChar w:fldCharType="end"/></w:r></w:p>"#,
                nested
            ))
            .document();
        let fields = find_fields(&doc).unwrap();
        assert_eq!(fields.len(), 1);
        match &fields[0].kind {
            FieldKind::Complex { result_runs, .. } => assert_eq!(result_runs.len(), 5),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dissolve_simple_field_keeps_cached_run() {
        let mut doc = DocxBuilder::new()
            .body(&format!(
                "<w:p><w:r><w:t>Dear </w:t></w:r>{}<w:r><w:t>!</w:t></w:r></w:p>",
                simple(r#" DOCPROPERTY "Client" "#, "ACME")
            ))
            .document();

        assert_eq!(dissolve_fields(&mut doc, "Client").unwrap(), 1);
        let xml = doc.document();
        assert!(xml.find_descendant(xml.root(), W, "fldSimple").is_none());
        let paragraph = xml.child_elements(doc.body().unwrap())[0];
        assert_eq!(xml.children_named(paragraph, W, "r").len(), 3);
        assert_eq!(body_text(&doc), "Dear ACME!");
    }

    #[test]
    fn test_dissolve_complex_field_keeps_result_runs() {
        let mut doc = DocxBuilder::new()
            .body(&format!("<w:p>{}</w:p>", complex(&[" DOCPROPERTY ", "Client "], Some("ACME"))))
            .document();

        assert_eq!(dissolve_fields(&mut doc, "Client").unwrap(), 1);
        let xml = doc.document();
        assert!(xml.find_descendant(xml.root(), W, "fldChar").is_none());
        assert!(xml.find_descendant(xml.root(), W, "instrText").is_none());
        assert_eq!(body_text(&doc), "ACME");
    }

    #[test]
    fn test_dissolve_complex_field_without_separate() {
        let mut doc = DocxBuilder::new()
            .body(&format!(
                "<w:p><w:r><w:t>x</w:t></w:r>{}</w:p>",
                complex(&[" DOCPROPERTY Client "], None)
            ))
            .document();

        assert_eq!(dissolve_fields(&mut doc, "Client").unwrap(), 1);
        let xml = doc.document();
        let paragraph = xml.child_elements(doc.body().unwrap())[0];
        assert_eq!(xml.child_elements(paragraph).len(), 1);
        assert_eq!(body_text(&doc), "x");
    }

    #[test]
    fn test_dissolve_leaves_other_properties() {
        let mut doc = DocxBuilder::new()
            .body(&format!(
                "<w:p>{}{}</w:p>",
                simple(" DOCPROPERTY Client ", "ACME"),
                simple(" DOCPROPERTY Title ", "Report")
            ))
            .header("rId10", &format!("<w:p>{}</w:p>", simple(" DOCPROPERTY Client ", "ACME")))
            .document();

        assert_eq!(dissolve_fields(&mut doc, "Client").unwrap(), 2);
        let remaining = find_fields(&doc).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "Title");
    }

    #[test]
    fn test_update_fields() {
        let mut doc = DocxBuilder::new()
            .body(&format!(
                r#"<w:p>{}</w:p><w:p><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText> DOCPROPERTY Due \@ "yyyy-MM-dd" </w:instrText></w:r><w:r><w:fldChar w:fldCharType="separate"/></w:r><w:r><w:t>old</w:t></w:r><w:r><w:t>er</w:t></w:r><w:r><w:fldChar w:fldCharType="end"/></w:r></w:p><w:p>{}</w:p>"#,
                simple(" DOCPROPERTY Approved ", "?"),
                simple(" DOCPROPERTY Missing ", "keep")
            ))
            .custom_properties(
                r#"<property fmtid="{D5CDD505-2E9C-101B-9397-08002B2CF9AE}" pid="2" name="Approved"><vt:bool>false</vt:bool></property>
                   <property fmtid="{D5CDD505-2E9C-101B-9397-08002B2CF9AE}" pid="3" name="Due"><vt:filetime>2022-11-30T00:00:00Z</vt:filetime></property>"#,
            )
            .document();
        let props = CustomProperties::from_document(&doc).unwrap();

        assert_eq!(update_all(&mut doc, &props).unwrap(), 2);
        assert_eq!(body_text(&doc), "N2022-11-30keep");
        assert_eq!(update_fields(&mut doc, &props, "Missing").unwrap(), 0);
    }
}
