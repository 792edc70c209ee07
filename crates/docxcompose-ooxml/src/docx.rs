//! Word package model
//!
//! [`WordDocument`] ties the raw archive to the structures composition
//! edits: the content type registry, one relationship collection per part,
//! and parsed trees for the main document, every XML part related from it
//! and the custom properties part. Parts are addressed by their path inside
//! the package without a leading slash (`word/styles.xml`); package-level
//! relationships live under the empty part name [`PACKAGE`].
//!
//! Only what changed is serialized again on save: the main document, XML
//! parts obtained through [`WordDocument::xml_part_mut`] or added, touched
//! relationship collections and the content type registry.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use indextree::NodeId;

use crate::archive::OoxmlArchive;
use crate::content_types::{extension, ContentTypes, CONTENT_TYPES_PATH};
use crate::error::{OoxmlError, Result};
use crate::image::{content_hash, is_image_content_type, MEDIA_DIR};
use crate::namespaces::W;
use crate::relationships::Relationships;
use crate::templates::PartTemplate;
use crate::xml::XmlDocument;

/// Part name standing for the package itself as a relationship source
pub const PACKAGE: &str = "";

pub const PACKAGE_RELS_PATH: &str = "_rels/.rels";

#[derive(Debug)]
pub struct WordDocument {
    archive: OoxmlArchive,
    content_types: ContentTypes,
    main_part: String,
    document: XmlDocument,
    parts: BTreeMap<String, XmlDocument>,
    relationships: BTreeMap<String, Relationships>,
    dirty_parts: BTreeSet<String>,
    dirty_rels: BTreeSet<String>,
    content_types_dirty: bool,
}

impl WordDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_archive(OoxmlArchive::open(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_archive(OoxmlArchive::from_bytes(bytes)?)
    }

    pub fn from_archive(archive: OoxmlArchive) -> Result<Self> {
        let content_types = ContentTypes::parse(
            archive
                .get(CONTENT_TYPES_PATH)
                .ok_or_else(|| OoxmlError::MissingFile(CONTENT_TYPES_PATH.to_string()))?,
        )?;

        let rels_paths: Vec<String> = archive
            .file_list()
            .filter(|path| path.ends_with(".rels"))
            .map(str::to_string)
            .collect();
        let mut relationships = BTreeMap::new();
        for path in rels_paths {
            if let (Some(source), Some(data)) = (source_part_for_rels(&path), archive.get(&path)) {
                relationships.insert(source, Relationships::parse(data)?);
            }
        }

        let package_rels = relationships
            .get(PACKAGE)
            .ok_or_else(|| OoxmlError::MissingFile(PACKAGE_RELS_PATH.to_string()))?;
        let main_part = package_rels
            .find_by_type(Relationships::TYPE_OFFICE_DOCUMENT)
            .map(|(_, rel)| resolve_target(PACKAGE, &rel.target))
            .ok_or_else(|| {
                OoxmlError::InvalidStructure("package has no main document relationship".into())
            })?;
        let custom_properties = package_rels
            .find_by_type(Relationships::TYPE_CUSTOM_PROPERTIES)
            .map(|(_, rel)| resolve_target(PACKAGE, &rel.target));

        let document = XmlDocument::parse(
            archive
                .get(&main_part)
                .ok_or_else(|| OoxmlError::MissingFile(main_part.clone()))?,
        )?;

        let mut xml_paths: Vec<String> = relationships
            .get(&main_part)
            .map(|rels| {
                rels.iter()
                    .filter(|(_, rel)| !rel.is_external())
                    .map(|(_, rel)| resolve_target(&main_part, &rel.target))
                    .filter(|path| path.ends_with(".xml"))
                    .collect()
            })
            .unwrap_or_default();
        xml_paths.extend(custom_properties);

        let mut parts = BTreeMap::new();
        for path in xml_paths {
            if parts.contains_key(&path) {
                continue;
            }
            if let Some(data) = archive.get(&path) {
                parts.insert(path, XmlDocument::parse(data)?);
            } else {
                log::warn!("{} is related from the document but not in the package", path);
            }
        }

        log::debug!(
            "opened package: main part {}, {} xml parts, {} relationship sets",
            main_part,
            parts.len(),
            relationships.len()
        );

        Ok(Self {
            archive,
            content_types,
            main_part,
            document,
            parts,
            relationships,
            dirty_parts: BTreeSet::new(),
            dirty_rels: BTreeSet::new(),
            content_types_dirty: false,
        })
    }

    // ---------------------------------------------------------------------
    // Main document
    // ---------------------------------------------------------------------

    /// Path of the main document part, normally `word/document.xml`
    pub fn main_part(&self) -> &str {
        &self.main_part
    }

    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut XmlDocument {
        &mut self.document
    }

    /// The `w:body` element of the main document
    pub fn body(&self) -> Result<NodeId> {
        self.document
            .find_child(self.document.root(), W, "body")
            .ok_or_else(|| OoxmlError::InvalidStructure("document has no w:body".into()))
    }

    // ---------------------------------------------------------------------
    // Parts
    // ---------------------------------------------------------------------

    /// Parsed XML part, the main document included
    pub fn xml_part(&self, path: &str) -> Option<&XmlDocument> {
        if path == self.main_part {
            Some(&self.document)
        } else {
            self.parts.get(path)
        }
    }

    /// Mutable XML part; the part is written back on save
    pub fn xml_part_mut(&mut self, path: &str) -> Option<&mut XmlDocument> {
        if path == self.main_part {
            return Some(&mut self.document);
        }
        let part = self.parts.get_mut(path)?;
        self.dirty_parts.insert(path.to_string());
        Some(part)
    }

    /// Paths of every parsed XML part besides the main document
    pub fn xml_part_paths(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(|path| path.as_str())
    }

    pub fn has_part(&self, path: &str) -> bool {
        path == self.main_part || self.parts.contains_key(path) || self.archive.contains(path)
    }

    /// Raw bytes of a part as stored in the package
    pub fn binary_part(&self, path: &str) -> Option<&[u8]> {
        self.archive.get(path)
    }

    /// Current bytes of a part, serializing it first if it was edited
    pub fn part_data(&self, path: &str) -> Result<Option<Vec<u8>>> {
        if path == self.main_part {
            return self.document.to_bytes().map(Some);
        }
        if self.dirty_parts.contains(path) {
            if let Some(part) = self.parts.get(path) {
                return part.to_bytes().map(Some);
            }
        }
        Ok(self.archive.get(path).map(<[u8]>::to_vec))
    }

    pub fn content_type(&self, path: &str) -> Option<&str> {
        self.content_types.content_type_for(path)
    }

    /// Add a parsed XML part with a content type override
    pub fn add_xml_part(&mut self, path: &str, content_type: &str, part: XmlDocument) {
        self.parts.insert(path.to_string(), part);
        self.dirty_parts.insert(path.to_string());
        self.content_types.add_override(path, content_type);
        self.content_types_dirty = true;
    }

    /// Add a binary part, registering its content type
    pub fn add_binary_part(&mut self, path: &str, content_type: &str, data: Vec<u8>) {
        self.archive.set(path, data);
        self.content_types.register(path, content_type);
        self.content_types_dirty = true;
    }

    /// Lowest-numbered free part name for a pattern containing `%d`,
    /// counting from 1
    pub fn next_free_partname(&self, template: &str) -> String {
        (1..)
            .map(|n| template.replace("%d", &n.to_string()))
            .find(|candidate| !self.has_part(candidate))
            .unwrap_or_else(|| template.replace("%d", "0"))
    }

    /// The part for `template`, created and related when absent
    pub fn ensure_part(&mut self, template: PartTemplate) -> Result<String> {
        let source = self.template_source(template);
        if let Some(existing) = self.part_by_reltype(&source, template.rel_type()) {
            if self.xml_part(&existing).is_some() {
                return Ok(existing);
            }
            if let Some(data) = self.archive.get(&existing) {
                let part = XmlDocument::parse(data)?;
                self.parts.insert(existing.clone(), part);
                return Ok(existing);
            }
            log::warn!("{} is related but missing, creating it from a template", existing);
        }
        self.add_template_part(template)
    }

    /// Create a new part from `template` and relate it; returns the path
    pub fn add_template_part(&mut self, template: PartTemplate) -> Result<String> {
        let part = template.parse()?;
        let plain = template.partname_template().replace("%d", "");
        let path = if template.is_singleton() && !self.has_part(&plain) {
            plain
        } else {
            self.next_free_partname(template.partname_template())
        };

        let source = self.template_source(template);
        self.add_xml_part(&path, template.content_type(), part);
        self.relate(&source, &path, template.rel_type());
        log::debug!("created {} from template {}", path, template.name());
        Ok(path)
    }

    fn template_source(&self, template: PartTemplate) -> String {
        if template.is_package_level() {
            PACKAGE.to_string()
        } else {
            self.main_part.clone()
        }
    }

    // ---------------------------------------------------------------------
    // Relationships
    // ---------------------------------------------------------------------

    pub fn relationships(&self, part: &str) -> Option<&Relationships> {
        self.relationships.get(part)
    }

    /// Relationship collection of `part`, created empty if needed; it is
    /// written back on save
    pub fn relationships_mut(&mut self, part: &str) -> &mut Relationships {
        self.dirty_rels.insert(part.to_string());
        self.relationships.entry(part.to_string()).or_default()
    }

    /// Path of the first internal part related from `part` with `rel_type`
    pub fn part_by_reltype(&self, part: &str, rel_type: &str) -> Option<String> {
        self.relationships(part)?
            .find_by_type(rel_type)
            .map(|(_, rel)| resolve_target(part, &rel.target))
    }

    pub fn package_part_by_reltype(&self, rel_type: &str) -> Option<String> {
        self.part_by_reltype(PACKAGE, rel_type)
    }

    /// Paths of every internal part related from `part` with `rel_type`
    pub fn parts_by_reltype(&self, part: &str, rel_type: &str) -> Vec<String> {
        self.relationships(part)
            .map(|rels| {
                rels.all_by_type(rel_type)
                    .filter(|(_, rel)| !rel.is_external())
                    .map(|(_, rel)| resolve_target(part, &rel.target))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Part path a relationship of `part` points at; `None` for unknown or
    /// external relationships
    pub fn target_path(&self, part: &str, r_id: &str) -> Option<String> {
        let rel = self.relationships(part)?.get_target(r_id)?;
        if rel.is_external() {
            None
        } else {
            Some(resolve_target(part, &rel.target))
        }
    }

    /// Add a relationship from `source_part` to the part at `target_path`
    pub fn relate(&mut self, source_part: &str, target_path: &str, rel_type: &str) -> String {
        let target = relative_target(source_part, target_path);
        self.relationships_mut(source_part).add(target, rel_type)
    }

    // ---------------------------------------------------------------------
    // Images
    // ---------------------------------------------------------------------

    /// Paths of all image parts, sorted
    pub fn image_parts(&self) -> Vec<String> {
        let mut images: Vec<String> = self
            .archive
            .file_list()
            .filter(|path| {
                self.content_type(path)
                    .is_some_and(is_image_content_type)
            })
            .map(str::to_string)
            .collect();
        images.sort();
        images
    }

    /// Image part whose bytes have the given SHA-256 digest
    pub fn find_image_by_hash(&self, hash: &str) -> Option<String> {
        self.image_parts().into_iter().find(|path| {
            self.archive
                .get(path)
                .is_some_and(|data| content_hash(data) == hash)
        })
    }

    /// Store a new image as `word/media/imageN.<ext>`, N being the lowest
    /// number no image part uses whatever its extension; returns its path
    pub fn add_image_part(&mut self, data: Vec<u8>, ext: &str, content_type: &str) -> String {
        let used: BTreeSet<u32> = self
            .archive
            .files_under(MEDIA_DIR)
            .filter_map(image_number)
            .collect();
        let number = (1..).find(|n| !used.contains(n)).unwrap_or(1);
        let path = format!("{}image{}.{}", MEDIA_DIR, number, ext);
        self.add_binary_part(&path, content_type, data);
        path
    }

    // ---------------------------------------------------------------------
    // Saving
    // ---------------------------------------------------------------------

    /// The package with every edit applied
    pub fn to_archive(&self) -> Result<OoxmlArchive> {
        let mut archive = self.archive.clone();
        archive.set(self.main_part.clone(), self.document.to_bytes()?);
        for path in &self.dirty_parts {
            if let Some(part) = self.parts.get(path) {
                archive.set(path.clone(), part.to_bytes()?);
            }
        }
        for part in &self.dirty_rels {
            if let Some(rels) = self.relationships.get(part) {
                archive.set_string(rels_path_for(part), rels.to_xml());
            }
        }
        if self.content_types_dirty {
            archive.set_string(CONTENT_TYPES_PATH, self.content_types.to_xml());
        }
        Ok(archive)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_archive()?.to_bytes()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_archive()?.write_to_file(path)
    }
}

/// Path of a relationship target given relative to `source_part`
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize(absolute);
    }
    match source_part.rsplit_once('/') {
        Some((dir, _)) => normalize(&format!("{}/{}", dir, target)),
        None => normalize(target),
    }
}

/// Relationship target for `target_path` as seen from `source_part`
pub fn relative_target(source_part: &str, target_path: &str) -> String {
    let base: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let target: Vec<&str> = target_path.split('/').collect();
    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count()
        .min(target.len().saturating_sub(1));

    let mut segments: Vec<&str> = vec![".."; base.len() - common];
    segments.extend_from_slice(&target[common..]);
    segments.join("/")
}

/// `.rels` path holding the relationships of `part`
pub fn rels_path_for(part: &str) -> String {
    if part == PACKAGE {
        return PACKAGE_RELS_PATH.to_string();
    }
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Source part of a `.rels` path
fn source_part_for_rels(path: &str) -> Option<String> {
    if path == PACKAGE_RELS_PATH {
        return Some(PACKAGE.to_string());
    }
    let name = path.strip_suffix(".rels")?;
    let (dir, file) = name.rsplit_once('/')?;
    let base = dir.strip_suffix("_rels")?;
    if !(base.is_empty() || base.ends_with('/')) {
        return None;
    }
    Some(format!("{}{}", base, file))
}

fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// N of `word/media/imageN.<ext>`
fn image_number(path: &str) -> Option<u32> {
    let name = path.strip_prefix(MEDIA_DIR)?.strip_prefix("image")?;
    let (number, _) = name.split_once('.')?;
    number.parse().ok()
}

/// Extension of a part path, lowercased; `bin` when it has none
pub fn part_extension(path: &str) -> String {
    extension(path)
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".to_string())
}
