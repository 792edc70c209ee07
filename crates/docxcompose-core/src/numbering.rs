//! Numbering remapping
//!
//! List numbering is a two-level indirection: paragraphs carry a `numId`
//! naming a `w:num` instance, which points at a `w:abstractNum` holding the
//! level formats. Inserted content keeps its source `numId` values until
//! [`add_numberings`] clones the referenced pair into the target under
//! fresh identifiers and rewrites the references.
//!
//! Cloned abstract definitions get a new `w:nsid`. Word treats instances
//! whose abstract definitions share an nsid as one continuing list, so a
//! copied nsid would make inserted lists continue the source's own lists.

use docxcompose_ooxml::namespaces::W;
use docxcompose_ooxml::relationships::Relationships;
use docxcompose_ooxml::{NodeId, PartTemplate, WordDocument, XmlDocument};

use crate::context::{CompositionContext, NumberingAllocator};
use crate::error::Result;
use crate::parts::{child_with_id, parse_id, xml_part, xml_part_mut};
use crate::styles::find_style;

/// Why a referenced numbering could not be brought over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The source document has no numbering part
    NoSourceNumbering,
    /// No `w:num` with this id in the source numbering part
    UnknownNum,
    /// The `w:num` points at an abstract definition that does not exist
    UnknownAbstractNum,
}

/// What happened to one distinct `numId` found in inserted content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberingOutcome {
    /// A new `w:num` was added; the abstract definition was either cloned
    /// or, when `abstract_reused`, shared with an earlier mapping
    Remapped {
        source: u32,
        target: u32,
        abstract_num_id: u32,
        abstract_reused: bool,
    },
    /// Already mapped earlier in this composition call
    Reused { source: u32, target: u32 },
    /// Left dangling; the reference passes through unchanged
    Skipped { num_id: u32, reason: SkipReason },
}

/// Why the restart policy left a block alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartSkip {
    NoStyle,
    AlreadyRestarted,
    UnknownStyle,
    /// Styles with an outline level are headings
    Heading,
    NoNumbering,
    UnknownNum,
    Bullet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    Restarted { style_id: String, num_id: u32 },
    NotApplied(RestartSkip),
}

/// Where the abstract definition of a remapped `numId` comes from
enum AbstractSource {
    /// Already copied earlier in this call
    Mapped(u32),
    /// Still to be cloned from the source
    Clone(NodeId),
}

/// `pPr` children that precede `numPr`
const NUM_PR_PREDECESSORS: [&str; 6] = [
    "pStyle",
    "keepNext",
    "keepLines",
    "pageBreakBefore",
    "framePr",
    "widowControl",
];

/// Distinct `numId` values under `element`, in document order
pub fn referenced_num_ids(doc: &XmlDocument, element: NodeId) -> Vec<u32> {
    let mut ids = Vec::new();
    for node in doc.descendants_named(element, W, "numId") {
        if let Some(id) = parse_id(doc.w_val(node)) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// Next free identifiers of a numbering part
pub fn scan_allocator(numbering: &XmlDocument) -> NumberingAllocator {
    let root = numbering.root();
    let max_of = |local: &str, attr: &str| {
        numbering
            .children_named(root, W, local)
            .into_iter()
            .filter_map(|node| parse_id(numbering.attr(node, W, attr)))
            .max()
    };
    NumberingAllocator {
        next_num_id: max_of("num", "numId").map_or(1, |max| max + 1),
        next_abstract_num_id: max_of("abstractNum", "abstractNumId").map_or(0, |max| max + 1),
    }
}

/// Path of a document's numbering part, if it has one
pub fn numbering_part_path(doc: &WordDocument) -> Option<String> {
    doc.part_by_reltype(doc.main_part(), Relationships::TYPE_NUMBERING)
        .filter(|path| doc.xml_part(path).is_some())
}

/// Abstract numbering id a `numId` resolves to within one numbering part
pub fn abstract_num_id_of(numbering: &XmlDocument, num_id: u32) -> Option<u32> {
    let num = child_with_id(numbering, numbering.root(), "num", "numId", num_id)?;
    let reference = numbering.find_child(num, W, "abstractNumId")?;
    parse_id(numbering.w_val(reference))
}

/// Bring the numbering definitions referenced under `element` over from
/// `source` and rewrite the references
///
/// `element` lives in the target part `part`: a body block in the main
/// document, or a style just copied into the styles part.
pub fn add_numberings(
    ctx: &mut CompositionContext,
    source: &WordDocument,
    target: &mut WordDocument,
    part: &str,
    element: NodeId,
) -> Result<Vec<NumberingOutcome>> {
    let num_ids = referenced_num_ids(xml_part(target, part)?, element);
    if num_ids.iter().all(|id| *id == 0) {
        return Ok(Vec::new());
    }

    let source_numbering = numbering_part_path(source).and_then(|path| source.xml_part(&path));
    // created on the first definition actually copied
    let mut numbering_path: Option<String> = None;

    let mut outcomes = Vec::new();
    for num_id in num_ids {
        if num_id == 0 {
            continue;
        }
        if let Some(&mapped) = ctx.refs.num_ids.get(&num_id) {
            outcomes.push(NumberingOutcome::Reused {
                source: num_id,
                target: mapped,
            });
            continue;
        }

        let Some(src) = source_numbering else {
            log::debug!("numId {} skipped: source has no numbering part", num_id);
            outcomes.push(NumberingOutcome::Skipped {
                num_id,
                reason: SkipReason::NoSourceNumbering,
            });
            continue;
        };
        let Some(src_num) = child_with_id(src, src.root(), "num", "numId", num_id) else {
            log::debug!("numId {} skipped: not defined in source", num_id);
            outcomes.push(NumberingOutcome::Skipped {
                num_id,
                reason: SkipReason::UnknownNum,
            });
            continue;
        };
        let Some(src_abstract_id) = abstract_num_id_of(src, num_id) else {
            outcomes.push(NumberingOutcome::Skipped {
                num_id,
                reason: SkipReason::UnknownAbstractNum,
            });
            continue;
        };
        let abstract_source = match ctx.refs.abstract_num_ids.get(&src_abstract_id) {
            Some(&mapped) => AbstractSource::Mapped(mapped),
            None => match child_with_id(src, src.root(), "abstractNum", "abstractNumId", src_abstract_id) {
                Some(node) => AbstractSource::Clone(node),
                None => {
                    log::debug!(
                        "numId {} skipped: abstractNum {} not defined in source",
                        num_id,
                        src_abstract_id
                    );
                    outcomes.push(NumberingOutcome::Skipped {
                        num_id,
                        reason: SkipReason::UnknownAbstractNum,
                    });
                    continue;
                }
            },
        };

        let path = match &numbering_path {
            Some(path) => path.clone(),
            None => {
                let path = target.ensure_part(PartTemplate::Numbering)?;
                numbering_path = Some(path.clone());
                path
            }
        };
        let numbering = xml_part_mut(target, &path)?;
        let mut alloc = ctx
            .allocator
            .unwrap_or_else(|| scan_allocator(numbering));

        let (abstract_num_id, abstract_reused) = match abstract_source {
            AbstractSource::Mapped(mapped) => (mapped, true),
            AbstractSource::Clone(src_abstract) => {
                let new_id = alloc.take_abstract_num_id();
                let copy = numbering.import(src, src_abstract);
                numbering.set_attr(copy, W, "abstractNumId", new_id.to_string());
                set_nsid(numbering, copy, ctx.next_nsid());
                insert_abstract_num(numbering, copy);
                ctx.refs.abstract_num_ids.insert(src_abstract_id, new_id);
                (new_id, false)
            }
        };

        let new_num_id = alloc.take_num_id();
        let copy = numbering.import(src, src_num);
        numbering.set_attr(copy, W, "numId", new_num_id.to_string());
        let reference = numbering.ensure_child(copy, W, "abstractNumId");
        numbering.set_attr(reference, W, "val", abstract_num_id.to_string());
        insert_num(numbering, copy);
        ctx.refs.num_ids.insert(num_id, new_num_id);
        ctx.allocator = Some(alloc);

        log::debug!(
            "numId {} -> {} (abstractNum {} -> {}{})",
            num_id,
            new_num_id,
            src_abstract_id,
            abstract_num_id,
            if abstract_reused { ", shared" } else { "" }
        );
        outcomes.push(NumberingOutcome::Remapped {
            source: num_id,
            target: new_num_id,
            abstract_num_id,
            abstract_reused,
        });
    }

    let doc = xml_part_mut(target, part)?;
    for node in doc.descendants_named(element, W, "numId") {
        if let Some(id) = parse_id(doc.w_val(node)) {
            let mapped = ctx.refs.map_num_id(id);
            if mapped != id {
                doc.set_attr(node, W, "val", mapped.to_string());
            }
        }
    }

    Ok(outcomes)
}

/// Make the first paragraph of each numbered style start a fresh list
///
/// The first `w:pStyle` under `element` decides. Its numbering comes from
/// the paragraph's own `numPr` when present, otherwise from the style. The
/// matching `w:num` is cloned with a level 0 `startOverride` of 1 and the
/// paragraph is pointed at the clone. Headings and bullet lists are left
/// alone. Each style is restarted at most once per composition call; a
/// paragraph of the style without numbering does not use up that restart.
pub fn restart_first_numbering(
    ctx: &mut CompositionContext,
    target: &mut WordDocument,
    element: NodeId,
) -> Result<RestartOutcome> {
    let main = target.main_part().to_string();

    let doc = target.document();
    let Some(p_style) = doc.find_descendant(element, W, "pStyle") else {
        return Ok(RestartOutcome::NotApplied(RestartSkip::NoStyle));
    };
    let Some(style_id) = doc.w_val(p_style).map(str::to_string) else {
        return Ok(RestartOutcome::NotApplied(RestartSkip::NoStyle));
    };
    if ctx.refs.restarted_styles.contains(&style_id) {
        return Ok(RestartOutcome::NotApplied(RestartSkip::AlreadyRestarted));
    }
    let p_pr = doc.parent(p_style);
    let local_num_node = p_pr.and_then(|p_pr| doc.select_first(p_pr, "w:numPr/w:numId"));
    let local_num_id = local_num_node.and_then(|node| parse_id(doc.w_val(node)));

    let style = target
        .part_by_reltype(&main, Relationships::TYPE_STYLES)
        .and_then(|path| target.xml_part(&path))
        .and_then(|styles| find_style(styles, &style_id).map(|style| (styles, style)));
    let Some((styles, style)) = style else {
        return Ok(RestartOutcome::NotApplied(RestartSkip::UnknownStyle));
    };
    if styles.find_descendant(style, W, "outlineLvl").is_some() {
        return Ok(RestartOutcome::NotApplied(RestartSkip::Heading));
    }
    let style_num_pr = styles.find_descendant(style, W, "numPr");
    let style_num_id = style_num_pr
        .and_then(|num_pr| styles.find_child(num_pr, W, "numId"))
        .and_then(|node| parse_id(styles.w_val(node)));
    let style_ilvl = style_num_pr
        .and_then(|num_pr| styles.find_child(num_pr, W, "ilvl"))
        .and_then(|node| styles.w_val(node))
        .map(str::to_string);

    let num_id = match local_num_id.or(style_num_id) {
        Some(id) if id != 0 => id,
        _ => return Ok(RestartOutcome::NotApplied(RestartSkip::NoNumbering)),
    };

    let Some(numbering_path) = numbering_part_path(target) else {
        return Ok(RestartOutcome::NotApplied(RestartSkip::UnknownNum));
    };
    let numbering = xml_part_mut(target, &numbering_path)?;
    let root = numbering.root();
    let Some(num) = child_with_id(numbering, root, "num", "numId", num_id) else {
        return Ok(RestartOutcome::NotApplied(RestartSkip::UnknownNum));
    };
    let format = abstract_num_id_of(numbering, num_id)
        .and_then(|id| child_with_id(numbering, root, "abstractNum", "abstractNumId", id))
        .and_then(|abstract_num| level_zero_format(numbering, abstract_num));
    if format.as_deref() == Some("bullet") {
        return Ok(RestartOutcome::NotApplied(RestartSkip::Bullet));
    }

    let mut alloc = ctx
        .allocator
        .unwrap_or_else(|| scan_allocator(numbering));
    let new_num_id = alloc.take_num_id();
    ctx.allocator = Some(alloc);

    let copy = numbering.deep_clone(num);
    numbering.set_attr(copy, W, "numId", new_num_id.to_string());
    for existing in numbering.children_named(copy, W, "lvlOverride") {
        if numbering.attr(existing, W, "ilvl") == Some("0") {
            numbering.remove(existing);
        }
    }
    let lvl_override = numbering.create_element(W, "lvlOverride");
    numbering.set_attr(lvl_override, W, "ilvl", "0");
    let start_override = numbering.create_element(W, "startOverride");
    numbering.set_attr(start_override, W, "val", "1");
    numbering.append(lvl_override, start_override);
    numbering.append(copy, lvl_override);
    insert_num(numbering, copy);

    let doc = target.document_mut();
    match (local_num_node, local_num_id) {
        (Some(node), Some(old)) => {
            doc.set_attr(node, W, "val", new_num_id.to_string());
            ctx.refs.repoint_num_id(old, new_num_id);
        }
        _ => {
            if let Some(p_pr) = p_pr {
                inject_num_pr(doc, p_pr, style_ilvl, new_num_id);
            }
        }
    }

    log::debug!("restarted numbering of style {} as numId {}", style_id, new_num_id);
    ctx.refs.restarted_styles.insert(style_id.clone());
    Ok(RestartOutcome::Restarted {
        style_id,
        num_id: new_num_id,
    })
}

/// `w:numFmt` of level 0 of an abstract definition
fn level_zero_format(numbering: &XmlDocument, abstract_num: NodeId) -> Option<String> {
    let level = numbering
        .children_named(abstract_num, W, "lvl")
        .into_iter()
        .find(|lvl| numbering.attr(*lvl, W, "ilvl") == Some("0"))?;
    let format = numbering.find_child(level, W, "numFmt")?;
    numbering.w_val(format).map(str::to_string)
}

fn set_nsid(numbering: &mut XmlDocument, abstract_num: NodeId, value: String) {
    let nsid = match numbering.find_child(abstract_num, W, "nsid") {
        Some(nsid) => nsid,
        None => {
            let nsid = numbering.create_element(W, "nsid");
            numbering.insert_at(abstract_num, 0, nsid);
            nsid
        }
    };
    numbering.set_attr(nsid, W, "val", value);
}

/// Abstract definitions go before the first `w:num`
fn insert_abstract_num(numbering: &mut XmlDocument, abstract_num: NodeId) {
    let root = numbering.root();
    if let Some(first_num) = numbering.find_child(root, W, "num") {
        numbering.insert_before(first_num, abstract_num);
        return;
    }
    let last_definition = numbering
        .child_elements(root)
        .into_iter()
        .rev()
        .find(|child| numbering.is(*child, W, "abstractNum") || numbering.is(*child, W, "numPicBullet"));
    match last_definition {
        Some(previous) => numbering.insert_after(previous, abstract_num),
        None => numbering.insert_at(root, 0, abstract_num),
    }
}

/// Instances go after the last `w:num`
fn insert_num(numbering: &mut XmlDocument, num: NodeId) {
    let root = numbering.root();
    let last = numbering
        .child_elements(root)
        .into_iter()
        .rev()
        .find(|child| numbering.is(*child, W, "num") || numbering.is(*child, W, "abstractNum"));
    match last {
        Some(previous) => numbering.insert_after(previous, num),
        None => numbering.append(root, num),
    }
}

fn inject_num_pr(doc: &mut XmlDocument, p_pr: NodeId, ilvl: Option<String>, num_id: u32) {
    let num_pr = doc.create_element(W, "numPr");
    if let Some(level) = ilvl {
        let node = doc.create_element(W, "ilvl");
        doc.set_attr(node, W, "val", level);
        doc.append(num_pr, node);
    }
    let node = doc.create_element(W, "numId");
    doc.set_attr(node, W, "val", num_id.to_string());
    doc.append(num_pr, node);

    let anchor = doc
        .child_elements(p_pr)
        .into_iter()
        .filter(|child| NUM_PR_PREDECESSORS.iter().any(|local| doc.is(*child, W, local)))
        .last();
    match anchor {
        Some(previous) => doc.insert_after(previous, num_pr),
        None => doc.insert_at(p_pr, 0, num_pr),
    }
}
