//! Composition of several documents into one
//!
//! [`Composer`] owns the target document. Each [`Composer::insert`] copies
//! the body blocks of a source document into the target and brings along
//! everything they reference: styles, numbering definitions, images, OLE
//! objects, diagrams, footnotes and hyperlinks. Ids that are only unique per
//! document (bookmarks, drawing object ids) are renumbered over the whole
//! target body afterwards.
//!
//! # Example
//!
//! ```no_run
//! use docxcompose_core::Composer;
//! use docxcompose_ooxml::WordDocument;
//!
//! let mut composer = Composer::new(WordDocument::open("master.docx")?);
//! let mut chapter = WordDocument::open("chapter.docx")?;
//! composer.append(&mut chapter)?;
//! composer.save("composed.docx")?;
//! # Ok::<(), docxcompose_core::ComposeError>(())
//! ```

use std::path::Path;

use docxcompose_ooxml::{NodeId, WordDocument};

use crate::blocks::BlockKind;
use crate::context::CompositionContext;
use crate::error::Result;
use crate::fields::dissolve_fields;
use crate::footnotes::add_footnotes;
use crate::headers::remove_header_footer_references;
use crate::hyperlinks::add_hyperlinks;
use crate::media::{add_diagrams, add_images, add_ole_objects};
use crate::numbering::{add_numberings, restart_first_numbering, NumberingOutcome, RestartOutcome};
use crate::properties::CustomProperties;
use crate::renumber::{renumber_bookmarks, renumber_drawing_ids, BookmarkNumbering};
use crate::styles::{add_styles, StyleOutcome};

/// Behaviour switches for a [`Composer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Turn `DOCPROPERTY` fields of inserted documents into plain text
    pub remove_property_fields: bool,
    /// Make the first numbered paragraph of each style start a new list
    pub restart_numbering: bool,
    /// How bookmark ids are renumbered after each insert
    pub bookmark_numbering: BookmarkNumbering,
    /// Seed for `w:nsid` values; random when unset
    pub nsid_seed: Option<u32>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            remove_property_fields: true,
            restart_numbering: true,
            bookmark_numbering: BookmarkNumbering::default(),
            nsid_seed: None,
        }
    }
}

/// What one insert call did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposeReport {
    /// Blocks copied into the target
    pub blocks: usize,
    /// `DOCPROPERTY` fields of the source turned into plain text
    pub fields_dissolved: usize,
    /// One entry per style referenced by a copied block
    pub styles: Vec<StyleOutcome>,
    /// One entry per distinct `numId` met in copied blocks and styles
    pub numberings: Vec<NumberingOutcome>,
    /// One entry per copied block
    pub restarts: Vec<RestartOutcome>,
    /// Image references rewritten, shared parts included
    pub images: usize,
    pub ole_objects: usize,
    /// Diagram parts copied
    pub diagrams: usize,
    /// Footnotes copied under new ids
    pub footnotes: usize,
    /// `w:headerReference`/`w:footerReference` elements dropped
    pub header_footer_references_removed: usize,
    /// Hyperlink relationships added or reused
    pub hyperlinks: usize,
}

impl ComposeReport {
    /// Numbering instances that were newly created in the target
    pub fn new_numberings(&self) -> usize {
        self.numberings
            .iter()
            .filter(|outcome| matches!(outcome, NumberingOutcome::Remapped { .. }))
            .count()
    }

    /// Lists made to restart
    pub fn restarted(&self) -> usize {
        self.restarts
            .iter()
            .filter(|outcome| matches!(outcome, RestartOutcome::Restarted { .. }))
            .count()
    }
}

/// Merges documents into a target document
pub struct Composer {
    doc: WordDocument,
    options: ComposeOptions,
    ctx: CompositionContext,
}

impl Composer {
    pub fn new(doc: WordDocument) -> Self {
        Self::with_options(doc, ComposeOptions::default())
    }

    pub fn with_options(doc: WordDocument, options: ComposeOptions) -> Self {
        Self {
            doc,
            ctx: CompositionContext::with_nsid_seed(options.nsid_seed),
            options,
        }
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    pub fn document(&self) -> &WordDocument {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut WordDocument {
        &mut self.doc
    }

    pub fn into_document(self) -> WordDocument {
        self.doc
    }

    /// Insert `source` at the end of the target body, before its section
    /// properties
    pub fn append(&mut self, source: &mut WordDocument) -> Result<ComposeReport> {
        let index = self.append_index()?;
        self.insert(index, source)
    }

    /// Element index of the target body's `w:sectPr`, or the number of body
    /// elements when there is none
    pub fn append_index(&self) -> Result<usize> {
        let xml = self.doc.document();
        let blocks = xml.child_elements(self.doc.body()?);
        Ok(blocks
            .iter()
            .position(|block| BlockKind::classify(xml, *block) == BlockKind::SectionProperties)
            .unwrap_or(blocks.len()))
    }

    /// Insert the body of `source` so that its first block becomes body
    /// element number `index`
    ///
    /// `source` is modified: its property fields are dissolved first when
    /// [`ComposeOptions::remove_property_fields`] is set.
    pub fn insert(&mut self, index: usize, source: &mut WordDocument) -> Result<ComposeReport> {
        self.ctx.reset();
        let mut report = ComposeReport::default();

        if self.options.remove_property_fields {
            for name in CustomProperties::names_from_document(source) {
                report.fields_dissolved += dissolve_fields(source, &name)?;
            }
        }

        let source_blocks: Vec<NodeId> = {
            let xml = source.document();
            xml.child_elements(source.body()?)
                .into_iter()
                .filter(|block| BlockKind::classify(xml, *block).is_content())
                .collect()
        };

        let body = self.doc.body()?;
        let mut index = index;
        for block in source_blocks {
            let element = self.doc.document_mut().import(source.document(), block);
            self.doc.document_mut().insert_at(body, index, element);
            self.relocate(source, element, &mut report)?;
            index += 1;
            report.blocks += 1;
        }

        let xml = self.doc.document_mut();
        renumber_bookmarks(xml, body, self.options.bookmark_numbering);
        renumber_drawing_ids(xml, body);

        log::info!(
            "inserted {} blocks ({} styles, {} new lists, {} images, {} footnotes)",
            report.blocks,
            report
                .styles
                .iter()
                .filter(|outcome| matches!(outcome, StyleOutcome::Copied { .. }))
                .count(),
            report.new_numberings(),
            report.images,
            report.footnotes
        );
        Ok(report)
    }

    /// Bring over what one inserted block references
    fn relocate(
        &mut self,
        source: &WordDocument,
        element: NodeId,
        report: &mut ComposeReport,
    ) -> Result<()> {
        let main = self.doc.main_part().to_string();
        let target = &mut self.doc;
        let ctx = &mut self.ctx;

        report.styles.extend(add_styles(ctx, source, target, element)?);
        report
            .numberings
            .extend(add_numberings(ctx, source, target, &main, element)?);
        if self.options.restart_numbering {
            report.restarts.push(restart_first_numbering(ctx, target, element)?);
        }
        report.images += add_images(source, target, element)?;
        report.ole_objects += add_ole_objects(source, target, element)?;
        report.diagrams += add_diagrams(source, target, element)?;
        report.footnotes += add_footnotes(source, target, element)?;
        report.header_footer_references_removed += remove_header_footer_references(target, element);
        report.hyperlinks += add_hyperlinks(source, source.main_part(), target, &main, element)?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.doc.save(path)?;
        Ok(())
    }
}

/// Append every document of `sources` to `target`
pub fn compose(
    target: WordDocument,
    sources: impl IntoIterator<Item = WordDocument>,
    options: ComposeOptions,
) -> Result<WordDocument> {
    let mut composer = Composer::with_options(target, options);
    for mut source in sources {
        composer.append(&mut source)?;
    }
    Ok(composer.into_document())
}
