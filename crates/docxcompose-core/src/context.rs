//! Per-call composition state
//!
//! Every `insert`/`append` call starts from a fresh [`ReferenceMap`]: the
//! identifiers an inserted document carries only mean something inside that
//! document, so mappings recorded while inserting one source must never leak
//! into the next. Mappings are shared across all blocks of the same call so
//! that a list spread over several paragraphs stays one list.

use std::collections::{HashMap, HashSet};

/// Old-to-new identifier maps for one composition call
#[derive(Debug, Default, Clone)]
pub struct ReferenceMap {
    /// Source `numId` to target `numId`
    pub num_ids: HashMap<u32, u32>,
    /// Source `abstractNumId` to target `abstractNumId`
    pub abstract_num_ids: HashMap<u32, u32>,
    /// Source style id to style name, built on first use
    pub source_style_names: Option<HashMap<String, String>>,
    /// Target style name to style id, built on first use
    pub target_style_ids: Option<HashMap<String, String>>,
    /// Target style ids whose numbering has been restarted
    pub restarted_styles: HashSet<String>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Target `numId` for a source `numId`; unmapped ids and the `0`
    /// sentinel pass through unchanged
    pub fn map_num_id(&self, num_id: u32) -> u32 {
        if num_id == 0 {
            return 0;
        }
        self.num_ids.get(&num_id).copied().unwrap_or(num_id)
    }

    /// Point every source `numId` currently mapped to `old` at `new`
    pub fn repoint_num_id(&mut self, old: u32, new: u32) {
        for target in self.num_ids.values_mut() {
            if *target == old {
                *target = new;
            }
        }
    }
}

/// Source of list sequence identifiers (`w:nsid`)
#[derive(Debug, Clone)]
pub struct NsidGenerator {
    rng: fastrand::Rng,
}

impl NsidGenerator {
    /// Seeded from the operating system
    pub fn random() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    /// Same sequence for the same seed, for reproducible output
    pub fn seeded(seed: u32) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(u64::from(seed)),
        }
    }

    pub fn next_value(&mut self) -> u32 {
        self.rng.u32(..)
    }

    /// Next value as eight uppercase hex digits
    pub fn next_hex(&mut self) -> String {
        format!("{:08X}", self.next_value())
    }
}

/// Numbering identifiers still free in the target's numbering part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberingAllocator {
    pub next_num_id: u32,
    pub next_abstract_num_id: u32,
}

impl NumberingAllocator {
    pub fn take_num_id(&mut self) -> u32 {
        let id = self.next_num_id;
        self.next_num_id += 1;
        id
    }

    pub fn take_abstract_num_id(&mut self) -> u32 {
        let id = self.next_abstract_num_id;
        self.next_abstract_num_id += 1;
        id
    }
}

/// State threaded through every step of one composition call
#[derive(Debug, Clone)]
pub struct CompositionContext {
    pub refs: ReferenceMap,
    /// Computed from the target on first use within a call
    pub allocator: Option<NumberingAllocator>,
    nsid: NsidGenerator,
}

impl Default for CompositionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositionContext {
    pub fn new() -> Self {
        Self {
            refs: ReferenceMap::new(),
            allocator: None,
            nsid: NsidGenerator::random(),
        }
    }

    pub fn with_nsid_seed(seed: Option<u32>) -> Self {
        Self {
            nsid: seed.map_or_else(NsidGenerator::random, NsidGenerator::seeded),
            ..Self::new()
        }
    }

    /// Start a new composition call; the nsid sequence carries on
    pub fn reset(&mut self) {
        self.refs.reset();
        self.allocator = None;
    }

    pub fn next_nsid(&mut self) -> String {
        self.nsid.next_hex()
    }
}
