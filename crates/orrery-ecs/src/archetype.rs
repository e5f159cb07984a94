//! Archetype graph - mask-keyed entity partitions with cached one-bit
//! transitions.
//!
//! Exactly one archetype exists per distinct mask. Archetypes live in an
//! arena addressed by stable id; each one memoizes the destination of a
//! single-bit toggle per component id, so repeated identical transitions
//! cost O(1) after the first resolution.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::{mask::Mask, sparse::SparseSet};

/// Unique identifier for an archetype.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// The empty archetype (no components).
    pub const EMPTY: Self = Self(0);

    /// Create an archetype ID from a raw value.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArchetypeId({})", self.0)
    }
}

/// One partition of the store: the set of entities whose component mask
/// equals this archetype's mask exactly.
pub struct Archetype {
    mask: Mask,
    entities: SparseSet,
    /// Destination of toggling one component bit, indexed by component id.
    /// Lazily grown, never invalidated.
    edges: Vec<Option<ArchetypeId>>,
}

impl Archetype {
    fn new(mask: Mask) -> Self {
        Self {
            mask,
            entities: SparseSet::new(),
            edges: Vec::new(),
        }
    }

    /// The component-presence mask.
    #[must_use]
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Member entities in packed order.
    #[must_use]
    pub fn entities(&self) -> &[u32] {
        self.entities.packed()
    }

    /// Number of member entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the archetype has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether `entity` is a member.
    #[must_use]
    pub fn contains(&self, entity: u32) -> bool {
        self.entities.has(entity)
    }

    pub(crate) fn insert(&mut self, entity: u32) {
        self.entities.add(entity);
    }

    pub(crate) fn remove(&mut self, entity: u32) {
        self.entities.remove(entity);
    }

    pub(crate) fn edge(&self, component: u32) -> Option<ArchetypeId> {
        self.edges.get(component as usize).copied().flatten()
    }

    pub(crate) fn set_edge(&mut self, component: u32, to: ArchetypeId) {
        let index = component as usize;
        if index >= self.edges.len() {
            self.edges.resize(index + 1, None);
        }
        self.edges[index] = Some(to);
    }
}

impl fmt::Debug for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archetype")
            .field("mask", &self.mask)
            .field("entities", &self.entities.len())
            .field("edges", &self.edges.len())
            .finish()
    }
}

/// Arena of archetypes plus the canonical mask-to-id map.
///
/// The empty archetype occupies slot 0 from construction but only enters
/// the canonical map when the store sizes it at first entity creation.
pub struct ArchetypeGraph {
    archetypes: Vec<Archetype>,
    by_mask: FxHashMap<Mask, ArchetypeId>,
    empty_registered: bool,
}

impl ArchetypeGraph {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            archetypes: vec![Archetype::new(Mask::default())],
            by_mask: FxHashMap::default(),
            empty_registered: false,
        }
    }

    /// The archetype with `id`.
    ///
    /// # Panics
    /// Panics if `id` is not in the arena.
    #[must_use]
    pub fn get(&self, id: ArchetypeId) -> &Archetype {
        &self.archetypes[id.as_raw() as usize]
    }

    pub(crate) fn get_mut(&mut self, id: ArchetypeId) -> &mut Archetype {
        &mut self.archetypes[id.as_raw() as usize]
    }

    /// Number of archetypes in the arena, the empty one included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// Whether the arena holds only the never-registered empty archetype.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.empty_registered && self.archetypes.len() == 1
    }

    pub(crate) fn lookup(&self, mask: &Mask) -> Option<ArchetypeId> {
        self.by_mask.get(mask).copied()
    }

    /// Add a new archetype for `mask`. The mask must not be registered.
    pub(crate) fn insert(&mut self, mask: Mask) -> ArchetypeId {
        debug_assert!(!self.by_mask.contains_key(&mask));
        let id = ArchetypeId::from_raw(self.archetypes.len() as u32);
        tracing::trace!("created archetype {:?} for {:?}", id, mask);
        self.by_mask.insert(mask.clone(), id);
        self.archetypes.push(Archetype::new(mask));
        id
    }

    /// Size the empty archetype's mask to `words` words and register it
    /// in the canonical map. Returns whether this registration was new.
    pub(crate) fn register_empty(&mut self, words: usize) -> bool {
        self.archetypes[0].mask.resize(words);
        let mask = self.archetypes[0].mask.clone();
        let newly = !self.by_mask.contains_key(&mask);
        if newly {
            self.by_mask.insert(mask, ArchetypeId::EMPTY);
        }
        self.empty_registered = true;
        newly
    }

    /// Ids of every registered archetype, in registration order.
    pub(crate) fn registered(&self) -> impl Iterator<Item = ArchetypeId> + '_ {
        let start = if self.empty_registered { 0 } else { 1 };
        (start..self.archetypes.len() as u32).map(ArchetypeId::from_raw)
    }
}

impl fmt::Debug for ArchetypeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchetypeGraph")
            .field("archetypes", &self.archetypes.len())
            .field("registered", &self.by_mask.len())
            .finish()
    }
}
