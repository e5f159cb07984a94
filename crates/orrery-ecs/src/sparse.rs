//! Sparse set - O(1) membership tracking over dense u32 ids.
//!
//! Backs archetype membership, the recycle set, and both deferred-mutation
//! queues. Removal is swap-delete, so packed order is not stable across
//! removals.

use std::fmt;

/// Membership set over dense u32 ids with O(1) add/remove/has.
///
/// The packed array holds the members; the sparse side-table maps an id to
/// its packed position. Sparse entries are never cleared on removal -
/// `has` stays correct because it checks the packed side back-reference.
#[derive(Clone, Default)]
pub struct SparseSet {
    /// Member ids, dense.
    packed: Vec<u32>,
    /// Packed position per id, auto-extended with zeroes. Entries for
    /// absent ids are stale.
    sparse: Vec<u32>,
}

impl SparseSet {
    /// Create an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            packed: Vec::new(),
            sparse: Vec::new(),
        }
    }

    /// Whether `x` is a member.
    #[must_use]
    pub fn has(&self, x: u32) -> bool {
        match self.sparse.get(x as usize) {
            Some(&slot) => self.packed.get(slot as usize) == Some(&x),
            None => false,
        }
    }

    /// Insert `x`. No-op if already present.
    pub fn add(&mut self, x: u32) {
        if self.has(x) {
            return;
        }
        let index = x as usize;
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, 0);
        }
        self.sparse[index] = self.packed.len() as u32;
        self.packed.push(x);
    }

    /// Remove `x`, swapping the last packed member into its slot.
    /// No-op if absent.
    pub fn remove(&mut self, x: u32) {
        if !self.has(x) {
            return;
        }
        if let Some(last) = self.packed.pop() {
            if last != x {
                let slot = self.sparse[x as usize];
                self.sparse[last as usize] = slot;
                self.packed[slot as usize] = last;
            }
        }
    }

    /// Remove and return the most recently packed member.
    pub fn pop(&mut self) -> Option<u32> {
        self.packed.pop()
    }

    /// The member at packed position 0, if any.
    #[must_use]
    pub fn first(&self) -> Option<u32> {
        self.packed.first().copied()
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packed.len()
    }

    /// Whether the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packed.is_empty()
    }

    /// The members in packed order.
    #[must_use]
    pub fn packed(&self) -> &[u32] {
        &self.packed
    }

    /// Move the packed array out, leaving the set empty.
    pub fn take_packed(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.packed)
    }

    /// Remove every member.
    pub fn clear(&mut self) {
        self.packed.clear();
        self.sparse.clear();
    }
}

impl fmt::Debug for SparseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.packed.iter()).finish()
    }
}
