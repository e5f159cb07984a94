//! Query compilation and incremental archetype indexing.
//!
//! A query is a boolean expression over component ids, compiled once into
//! a tree of word masks. Matching recurses over the tree; a leaf compares
//! its words against an archetype mask. Registered queries are indexed
//! incrementally: every archetype created after registration is offered
//! to every live query exactly once, so iteration never rescans the
//! archetype map.

use std::fmt;

use crate::{archetype::ArchetypeId, component::ComponentId, mask::Mask, registry::Entity};

/// Boolean combinator over component ids.
///
/// A query is a list of these, implicitly ANDed together.
#[derive(Clone, Debug)]
pub enum Expr {
    /// Match archetypes carrying every listed component. `All` of an
    /// empty list matches everything.
    All(Vec<ComponentId>),
    /// Match archetypes carrying at least one listed component. `Any` of
    /// an empty list matches nothing.
    Any(Vec<ComponentId>),
    /// Match archetypes not carrying the component.
    Not(ComponentId),
}

/// Handle to a query registered with a store.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId(u32);

impl QueryId {
    /// Create a query ID from a raw value.
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

impl fmt::Debug for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryId({})", self.0)
    }
}

/// Compiled form of an [`Expr`] list.
///
/// Leaves hold word masks sized to their own highest component id; the
/// matching operations tolerate width differences against archetype
/// masks.
pub(crate) enum MaskNode {
    /// Leaf: every bit must be present.
    AllOf(Mask),
    /// Leaf: at least one bit must be present.
    AnyOf(Mask),
    /// Negation of the single child.
    Not(Box<MaskNode>),
    /// Conjunction over children.
    All(Vec<MaskNode>),
}

impl MaskNode {
    pub(crate) fn compile(exprs: &[Expr]) -> Self {
        Self::All(exprs.iter().map(Self::compile_expr).collect())
    }

    fn compile_expr(expr: &Expr) -> Self {
        match expr {
            Expr::All(components) => Self::AllOf(leaf_bits(components)),
            Expr::Any(components) => Self::AnyOf(leaf_bits(components)),
            Expr::Not(component) => {
                Self::Not(Box::new(Self::AllOf(leaf_bits(&[*component]))))
            }
        }
    }

    /// Whether an archetype mask satisfies this node.
    pub(crate) fn matches(&self, mask: &Mask) -> bool {
        match self {
            Self::AllOf(bits) => mask.contains_all(bits),
            Self::AnyOf(bits) => mask.intersects(bits),
            Self::Not(child) => !child.matches(mask),
            Self::All(children) => children.iter().all(|child| child.matches(mask)),
        }
    }
}

/// Leaf mask over the listed components, sized to the highest id.
fn leaf_bits(components: &[ComponentId]) -> Mask {
    let words = components
        .iter()
        .map(|component| component.as_raw() as usize / 32 + 1)
        .max()
        .unwrap_or(0);
    let mut bits = Mask::zeroed(words);
    for component in components {
        bits.set(component.as_raw());
    }
    bits
}

/// Per-query live state held by the store.
pub(crate) struct QueryState {
    pub(crate) tree: MaskNode,
    /// Matching archetypes in registration order.
    pub(crate) archetypes: Vec<ArchetypeId>,
    /// Flattened entity list, rebuilt on demand when dirty.
    pub(crate) entities: Vec<Entity>,
    pub(crate) dirty: bool,
}

impl QueryState {
    pub(crate) fn new(tree: MaskNode) -> Self {
        Self {
            tree,
            archetypes: Vec::new(),
            entities: Vec::new(),
            dirty: true,
        }
    }
}

/// Mark dirty every query whose tree matches `mask`.
///
/// Called by the store after any structural change touching an archetype
/// with that mask, so cached entity lists are rebuilt lazily.
pub(crate) fn mark_dirty(queries: &mut [QueryState], mask: &Mask) {
    for query in queries {
        if query.tree.matches(mask) {
            query.dirty = true;
        }
    }
}
