#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::redundant_pub_crate)]
#![allow(clippy::float_cmp)]

//! Orrery ECS - Archetype-based Entity Component System
//!
//! A fixed-capacity store that partitions entities by exact component
//! set and keeps queries incremental.
//!
//! # Key Concepts
//!
//! - **Entity**: a `u32` key into fixed-length component columns
//! - **Component**: a declared schema of typed fields, present or absent
//!   per entity
//! - **Archetype**: the set of entities sharing one component mask, with
//!   cached one-bit transitions to neighboring archetypes
//! - **Query**: an ANDed list of `All`/`Any`/`Not` expressions, matched
//!   against archetypes once and updated incrementally afterwards
//!
//! # Deferred Mutation
//!
//! Structural changes (create, destroy, add, remove) either apply
//! immediately or queue until a flush barrier, per the store default or
//! a per-call override. [`Registry::update`] runs registered systems and
//! then flushes destroys before updates, so logic may mutate freely
//! while iterating.
//!
//! # Example
//!
//! ```
//! use orrery_ecs::{Expr, Kind, Registry};
//!
//! let mut registry = Registry::new(1024);
//! let position = registry.define_component(&["x", "y"], &[Kind::F32, Kind::F32]);
//! let frozen = registry.define_component(&[], &[]);
//!
//! let e = registry.create_entity();
//! registry.add_component(e, position);
//!
//! let moving = registry.create_query(vec![Expr::All(vec![position]), Expr::Not(frozen)]);
//! assert_eq!(registry.query_entities(moving), &[e][..]);
//!
//! registry.column_mut::<f32>(position, "x").unwrap()[e as usize] = 4.0;
//! registry.add_component(e, frozen);
//! assert!(registry.query_entities(moving).is_empty());
//! ```

mod archetype;
mod component;
mod mask;
mod query;
mod registry;
mod sparse;
mod system;

pub use archetype::{Archetype, ArchetypeGraph, ArchetypeId};
pub use component::{Column, ComponentData, ComponentId, Kind, Scalar};
pub use mask::Mask;
pub use query::{Expr, QueryId};
pub use registry::{Defer, Entity, Registry};
pub use sparse::SparseSet;
pub use system::System;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{ComponentId, Defer, Entity, Expr, Kind, QueryId, Registry, System};
}
