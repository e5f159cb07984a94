//! Section tags for the snapshot wire format.
//!
//! Tags are opaque markers checked on decode; the values themselves
//! carry no meaning beyond identity, but they are part of the format
//! and must never be renumbered.

/// Outermost section wrapping an entire snapshot.
pub const ECS: u32 = 16;
/// Entity state: allocation count, recycle list, active list.
pub const ENTITIES: u32 = 17;
/// Destroyed ids awaiting reuse, in recycle order.
pub const REMOVED: u32 = 18;
/// Sequence of [`ENTITY`] sections for every live entity.
pub const ACTIVE: u32 = 19;
/// One live entity: id followed by its archetype mask words.
pub const ENTITY: u32 = 20;
/// Sequence of [`COMPONENT`] sections in declaration order.
pub const COMPONENTS: u32 = 21;
/// One component: id, field count, then one [`ARRAY`] per field.
pub const COMPONENT: u32 = 22;
/// One field column: element count, element kind, raw elements.
pub const ARRAY: u32 = 23;
