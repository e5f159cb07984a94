#![allow(clippy::float_cmp)]

//! Bit-exact binary snapshots for the Orrery ECS.
//!
//! A snapshot captures the full entity state of a [`Registry`]: the
//! allocation high-water mark, the recycle list in order, every live
//! entity's archetype mask, and every component column in full. Loading
//! a snapshot into a store with the same schema and capacity restores
//! state exactly, including the order destroyed ids are handed back out.
//!
//! # Wire Format
//!
//! Every section is `tag: u32, byte_length: u32, payload`, where the
//! length covers the payload only, never the 8-byte header. All
//! integers are big-endian; `Bool` elements are one byte, decoded as
//! `byte == 1`.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ ECS                                                          │
//! │ ├─ ENTITIES                                                  │
//! │ │    next_entity_id: u32                                     │
//! │ │    ├─ REMOVED    destroyed ids in recycle order: u32 each  │
//! │ │    └─ ACTIVE                                               │
//! │ │        └─ ENTITY (one per live entity, ascending id)       │
//! │ │             id: u32, archetype mask words: u32 each        │
//! │ └─ COMPONENTS                                                │
//! │     └─ COMPONENT (one per component, declaration order)      │
//! │          id: u32, field_count: u32                           │
//! │          └─ ARRAY (one per field)                            │
//! │               count: u32, kind: u32, raw elements            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Decode Behavior
//!
//! Decoding is fail-closed. A wrong tag, a truncated header, a section
//! overrunning its parent, or a mask bit naming an undeclared component
//! aborts the entire remaining parse. Two mismatches are tolerated and
//! skipped instead, because they mean "this snapshot was taken under a
//! different schema": a `COMPONENT` whose id or field count differs
//! from the live declaration, and an `ARRAY` whose kind or element
//! count differs from the live column. Skips consume the declared
//! section length, so later sections still decode.
//!
//! # Usage
//!
//! ```
//! use orrery_ecs::{Kind, Registry};
//!
//! let mut registry = Registry::new(16);
//! let health = registry.define_component(&["hp"], &[Kind::U16]);
//! let e = registry.create_entity();
//! registry.add_component(e, health);
//! registry.column_mut::<u16>(health, "hp").unwrap()[e as usize] = 20;
//!
//! let bytes = orrery_snapshot::to_bytes(&registry);
//!
//! registry.column_mut::<u16>(health, "hp").unwrap()[e as usize] = 5;
//! orrery_snapshot::from_bytes(&mut registry, &bytes);
//! assert_eq!(registry.column::<u16>(health, "hp").unwrap()[e as usize], 20);
//! ```
//!
//! [`Registry`]: orrery_ecs::Registry

mod error;
pub mod tags;

pub use error::{SnapshotError, SnapshotResult};

use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use orrery_ecs::{ComponentData, ComponentId, Defer, Kind, Registry, Scalar};

/// Element-level wire codec, implemented for the eleven column types.
trait Wire: Scalar {
    fn read_from(input: &mut &[u8]) -> io::Result<Self>;
    fn write_to(self, out: &mut Vec<u8>);
}

macro_rules! impl_wire {
    ($($ty:ty => $read:ident),* $(,)?) => {
        $(
            impl Wire for $ty {
                fn read_from(input: &mut &[u8]) -> io::Result<Self> {
                    input.$read::<BigEndian>()
                }

                fn write_to(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_be_bytes());
                }
            }
        )*
    };
}

impl_wire! {
    i16 => read_i16,
    i32 => read_i32,
    i64 => read_i64,
    u16 => read_u16,
    u32 => read_u32,
    u64 => read_u64,
    f32 => read_f32,
    f64 => read_f64,
}

impl Wire for i8 {
    fn read_from(input: &mut &[u8]) -> io::Result<Self> {
        input.read_i8()
    }

    fn write_to(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }
}

impl Wire for u8 {
    fn read_from(input: &mut &[u8]) -> io::Result<Self> {
        input.read_u8()
    }

    fn write_to(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}

impl Wire for bool {
    fn read_from(input: &mut &[u8]) -> io::Result<Self> {
        Ok(input.read_u8()? == 1)
    }

    fn write_to(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }
}

// ==================== Encode ====================

fn section_into(out: &mut Vec<u8>, tag: u32, payload: &[u8]) {
    out.extend_from_slice(&tag.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
}

fn write_elements<T: Wire>(out: &mut Vec<u8>, data: &ComponentData, field: usize) {
    if let Some(values) = data.column_slice::<T>(field) {
        for &value in values {
            value.write_to(out);
        }
    }
}

fn encode_array(out: &mut Vec<u8>, data: &ComponentData, field: usize) {
    let column = data.column(field);
    let mut array = Vec::new();
    array.extend_from_slice(&(column.len() as u32).to_be_bytes());
    array.extend_from_slice(&column.kind().as_u32().to_be_bytes());
    match column.kind() {
        Kind::I8 => write_elements::<i8>(&mut array, data, field),
        Kind::I16 => write_elements::<i16>(&mut array, data, field),
        Kind::I32 => write_elements::<i32>(&mut array, data, field),
        Kind::I64 => write_elements::<i64>(&mut array, data, field),
        Kind::U8 => write_elements::<u8>(&mut array, data, field),
        Kind::U16 => write_elements::<u16>(&mut array, data, field),
        Kind::U32 => write_elements::<u32>(&mut array, data, field),
        Kind::U64 => write_elements::<u64>(&mut array, data, field),
        Kind::F32 => write_elements::<f32>(&mut array, data, field),
        Kind::F64 => write_elements::<f64>(&mut array, data, field),
        Kind::Bool => write_elements::<bool>(&mut array, data, field),
    }
    section_into(out, tags::ARRAY, &array);
}

fn encode_entities(registry: &Registry) -> Vec<u8> {
    let mut entities = Vec::new();
    entities.extend_from_slice(&registry.next_entity_id().to_be_bytes());

    let mut removed = Vec::new();
    for &id in registry.removed_entities() {
        removed.extend_from_slice(&id.to_be_bytes());
    }
    section_into(&mut entities, tags::REMOVED, &removed);

    let mut active = Vec::new();
    for id in registry.live_entities() {
        let mut entity = Vec::new();
        entity.extend_from_slice(&id.to_be_bytes());
        for &word in registry.archetype_of(id).mask().words() {
            entity.extend_from_slice(&word.to_be_bytes());
        }
        section_into(&mut active, tags::ENTITY, &entity);
    }
    section_into(&mut entities, tags::ACTIVE, &active);

    entities
}

fn encode_components(registry: &Registry) -> Vec<u8> {
    let mut components = Vec::new();
    for index in 0..registry.component_count() {
        let data = registry.component(ComponentId::from_raw(index as u32));
        let mut component = Vec::new();
        component.extend_from_slice(&data.id().as_raw().to_be_bytes());
        component.extend_from_slice(&(data.field_count() as u32).to_be_bytes());
        for field in 0..data.field_count() {
            encode_array(&mut component, data, field);
        }
        section_into(&mut components, tags::COMPONENT, &component);
    }
    components
}

/// Serialize the full entity state of `registry`.
///
/// The output is deterministic: two stores with identical state produce
/// identical bytes.
#[must_use]
pub fn to_bytes(registry: &Registry) -> Vec<u8> {
    let mut payload = Vec::new();
    section_into(&mut payload, tags::ENTITIES, &encode_entities(registry));
    section_into(&mut payload, tags::COMPONENTS, &encode_components(registry));

    let mut out = Vec::new();
    section_into(&mut out, tags::ECS, &payload);
    tracing::debug!(
        "snapshot captured: {} bytes, {} live entities",
        out.len(),
        registry.entity_count()
    );
    out
}

// ==================== Decode ====================

fn take<'a>(input: &mut &'a [u8], len: usize) -> SnapshotResult<&'a [u8]> {
    if len > input.len() {
        return Err(SnapshotError::Overrun {
            declared: len,
            remaining: input.len(),
        });
    }
    let (head, tail) = input.split_at(len);
    *input = tail;
    Ok(head)
}

/// Read one section header, requiring `expected`, and return its payload.
fn section<'a>(input: &mut &'a [u8], expected: u32) -> SnapshotResult<&'a [u8]> {
    let found = input.read_u32::<BigEndian>()?;
    if found != expected {
        return Err(SnapshotError::TagMismatch { expected, found });
    }
    let len = input.read_u32::<BigEndian>()? as usize;
    take(input, len)
}

fn fill<T: Wire>(
    data: &mut ComponentData,
    field: usize,
    input: &mut &[u8],
) -> SnapshotResult<()> {
    if let Some(values) = data.column_slice_mut::<T>(field) {
        for slot in values {
            *slot = T::read_from(input)?;
        }
    }
    Ok(())
}

fn decode_column(
    data: &mut ComponentData,
    field: usize,
    input: &mut &[u8],
) -> SnapshotResult<()> {
    let mut array = section(input, tags::ARRAY)?;
    let count = array.read_u32::<BigEndian>()? as usize;
    let kind = array.read_u32::<BigEndian>()?;
    if Kind::from_u32(kind) != Some(data.field_kind(field)) || count != data.column(field).len() {
        tracing::debug!(
            "skipping field {:?} of component {:?}: kind or length mismatch",
            data.field_name(field),
            data.id()
        );
        return Ok(());
    }
    match data.field_kind(field) {
        Kind::I8 => fill::<i8>(data, field, &mut array),
        Kind::I16 => fill::<i16>(data, field, &mut array),
        Kind::I32 => fill::<i32>(data, field, &mut array),
        Kind::I64 => fill::<i64>(data, field, &mut array),
        Kind::U8 => fill::<u8>(data, field, &mut array),
        Kind::U16 => fill::<u16>(data, field, &mut array),
        Kind::U32 => fill::<u32>(data, field, &mut array),
        Kind::U64 => fill::<u64>(data, field, &mut array),
        Kind::F32 => fill::<f32>(data, field, &mut array),
        Kind::F64 => fill::<f64>(data, field, &mut array),
        Kind::Bool => fill::<bool>(data, field, &mut array),
    }
}

fn decode_components(registry: &mut Registry, mut input: &[u8]) -> SnapshotResult<()> {
    for index in 0..registry.component_count() {
        let mut component = section(&mut input, tags::COMPONENT)?;
        let id = component.read_u32::<BigEndian>()?;
        let fields = component.read_u32::<BigEndian>()?;
        let data = registry.component_mut(ComponentId::from_raw(index as u32));
        if id != data.id().as_raw() || fields as usize != data.field_count() {
            tracing::debug!("skipping component {id}: schema mismatch at slot {index}");
            continue;
        }
        for field in 0..data.field_count() {
            decode_column(data, field, &mut component)?;
        }
    }
    Ok(())
}

fn decode_entities(registry: &mut Registry, mut input: &[u8]) -> SnapshotResult<()> {
    let count = input.read_u32::<BigEndian>()?;
    registry.clear_entities();
    for _ in 0..count {
        registry.create_entity();
    }

    let mut removed = section(&mut input, tags::REMOVED)?;
    while !removed.is_empty() {
        let id = removed.read_u32::<BigEndian>()?;
        registry.destroy_entity_with(id, Defer::Immediate);
    }

    let mut active = section(&mut input, tags::ACTIVE)?;
    while !active.is_empty() {
        let mut entity = section(&mut active, tags::ENTITY)?;
        let id = entity.read_u32::<BigEndian>()?;
        let mut word_index = 0u32;
        while !entity.is_empty() {
            let word = entity.read_u32::<BigEndian>()?;
            for bit in 0..32u32 {
                if word & (1 << bit) == 0 {
                    continue;
                }
                let component = word_index * 32 + bit;
                if component as usize >= registry.component_count() {
                    return Err(SnapshotError::UnknownComponent(component));
                }
                registry.add_component_with(id, ComponentId::from_raw(component), Defer::Immediate);
            }
            word_index += 1;
        }
    }
    Ok(())
}

/// Restore `registry` from `bytes`, surfacing the first decode error.
///
/// The outer `ECS` and `ENTITIES` headers are validated before any
/// mutation, so malformed input is rejected without touching the store.
/// An error past that point leaves the store with the state applied so
/// far; callers wanting all-or-nothing should load into a scratch store
/// first.
///
/// # Panics
/// Panics if the snapshot names more entities than the store's capacity
/// or replays an id outside the allocated range. Snapshots are expected
/// to load into a store with the schema and capacity they were taken
/// from; these are corruption cases, not schema drift.
pub fn try_from_bytes(registry: &mut Registry, bytes: &[u8]) -> SnapshotResult<()> {
    let mut input = bytes;
    let mut payload = section(&mut input, tags::ECS)?;
    let entities = section(&mut payload, tags::ENTITIES)?;
    decode_entities(registry, entities)?;
    let components = section(&mut payload, tags::COMPONENTS)?;
    decode_components(registry, components)?;
    tracing::debug!(
        "snapshot restored: {} live entities, {} components",
        registry.entity_count(),
        registry.component_count()
    );
    Ok(())
}

/// Restore `registry` from `bytes`, absorbing decode errors.
///
/// On any decode error the remaining parse is abandoned and a warning
/// is logged; the store keeps whatever state was applied before the
/// error. See [`try_from_bytes`] for the surfaced form.
///
/// # Panics
/// Panics in the same corruption cases as [`try_from_bytes`].
pub fn from_bytes(registry: &mut Registry, bytes: &[u8]) {
    if let Err(err) = try_from_bytes(registry, bytes) {
        tracing::warn!("snapshot load aborted: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_ecs::{Entity, Registry};

    fn paired_stores() -> (Registry, Registry, ComponentId, ComponentId) {
        let mut a = Registry::new(2);
        let c0 = a.define_component(&["v"], &[Kind::U32]);
        let c1 = a.define_component(&["w"], &[Kind::U32]);
        let mut b = Registry::new(2);
        b.define_component(&["v"], &[Kind::U32]);
        b.define_component(&["w"], &[Kind::U32]);
        (a, b, c0, c1)
    }

    #[test]
    fn test_round_trip_restores_full_state() {
        let mut a = Registry::new(8);
        let pos = a.define_component(&["x", "y"], &[Kind::F32, Kind::F64]);
        let flags = a.define_component(&["on"], &[Kind::Bool]);
        let big = a.define_component(&["v", "n"], &[Kind::I64, Kind::U64]);

        let e0 = a.create_entity();
        a.add_component(e0, pos);
        let e1 = a.create_entity();
        a.add_component(e1, pos);
        a.add_component(e1, flags);
        a.add_component(e1, big);
        let e2 = a.create_entity();
        a.destroy_entity(e2);

        a.column_mut::<f32>(pos, "x").unwrap()[e0 as usize] = -1.25;
        a.column_mut::<f64>(pos, "y").unwrap()[e1 as usize] = 6.5e300;
        a.column_mut::<bool>(flags, "on").unwrap()[e1 as usize] = true;
        a.column_mut::<i64>(big, "v").unwrap()[e1 as usize] = -(1 << 40);
        a.column_mut::<u64>(big, "n").unwrap()[e1 as usize] = u64::MAX;

        let bytes = to_bytes(&a);

        let mut b = Registry::new(8);
        let pos_b = b.define_component(&["x", "y"], &[Kind::F32, Kind::F64]);
        let flags_b = b.define_component(&["on"], &[Kind::Bool]);
        let big_b = b.define_component(&["v", "n"], &[Kind::I64, Kind::U64]);
        try_from_bytes(&mut b, &bytes).unwrap();

        assert_eq!(b.entity_count(), 2);
        assert_eq!(b.next_entity_id(), 3);
        assert_eq!(b.removed_entities(), &[e2]);
        assert!(b.archetype_of(e0).mask().get(pos_b.as_raw()));
        assert!(!b.archetype_of(e0).mask().get(flags_b.as_raw()));
        assert!(b.archetype_of(e1).mask().get(flags_b.as_raw()));
        assert!(b.archetype_of(e1).mask().get(big_b.as_raw()));
        assert_eq!(b.column::<f32>(pos_b, "x").unwrap()[e0 as usize], -1.25);
        assert_eq!(b.column::<f64>(pos_b, "y").unwrap()[e1 as usize], 6.5e300);
        assert!(b.column::<bool>(flags_b, "on").unwrap()[e1 as usize]);
        assert!(!b.column::<bool>(flags_b, "on").unwrap()[e0 as usize]);
        assert_eq!(b.column::<i64>(big_b, "v").unwrap()[e1 as usize], -(1 << 40));
        assert_eq!(b.column::<u64>(big_b, "n").unwrap()[e1 as usize], u64::MAX);

        // Reserialization is bit-identical.
        assert_eq!(to_bytes(&b), bytes);
    }

    #[test]
    fn test_round_trip_preserves_recycle_order() {
        let mut a = Registry::new(8);
        a.define_component(&["v"], &[Kind::U8]);
        for _ in 0..4 {
            a.create_entity();
        }
        a.destroy_entity(1);
        a.destroy_entity(3);
        let bytes = to_bytes(&a);

        let mut b = Registry::new(8);
        b.define_component(&["v"], &[Kind::U8]);
        from_bytes(&mut b, &bytes);

        assert_eq!(b.removed_entities(), &[1, 3]);
        assert_eq!(b.create_entity(), 3);
        assert_eq!(b.create_entity(), 1);
        assert_eq!(b.next_entity_id(), 4);
    }

    #[test]
    fn test_snapshot_layout_golden() {
        let mut registry = Registry::new(2);
        let c = registry.define_component(&["v"], &[Kind::U8]);
        let e = registry.create_entity();
        registry.add_component(e, c);
        registry.column_mut::<u8>(c, "v").unwrap()[e as usize] = 7;

        let expected: Vec<u8> = vec![
            0, 0, 0, 16, 0, 0, 0, 86, // ECS, 86-byte payload
            0, 0, 0, 17, 0, 0, 0, 36, // ENTITIES
            0, 0, 0, 1, // next_entity_id
            0, 0, 0, 18, 0, 0, 0, 0, // REMOVED, empty
            0, 0, 0, 19, 0, 0, 0, 16, // ACTIVE
            0, 0, 0, 20, 0, 0, 0, 8, // ENTITY
            0, 0, 0, 0, // id 0
            0, 0, 0, 1, // mask word, bit 0 set
            0, 0, 0, 21, 0, 0, 0, 34, // COMPONENTS
            0, 0, 0, 22, 0, 0, 0, 26, // COMPONENT
            0, 0, 0, 0, // component id 0
            0, 0, 0, 1, // field count
            0, 0, 0, 23, 0, 0, 0, 10, // ARRAY
            0, 0, 0, 2, // element count == capacity
            0, 0, 0, 4, // kind U8
            7, 0, // elements
        ];
        assert_eq!(to_bytes(&registry), expected);
    }

    #[test]
    fn test_corrupt_outer_tag_is_a_no_op() {
        let mut registry = Registry::new(4);
        let c = registry.define_component(&["v"], &[Kind::U32]);
        let e = registry.create_entity();
        registry.add_component(e, c);
        registry.column_mut::<u32>(c, "v").unwrap()[e as usize] = 9;

        let mut bytes = to_bytes(&registry);
        bytes[3] = 99;
        from_bytes(&mut registry, &bytes);

        assert_eq!(registry.entity_count(), 1);
        assert_eq!(registry.column::<u32>(c, "v").unwrap()[e as usize], 9);
    }

    #[test]
    fn test_truncated_header_surfaces_error() {
        let mut a = Registry::new(4);
        a.define_component(&["v"], &[Kind::U32]);
        a.create_entity();
        let bytes = to_bytes(&a);

        let mut b = Registry::new(4);
        b.define_component(&["v"], &[Kind::U32]);
        let err = try_from_bytes(&mut b, &bytes[..6]).unwrap_err();
        assert!(matches!(err, SnapshotError::Truncated(_)));
        // Failed before any mutation.
        assert_eq!(b.entity_count(), 0);
    }

    #[test]
    fn test_failure_after_entities_leaves_partial_state() {
        let mut a = Registry::new(4);
        let c = a.define_component(&["v"], &[Kind::U32]);
        let e = a.create_entity();
        a.add_component(e, c);
        a.column_mut::<u32>(c, "v").unwrap()[e as usize] = 9;

        let mut bytes = to_bytes(&a);
        // The COMPONENTS header follows the 52-byte entity prefix.
        bytes[52..56].copy_from_slice(&99u32.to_be_bytes());

        let mut b = Registry::new(4);
        let c_b = b.define_component(&["v"], &[Kind::U32]);
        let err = try_from_bytes(&mut b, &bytes).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::TagMismatch {
                expected: tags::COMPONENTS,
                found: 99,
            }
        ));
        // Entities were already applied; columns never were.
        assert_eq!(b.entity_count(), 1);
        assert!(b.archetype_of(e).mask().get(c_b.as_raw()));
        assert_eq!(b.column::<u32>(c_b, "v").unwrap()[e as usize], 0);
    }

    #[test]
    fn test_section_overrun_surfaces_error() {
        let mut a = Registry::new(2);
        a.define_component(&["v"], &[Kind::U8]);
        a.create_entity();
        let mut bytes = to_bytes(&a);
        // Inflate the declared ECS payload length past the input.
        bytes[4..8].copy_from_slice(&1000u32.to_be_bytes());

        let mut b = Registry::new(2);
        b.define_component(&["v"], &[Kind::U8]);
        let err = try_from_bytes(&mut b, &bytes).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::Overrun {
                declared: 1000,
                ..
            }
        ));
    }

    #[test]
    fn test_component_id_mismatch_skips_to_next_component() {
        let (mut a, mut b, c0, c1) = paired_stores();
        let e = a.create_entity();
        a.add_component(e, c0);
        a.add_component(e, c1);
        a.column_mut::<u32>(c0, "v").unwrap()[e as usize] = 42;
        a.column_mut::<u32>(c1, "w").unwrap()[e as usize] = 77;

        let mut bytes = to_bytes(&a);
        // First COMPONENT id: 52-byte entity prefix, then the COMPONENTS
        // and COMPONENT headers (see the golden layout test).
        bytes[68..72].copy_from_slice(&9u32.to_be_bytes());
        try_from_bytes(&mut b, &bytes).unwrap();

        assert_eq!(b.column::<u32>(c0, "v").unwrap()[e as usize], 0);
        assert_eq!(b.column::<u32>(c1, "w").unwrap()[e as usize], 77);
    }

    #[test]
    fn test_array_kind_mismatch_skips_one_field() {
        let mut a = Registry::new(2);
        let c = a.define_component(&["a", "b"], &[Kind::U32, Kind::U32]);
        let e = a.create_entity();
        a.add_component(e, c);
        a.column_mut::<u32>(c, "a").unwrap()[e as usize] = 1;
        a.column_mut::<u32>(c, "b").unwrap()[e as usize] = 2;

        let mut bytes = to_bytes(&a);
        // First ARRAY kind field; the elements after it must be skipped
        // by length so the second ARRAY still aligns.
        bytes[88..92].copy_from_slice(&Kind::I32.as_u32().to_be_bytes());

        let mut b = Registry::new(2);
        b.define_component(&["a", "b"], &[Kind::U32, Kind::U32]);
        try_from_bytes(&mut b, &bytes).unwrap();

        assert_eq!(b.column::<u32>(c, "a").unwrap()[e as usize], 0);
        assert_eq!(b.column::<u32>(c, "b").unwrap()[e as usize], 2);
    }

    #[test]
    fn test_array_count_mismatch_skips_one_field() {
        let mut a = Registry::new(2);
        let c = a.define_component(&["a", "b"], &[Kind::U32, Kind::U32]);
        let e = a.create_entity();
        a.add_component(e, c);
        a.column_mut::<u32>(c, "a").unwrap()[e as usize] = 1;
        a.column_mut::<u32>(c, "b").unwrap()[e as usize] = 2;

        let mut bytes = to_bytes(&a);
        bytes[84..88].copy_from_slice(&1u32.to_be_bytes());

        let mut b = Registry::new(2);
        b.define_component(&["a", "b"], &[Kind::U32, Kind::U32]);
        try_from_bytes(&mut b, &bytes).unwrap();

        assert_eq!(b.column::<u32>(c, "a").unwrap()[e as usize], 0);
        assert_eq!(b.column::<u32>(c, "b").unwrap()[e as usize], 2);
    }

    #[test]
    fn test_unknown_component_bit_aborts() {
        let mut a = Registry::new(2);
        let c = a.define_component(&["v"], &[Kind::U8]);
        let e = a.create_entity();
        a.add_component(e, c);

        let mut bytes = to_bytes(&a);
        // The ENTITY mask word; bit 5 names a component never declared.
        bytes[48..52].copy_from_slice(&(1u32 << 5).to_be_bytes());

        let mut b = Registry::new(2);
        b.define_component(&["v"], &[Kind::U8]);
        let err = try_from_bytes(&mut b, &bytes).unwrap_err();
        assert!(matches!(err, SnapshotError::UnknownComponent(5)));
    }

    #[test]
    fn test_tag_component_round_trip() {
        let mut a = Registry::new(4);
        let marker = a.define_component(&[], &[]);
        let tagged = a.create_entity();
        a.add_component(tagged, marker);
        a.create_entity();
        let bytes = to_bytes(&a);

        let mut b = Registry::new(4);
        let marker_b = b.define_component(&[], &[]);
        from_bytes(&mut b, &bytes);

        assert!(b.archetype_of(tagged).mask().get(marker_b.as_raw()));
        assert!(!b.archetype_of(1).mask().get(marker_b.as_raw()));
    }

    #[test]
    fn test_load_replaces_existing_entities() {
        let mut a = Registry::new(8);
        let c = a.define_component(&["v"], &[Kind::I16]);
        let e = a.create_entity();
        a.add_component(e, c);
        a.column_mut::<i16>(c, "v").unwrap()[e as usize] = -3;
        let bytes = to_bytes(&a);

        // Populate the target with unrelated entities first.
        let mut b = Registry::new(8);
        let c_b = b.define_component(&["v"], &[Kind::I16]);
        for _ in 0..5 {
            let extra = b.create_entity();
            b.add_component(extra, c_b);
        }
        from_bytes(&mut b, &bytes);

        assert_eq!(b.entity_count(), 1);
        assert_eq!(b.next_entity_id(), 1);
        let live: Vec<Entity> = b.live_entities().collect();
        assert_eq!(live, vec![0]);
        assert_eq!(b.column::<i16>(c_b, "v").unwrap()[0], -3);
    }
}
