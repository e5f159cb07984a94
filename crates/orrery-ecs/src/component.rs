//! Component definitions and fixed-capacity typed columns.
//!
//! A component is a dense id plus a list of named primitive fields. Each
//! field owns one fixed-length column indexed directly by entity id. A
//! column slot is only meaningful while the owning archetype's mask bit
//! is set; otherwise it holds whatever value was last written there.

use std::fmt;

use hashbrown::HashMap;

/// Dense id of a component definition, assigned in declaration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(u32);

impl ComponentId {
    /// Create a component ID from a raw value.
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

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

/// Primitive element type of a column.
///
/// The discriminants are the element type ids of the snapshot wire format
/// and must stay stable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u32)]
pub enum Kind {
    I8 = 0,
    I16 = 1,
    I32 = 2,
    I64 = 3,
    U8 = 4,
    U16 = 5,
    U32 = 6,
    U64 = 7,
    F32 = 8,
    F64 = 9,
    Bool = 10,
}

impl Kind {
    /// Bytes per element on the wire. Bool is stored as one byte.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::I8 | Self::U8 | Self::Bool => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// The wire type id.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Decode a wire type id.
    #[must_use]
    pub const fn from_u32(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::I8,
            1 => Self::I16,
            2 => Self::I32,
            3 => Self::I64,
            4 => Self::U8,
            5 => Self::U16,
            6 => Self::U32,
            7 => Self::U64,
            8 => Self::F32,
            9 => Self::F64,
            10 => Self::Bool,
            _ => return None,
        })
    }
}

/// One fixed-capacity column of a single primitive kind.
pub enum Column {
    I8(Box<[i8]>),
    I16(Box<[i16]>),
    I32(Box<[i32]>),
    I64(Box<[i64]>),
    U8(Box<[u8]>),
    U16(Box<[u16]>),
    U32(Box<[u32]>),
    U64(Box<[u64]>),
    F32(Box<[f32]>),
    F64(Box<[f64]>),
    Bool(Box<[bool]>),
}

impl Column {
    /// Allocate a zero-filled column of `capacity` elements.
    #[must_use]
    pub fn new(kind: Kind, capacity: usize) -> Self {
        match kind {
            Kind::I8 => Self::I8(vec![0; capacity].into_boxed_slice()),
            Kind::I16 => Self::I16(vec![0; capacity].into_boxed_slice()),
            Kind::I32 => Self::I32(vec![0; capacity].into_boxed_slice()),
            Kind::I64 => Self::I64(vec![0; capacity].into_boxed_slice()),
            Kind::U8 => Self::U8(vec![0; capacity].into_boxed_slice()),
            Kind::U16 => Self::U16(vec![0; capacity].into_boxed_slice()),
            Kind::U32 => Self::U32(vec![0; capacity].into_boxed_slice()),
            Kind::U64 => Self::U64(vec![0; capacity].into_boxed_slice()),
            Kind::F32 => Self::F32(vec![0.0; capacity].into_boxed_slice()),
            Kind::F64 => Self::F64(vec![0.0; capacity].into_boxed_slice()),
            Kind::Bool => Self::Bool(vec![false; capacity].into_boxed_slice()),
        }
    }

    /// Element type of this column.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::I8(_) => Kind::I8,
            Self::I16(_) => Kind::I16,
            Self::I32(_) => Kind::I32,
            Self::I64(_) => Kind::I64,
            Self::U8(_) => Kind::U8,
            Self::U16(_) => Kind::U16,
            Self::U32(_) => Kind::U32,
            Self::U64(_) => Kind::U64,
            Self::F32(_) => Kind::F32,
            Self::F64(_) => Kind::F64,
            Self::Bool(_) => Kind::Bool,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::I8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::Bool(v) => v.len(),
        }
    }

    /// Whether the column has zero capacity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Column<{:?}>[{}]", self.kind(), self.len())
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A primitive scalar storable in a column.
///
/// Sealed; implemented exactly for the eleven supported element types.
pub trait Scalar: sealed::Sealed + Copy {
    /// The kind tag matching `Self`.
    const KIND: Kind;

    /// View a column as a typed slice, if the element types agree.
    fn slice(column: &Column) -> Option<&[Self]>;

    /// View a column as a mutable typed slice, if the element types agree.
    fn slice_mut(column: &mut Column) -> Option<&mut [Self]>;
}

macro_rules! impl_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Scalar for $ty {
                const KIND: Kind = Kind::$variant;

                fn slice(column: &Column) -> Option<&[Self]> {
                    match column {
                        Column::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn slice_mut(column: &mut Column) -> Option<&mut [Self]> {
                    match column {
                        Column::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_scalar! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
}

/// A component definition: a dense id and its typed field columns.
///
/// Fields keep declaration order; a component with zero fields is a pure
/// tag occupying only a mask bit.
pub struct ComponentData {
    id: ComponentId,
    names: Vec<String>,
    columns: Vec<Column>,
    by_name: HashMap<String, usize>,
}

impl ComponentData {
    /// Build a definition from parallel name/kind lists, truncated to the
    /// shorter of the two. Each column holds `capacity` elements.
    #[must_use]
    pub(crate) fn new(id: ComponentId, names: &[&str], kinds: &[Kind], capacity: usize) -> Self {
        let count = names.len().min(kinds.len());
        let mut columns = Vec::with_capacity(count);
        let mut by_name = HashMap::with_capacity(count);
        let mut owned_names = Vec::with_capacity(count);
        for (index, (&name, &kind)) in names.iter().zip(kinds).enumerate() {
            columns.push(Column::new(kind, capacity));
            by_name.insert(name.to_owned(), index);
            owned_names.push(name.to_owned());
        }
        Self {
            id,
            names: owned_names,
            columns,
            by_name,
        }
    }

    /// The dense component id.
    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// Number of fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.columns.len()
    }

    /// Name of the field at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn field_name(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// Position of the named field. Duplicated names resolve to the last
    /// declaration.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Kind of the field at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn field_kind(&self, index: usize) -> Kind {
        self.columns[index].kind()
    }

    /// The column of the field at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn column(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    /// Typed view of the column at `index`. `None` when the index is out
    /// of range or `T` does not match the column's kind.
    #[must_use]
    pub fn column_slice<T: Scalar>(&self, index: usize) -> Option<&[T]> {
        T::slice(self.columns.get(index)?)
    }

    /// Typed mutable view of the column at `index`.
    #[must_use]
    pub fn column_slice_mut<T: Scalar>(&mut self, index: usize) -> Option<&mut [T]> {
        T::slice_mut(self.columns.get_mut(index)?)
    }
}

impl fmt::Debug for ComponentData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentData({:?}", self.id)?;
        for (name, column) in self.names.iter().zip(&self.columns) {
            write!(f, ", {name}: {:?}", column.kind())?;
        }
        write!(f, ")")
    }
}
