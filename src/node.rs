//! Flattened entry data
//!
//! The engine does not hand out nested values. Instead it walks an entry in
//! the data section and emits a pre-order list of typed nodes, the same shape
//! libmaxminddb calls an "entry data list":
//!
//! ```text
//! Map{size: 2}
//!   Utf8String("city")      key
//!   Map{size: 1}            value
//!     Utf8String("en")        key
//!     Utf8String("Paris")     value
//!   Utf8String("tags")      key
//!   Array{size: 1}          value
//!     Utf8String("eu")
//! ```
//!
//! String and byte payloads borrow from the mapped file, so a [`NodeList`]
//! cannot outlive the handle that produced it.

/// Extended type marker (never appears in a node list)
pub const DATA_TYPE_EXTENDED: u32 = 0;
/// Pointer (resolved by the engine, never appears in a node list)
pub const DATA_TYPE_POINTER: u32 = 1;
/// UTF-8 string
pub const DATA_TYPE_UTF8_STRING: u32 = 2;
/// IEEE 754 double
pub const DATA_TYPE_DOUBLE: u32 = 3;
/// Raw bytes
pub const DATA_TYPE_BYTES: u32 = 4;
/// Unsigned 16-bit integer
pub const DATA_TYPE_UINT16: u32 = 5;
/// Unsigned 32-bit integer
pub const DATA_TYPE_UINT32: u32 = 6;
/// Map with string keys
pub const DATA_TYPE_MAP: u32 = 7;
/// Signed 32-bit integer
pub const DATA_TYPE_INT32: u32 = 8;
/// Unsigned 64-bit integer
pub const DATA_TYPE_UINT64: u32 = 9;
/// Unsigned 128-bit integer
pub const DATA_TYPE_UINT128: u32 = 10;
/// Array
pub const DATA_TYPE_ARRAY: u32 = 11;
/// Data cache container
pub const DATA_TYPE_CONTAINER: u32 = 12;
/// End marker
pub const DATA_TYPE_END_MARKER: u32 = 13;
/// Boolean
pub const DATA_TYPE_BOOLEAN: u32 = 14;
/// IEEE 754 single precision float
pub const DATA_TYPE_FLOAT: u32 = 15;

/// A 128-bit unsigned integer as the engine hands it over
///
/// Targets with native 128-bit arithmetic get two words; the others get the
/// raw big-endian bytes. [`RawUint128::to_be_bytes`] is the only way the
/// decoder looks at either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawUint128 {
    /// High and low 64-bit halves
    Words {
        /// Most significant 64 bits
        high: u64,
        /// Least significant 64 bits
        low: u64,
    },
    /// 16 bytes, most significant first
    BigEndian([u8; 16]),
}

impl RawUint128 {
    /// Build the representation the current target uses
    pub fn native(bytes: [u8; 16]) -> Self {
        if cfg!(target_pointer_width = "64") {
            let mut high = [0u8; 8];
            let mut low = [0u8; 8];
            high.copy_from_slice(&bytes[..8]);
            low.copy_from_slice(&bytes[8..]);
            RawUint128::Words {
                high: u64::from_be_bytes(high),
                low: u64::from_be_bytes(low),
            }
        } else {
            RawUint128::BigEndian(bytes)
        }
    }

    /// Canonical big-endian form
    pub fn to_be_bytes(&self) -> [u8; 16] {
        match *self {
            RawUint128::Words { high, low } => {
                let mut out = [0u8; 16];
                out[..8].copy_from_slice(&high.to_be_bytes());
                out[8..].copy_from_slice(&low.to_be_bytes());
                out
            }
            RawUint128::BigEndian(bytes) => bytes,
        }
    }
}

/// One node of a flattened entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryData<'a> {
    /// Map header, followed by `2 * size` nodes (key, value, key, value...)
    Map {
        /// Number of key/value pairs
        size: u32,
    },
    /// Array header, followed by `size` values
    Array {
        /// Number of elements
        size: u32,
    },
    /// UTF-8 string bytes (not yet validated)
    Utf8String(&'a [u8]),
    /// Raw bytes
    Bytes(&'a [u8]),
    /// IEEE 754 double
    Double(f64),
    /// IEEE 754 single precision float
    Float(f32),
    /// Unsigned 16-bit integer
    Uint16(u16),
    /// Unsigned 32-bit integer
    Uint32(u32),
    /// Unsigned 64-bit integer
    Uint64(u64),
    /// Unsigned 128-bit integer
    Uint128(RawUint128),
    /// Signed 32-bit integer
    Int32(i32),
    /// Boolean
    Boolean(bool),
    /// A data type the engine passed through without interpreting
    Other {
        /// Raw MMDB data type number
        type_id: u32,
    },
}

impl EntryData<'_> {
    /// MMDB data type number of this node
    pub fn type_id(&self) -> u32 {
        match self {
            EntryData::Map { .. } => DATA_TYPE_MAP,
            EntryData::Array { .. } => DATA_TYPE_ARRAY,
            EntryData::Utf8String(_) => DATA_TYPE_UTF8_STRING,
            EntryData::Bytes(_) => DATA_TYPE_BYTES,
            EntryData::Double(_) => DATA_TYPE_DOUBLE,
            EntryData::Float(_) => DATA_TYPE_FLOAT,
            EntryData::Uint16(_) => DATA_TYPE_UINT16,
            EntryData::Uint32(_) => DATA_TYPE_UINT32,
            EntryData::Uint64(_) => DATA_TYPE_UINT64,
            EntryData::Uint128(_) => DATA_TYPE_UINT128,
            EntryData::Int32(_) => DATA_TYPE_INT32,
            EntryData::Boolean(_) => DATA_TYPE_BOOLEAN,
            EntryData::Other { type_id } => *type_id,
        }
    }
}

/// Pre-order node sequence for one entry or for the metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeList<'a> {
    nodes: Vec<EntryData<'a>>,
}

impl<'a> NodeList<'a> {
    /// Empty list
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Append a node
    pub fn push(&mut self, node: EntryData<'a>) {
        self.nodes.push(node);
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the list holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in order
    pub fn as_slice(&self) -> &[EntryData<'a>] {
        &self.nodes
    }

    /// Index just past the subtree rooted at `index`
    ///
    /// Returns `None` if the subtree runs off the end of the list.
    pub fn skip_subtree(&self, index: usize) -> Option<usize> {
        let mut pending: u64 = 1;
        let mut cursor = index;
        while pending > 0 {
            let node = self.nodes.get(cursor)?;
            cursor += 1;
            pending -= 1;
            match node {
                EntryData::Map { size } => pending += 2 * u64::from(*size),
                EntryData::Array { size } => pending += u64::from(*size),
                _ => {}
            }
        }
        Some(cursor)
    }
}

impl<'a> From<Vec<EntryData<'a>>> for NodeList<'a> {
    fn from(nodes: Vec<EntryData<'a>>) -> Self {
        Self { nodes }
    }
}

impl<'a> FromIterator<EntryData<'a>> for NodeList<'a> {
    fn from_iter<I: IntoIterator<Item = EntryData<'a>>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}
