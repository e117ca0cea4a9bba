//! Node list decoding
//!
//! Rebuilds the nested [`DataValue`] tree from the flat pre-order
//! [`NodeList`] the engine produces. One cursor is threaded through the
//! recursion by reference, so the walk is linear in the number of nodes and
//! never copies the remainder of the list.
//!
//! The decoder trusts nothing about the list: declared container sizes are
//! checked against what is actually left, map keys must be strings, and
//! nesting is capped so a hostile file cannot exhaust the stack.

use crate::error::DecodeError;
use crate::node::{EntryData, NodeList};
use crate::value::{DataMap, DataValue};
use rustc_hash::FxHashMap;

/// Default nesting limit, the same limit the engine applies while flattening
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Decode a complete node list into one value
///
/// Every node must belong to the value; leftovers are reported as
/// [`DecodeError::TrailingNodes`].
pub fn decode_node_list(list: &NodeList<'_>) -> Result<DataValue, DecodeError> {
    Decoder::new(list.as_slice()).decode_all()
}

/// Cursor-based decoder over a node slice
pub struct Decoder<'n, 'a> {
    nodes: &'n [EntryData<'a>],
    cursor: usize,
    max_depth: usize,
}

impl<'n, 'a> Decoder<'n, 'a> {
    /// Create a decoder with the default depth limit
    pub fn new(nodes: &'n [EntryData<'a>]) -> Self {
        Self {
            nodes,
            cursor: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Change the nesting limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Number of nodes consumed so far
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Decode the value starting at the current position
    ///
    /// On error the cursor is left where it was, so a failed decode leaves
    /// no trace in the decoder either.
    pub fn decode_value(&mut self) -> Result<DataValue, DecodeError> {
        let mut cursor = self.cursor;
        let value = self.decode_at(&mut cursor, 0)?;
        self.cursor = cursor;
        Ok(value)
    }

    /// Decode one value and require that it used every remaining node
    pub fn decode_all(mut self) -> Result<DataValue, DecodeError> {
        let value = self.decode_value()?;
        match self.nodes.len() - self.cursor {
            0 => Ok(value),
            left => Err(DecodeError::TrailingNodes(left)),
        }
    }

    fn decode_at(&self, cursor: &mut usize, depth: usize) -> Result<DataValue, DecodeError> {
        let node = self.next_node(cursor)?;

        match *node {
            EntryData::Map { size } => self.decode_map(cursor, size, depth),
            EntryData::Array { size } => self.decode_array(cursor, size, depth),
            EntryData::Utf8String(bytes) => Ok(DataValue::String(utf8(bytes)?)),
            EntryData::Bytes(bytes) => Ok(DataValue::Bytes(bytes.to_vec())),
            EntryData::Double(d) => Ok(DataValue::Double(d)),
            EntryData::Float(f) => Ok(DataValue::Float(f)),
            EntryData::Uint16(n) => Ok(DataValue::Uint16(n)),
            EntryData::Uint32(n) => Ok(DataValue::Uint32(n)),
            EntryData::Uint64(n) => Ok(DataValue::Uint64(n)),
            EntryData::Uint128(raw) => Ok(DataValue::Uint128(u128::from_be_bytes(
                raw.to_be_bytes(),
            ))),
            EntryData::Int32(n) => Ok(DataValue::Int32(n)),
            EntryData::Boolean(b) => Ok(DataValue::Bool(b)),
            EntryData::Other { type_id } => Err(DecodeError::UnknownType(type_id)),
        }
    }

    fn decode_map(
        &self,
        cursor: &mut usize,
        size: u32,
        depth: usize,
    ) -> Result<DataValue, DecodeError> {
        self.check_depth(depth)?;

        // Each pair needs at least two nodes
        let capacity = self.bounded_capacity(*cursor, (size as usize).saturating_mul(2)) / 2;
        let mut entries: Vec<(String, DataValue)> = Vec::with_capacity(capacity);
        let mut positions: FxHashMap<String, usize> = FxHashMap::default();

        for _ in 0..size {
            let key = self.decode_key(cursor)?;
            let value = self.decode_at(cursor, depth + 1)?;

            match positions.get(&key) {
                Some(&index) => entries[index].1 = value,
                None => {
                    positions.insert(key.clone(), entries.len());
                    entries.push((key, value));
                }
            }
        }

        Ok(DataValue::Map(DataMap::from_unique_entries(entries)))
    }

    fn decode_array(
        &self,
        cursor: &mut usize,
        size: u32,
        depth: usize,
    ) -> Result<DataValue, DecodeError> {
        self.check_depth(depth)?;

        let mut array = Vec::with_capacity(self.bounded_capacity(*cursor, size as usize));
        for _ in 0..size {
            array.push(self.decode_at(cursor, depth + 1)?);
        }

        Ok(DataValue::Array(array))
    }

    fn decode_key(&self, cursor: &mut usize) -> Result<String, DecodeError> {
        match *self.next_node(cursor)? {
            EntryData::Utf8String(bytes) => utf8(bytes),
            ref other => Err(DecodeError::MalformedKey {
                type_id: other.type_id(),
            }),
        }
    }

    fn next_node(&self, cursor: &mut usize) -> Result<&'n EntryData<'a>, DecodeError> {
        let node = self
            .nodes
            .get(*cursor)
            .ok_or(DecodeError::UnexpectedEnd { position: *cursor })?;
        *cursor += 1;
        Ok(node)
    }

    // Containers at depth 0..max_depth are allowed; children of the deepest
    // allowed container are still fine if they are scalars.
    fn check_depth(&self, depth: usize) -> Result<(), DecodeError> {
        if depth >= self.max_depth {
            return Err(DecodeError::TooDeep {
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    fn bounded_capacity(&self, cursor: usize, declared: usize) -> usize {
        declared.min(self.nodes.len().saturating_sub(cursor))
    }
}

fn utf8(bytes: &[u8]) -> Result<String, DecodeError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| DecodeError::InvalidUtf8)
}
