//! Data section walking
//!
//! Flattens an MMDB-encoded value into a [`NodeList`]. This is where the
//! binary encoding is read: control bytes, extended types, size extensions,
//! pointers. Everything downstream sees typed nodes only.
//!
//! # Format
//!
//! A control byte holds the type in its top 3 bits and a size (or pointer
//! parameters) in the low 5 bits. Type 0 means "extended": the real type is
//! `7 + next byte`. Sizes 29, 30 and 31 pull 1, 2 or 3 more bytes.
//!
//! See: https://maxmind.github.io/MaxMind-DB/

use super::types::{EngineError, MAX_DATA_DEPTH};
use crate::node::{
    EntryData, NodeList, RawUint128, DATA_TYPE_ARRAY, DATA_TYPE_BOOLEAN, DATA_TYPE_BYTES,
    DATA_TYPE_DOUBLE, DATA_TYPE_EXTENDED, DATA_TYPE_FLOAT, DATA_TYPE_INT32, DATA_TYPE_MAP,
    DATA_TYPE_POINTER, DATA_TYPE_UINT128, DATA_TYPE_UINT16, DATA_TYPE_UINT32, DATA_TYPE_UINT64,
    DATA_TYPE_UTF8_STRING,
};

/// Upper bound on nodes emitted for one value
///
/// Pointers let a small file describe an exponentially large value.
pub const MAX_NODES: usize = 1 << 20;

/// Walks values in one section (data section or metadata)
///
/// Pointers are resolved relative to the start of `section`.
pub struct DataWalker<'a> {
    section: &'a [u8],
}

impl<'a> DataWalker<'a> {
    /// Create a walker over a section
    pub fn new(section: &'a [u8]) -> Self {
        Self { section }
    }

    /// Flatten the value at `offset` into a pre-order node list
    pub fn flatten(&self, offset: usize) -> Result<NodeList<'a>, EngineError> {
        let mut out = NodeList::new();
        let mut cursor = offset;
        self.walk_at(&mut cursor, &mut out, 0)?;
        Ok(out)
    }

    fn walk_at(
        &self,
        cursor: &mut usize,
        out: &mut NodeList<'a>,
        depth: usize,
    ) -> Result<(), EngineError> {
        let start = *cursor;
        let ctrl = self.byte(cursor)?;

        if u32::from(ctrl >> 5) == DATA_TYPE_POINTER {
            let target = self.read_pointer(cursor, ctrl)?;
            return self.walk_pointer_target(start, target, out, depth);
        }

        let type_id = self.read_type(cursor, ctrl, start)?;
        let size = self.read_size(cursor, ctrl & 0x1F)?;

        if out.len() >= MAX_NODES {
            return Err(bad_data(start, "value expands to too many nodes"));
        }

        match type_id {
            DATA_TYPE_MAP => {
                check_depth(start, depth)?;
                out.push(EntryData::Map { size });
                for _ in 0..size {
                    self.walk_at(cursor, out, depth + 1)?;
                    self.walk_at(cursor, out, depth + 1)?;
                }
            }
            DATA_TYPE_ARRAY => {
                check_depth(start, depth)?;
                out.push(EntryData::Array { size });
                for _ in 0..size {
                    self.walk_at(cursor, out, depth + 1)?;
                }
            }
            DATA_TYPE_UTF8_STRING => {
                out.push(EntryData::Utf8String(self.take(cursor, size as usize)?));
            }
            DATA_TYPE_BYTES => {
                out.push(EntryData::Bytes(self.take(cursor, size as usize)?));
            }
            DATA_TYPE_DOUBLE => {
                if size != 8 {
                    return Err(bad_data(start, format!("double of size {}", size)));
                }
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(self.take(cursor, 8)?);
                out.push(EntryData::Double(f64::from_be_bytes(bytes)));
            }
            DATA_TYPE_FLOAT => {
                if size != 4 {
                    return Err(bad_data(start, format!("float of size {}", size)));
                }
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(self.take(cursor, 4)?);
                out.push(EntryData::Float(f32::from_be_bytes(bytes)));
            }
            DATA_TYPE_UINT16 => {
                let n = self.read_uint(cursor, size, 2, start)?;
                out.push(EntryData::Uint16(n as u16));
            }
            DATA_TYPE_UINT32 => {
                let n = self.read_uint(cursor, size, 4, start)?;
                out.push(EntryData::Uint32(n as u32));
            }
            DATA_TYPE_INT32 => {
                // Short encodings are zero-extended, not sign-extended
                let n = self.read_uint(cursor, size, 4, start)?;
                out.push(EntryData::Int32(n as u32 as i32));
            }
            DATA_TYPE_UINT64 => {
                let n = self.read_uint(cursor, size, 8, start)?;
                out.push(EntryData::Uint64(n as u64));
            }
            DATA_TYPE_UINT128 => {
                let n = self.read_uint(cursor, size, 16, start)?;
                out.push(EntryData::Uint128(RawUint128::native(n.to_be_bytes())));
            }
            DATA_TYPE_BOOLEAN => {
                if size > 1 {
                    return Err(bad_data(start, format!("boolean of size {}", size)));
                }
                out.push(EntryData::Boolean(size == 1));
            }
            other => {
                // Unknown to this engine: skip the payload and let the
                // consumer decide what to do with it.
                self.take(cursor, size as usize)?;
                out.push(EntryData::Other { type_id: other });
            }
        }

        Ok(())
    }

    fn walk_pointer_target(
        &self,
        start: usize,
        target: usize,
        out: &mut NodeList<'a>,
        depth: usize,
    ) -> Result<(), EngineError> {
        let ctrl = *self
            .section
            .get(target)
            .ok_or_else(|| bad_data(start, format!("pointer to {} is out of bounds", target)))?;
        if u32::from(ctrl >> 5) == DATA_TYPE_POINTER {
            return Err(bad_data(start, "pointer points to another pointer"));
        }

        let mut target_cursor = target;
        self.walk_at(&mut target_cursor, out, depth)
    }

    fn read_type(&self, cursor: &mut usize, ctrl: u8, start: usize) -> Result<u32, EngineError> {
        let type_id = u32::from(ctrl >> 5);
        if type_id != DATA_TYPE_EXTENDED {
            return Ok(type_id);
        }

        let extended = u32::from(self.byte(cursor)?) + 7;
        if extended < 8 {
            return Err(bad_data(start, "extended type byte encodes a basic type"));
        }
        Ok(extended)
    }

    fn read_pointer(&self, cursor: &mut usize, ctrl: u8) -> Result<usize, EngineError> {
        let size_bits = (ctrl >> 3) & 0x3;
        let high = u32::from(ctrl & 0x7);
        let bytes = self.take(cursor, usize::from(size_bits) + 1)?;
        let packed = bytes
            .iter()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));

        let offset = match size_bits {
            0 => (high << 8) | packed,
            1 => ((high << 16) | packed) + 2048,
            2 => ((high << 24) | packed) + 526_336,
            _ => packed,
        };
        Ok(offset as usize)
    }

    fn read_size(&self, cursor: &mut usize, size_bits: u8) -> Result<u32, EngineError> {
        let extra = match size_bits {
            0..=28 => return Ok(u32::from(size_bits)),
            29 => 1,
            30 => 2,
            _ => 3,
        };
        let bytes = self.take(cursor, extra)?;
        let n = bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
        Ok(match size_bits {
            29 => 29 + n,
            30 => 285 + n,
            _ => 65_821 + n,
        })
    }

    fn read_uint(
        &self,
        cursor: &mut usize,
        size: u32,
        max: u32,
        start: usize,
    ) -> Result<u128, EngineError> {
        if size > max {
            return Err(bad_data(
                start,
                format!("{}-byte integer field holds {} bytes", max, size),
            ));
        }
        let bytes = self.take(cursor, size as usize)?;
        Ok(bytes.iter().fold(0u128, |acc, &b| (acc << 8) | u128::from(b)))
    }

    fn byte(&self, cursor: &mut usize) -> Result<u8, EngineError> {
        let b = *self
            .section
            .get(*cursor)
            .ok_or_else(|| bad_data(*cursor, "unexpected end of data"))?;
        *cursor += 1;
        Ok(b)
    }

    fn take(&self, cursor: &mut usize, len: usize) -> Result<&'a [u8], EngineError> {
        let section: &'a [u8] = self.section;
        let end = cursor
            .checked_add(len)
            .filter(|&end| end <= section.len())
            .ok_or_else(|| bad_data(*cursor, format!("{} bytes run past the end of data", len)))?;
        let bytes = &section[*cursor..end];
        *cursor = end;
        Ok(bytes)
    }
}

fn check_depth(offset: usize, depth: usize) -> Result<(), EngineError> {
    if depth >= MAX_DATA_DEPTH {
        return Err(bad_data(offset, "exceeded maximum data structure depth"));
    }
    Ok(())
}

fn bad_data(offset: usize, what: impl std::fmt::Display) -> EngineError {
    EngineError::Fault(format!(
        "the data section contains bad data at offset {}: {}",
        offset, what
    ))
}
