//! MMDB Binary Format Parsing
//!
//! Only the fields needed for lookups are pulled out of the metadata here:
//! format version, node count, record size, IP version. The full metadata
//! record is decoded on demand by the handle.
//!
//! File layout:
//!
//! ```text
//! [search tree][16 zero bytes][data section]["\xAB\xCD\xEFMaxMind.com"][metadata]
//! ```

use std::ops::Range;

use memchr::memmem;

use super::types::{
    EngineError, IpVersion, RecordSize, DATA_SECTION_SEPARATOR_SIZE, METADATA_MARKER,
    SUPPORTED_MAJOR_VERSION,
};
use super::walker::DataWalker;
use crate::node::{EntryData, NodeList};

/// The marker must appear within this many bytes of the end of the file
const METADATA_SEARCH_WINDOW: usize = 128 * 1024;

/// Section layout and tree parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmdbHeader {
    /// Number of nodes in the search tree
    pub node_count: u32,
    /// Record size in bits (24, 28, or 32)
    pub record_size: RecordSize,
    /// IP version (4 or 6)
    pub ip_version: IpVersion,
    /// Size of the search tree in bytes
    pub tree_size: usize,
    /// Byte range of the data section
    pub data_section: Range<usize>,
    /// Offset of the first metadata byte (just past the marker)
    pub metadata_start: usize,
}

impl MmdbHeader {
    /// Locate the sections of an MMDB file and read the tree parameters
    pub fn from_file(data: &[u8]) -> Result<Self, EngineError> {
        let marker_offset = find_metadata_marker(data)?;
        let metadata_start = marker_offset + METADATA_MARKER.len();

        let nodes = DataWalker::new(&data[metadata_start..])
            .flatten(0)
            .map_err(|e| EngineError::BadFormat(format!("unreadable metadata: {}", e)))?;
        if !matches!(nodes.as_slice().first(), Some(EntryData::Map { .. })) {
            return Err(EngineError::BadFormat("metadata is not a map".to_string()));
        }

        let major = metadata_uint(&nodes, "binary_format_major_version")?;
        if major != SUPPORTED_MAJOR_VERSION {
            return Err(EngineError::BadFormat(format!(
                "unsupported binary format major version {}",
                major
            )));
        }

        let node_count = metadata_uint(&nodes, "node_count")?;
        let node_count = u32::try_from(node_count).map_err(|_| {
            EngineError::BadFormat(format!("node count {} is too large", node_count))
        })?;
        let record_size = RecordSize::from_bits(metadata_uint(&nodes, "record_size")?)?;
        let ip_version = match metadata_uint(&nodes, "ip_version")? {
            4 => IpVersion::V4,
            6 => IpVersion::V6,
            other => {
                return Err(EngineError::BadFormat(format!(
                    "invalid IP version: {}",
                    other
                )))
            }
        };

        let tree_size = (node_count as usize)
            .checked_mul(record_size.node_bytes())
            .ok_or_else(|| EngineError::BadFormat("search tree size overflows".to_string()))?;
        let data_start = tree_size + DATA_SECTION_SEPARATOR_SIZE;
        if data_start > marker_offset {
            return Err(EngineError::BadFormat(format!(
                "search tree of {} bytes does not fit before the metadata at {}",
                tree_size, marker_offset
            )));
        }

        Ok(MmdbHeader {
            node_count,
            record_size,
            ip_version,
            tree_size,
            data_section: data_start..marker_offset,
            metadata_start,
        })
    }
}

/// Find the last metadata marker in the final 128KiB of the file
pub fn find_metadata_marker(data: &[u8]) -> Result<usize, EngineError> {
    let search_start = data.len().saturating_sub(METADATA_SEARCH_WINDOW);
    memmem::rfind(&data[search_start..], METADATA_MARKER)
        .map(|pos| search_start + pos)
        .ok_or_else(|| EngineError::BadFormat("metadata section not found".to_string()))
}

/// Unsigned integer member of the top-level metadata map
///
/// Scans keys without decoding values. A repeated key resolves to its last
/// occurrence, the same as the decoder.
fn metadata_uint(nodes: &NodeList<'_>, key: &str) -> Result<u64, EngineError> {
    let slice = nodes.as_slice();
    let size = match slice.first() {
        Some(EntryData::Map { size }) => *size,
        _ => return Err(EngineError::BadFormat("metadata is not a map".to_string())),
    };

    let mut found = None;
    let mut index = 1;
    for _ in 0..size {
        let value_index = index + 1;
        if let Some(EntryData::Utf8String(k)) = slice.get(index) {
            if *k == key.as_bytes() {
                found = slice.get(value_index);
            }
        }
        index = nodes
            .skip_subtree(value_index)
            .ok_or_else(|| EngineError::BadFormat("truncated metadata".to_string()))?;
    }

    match found {
        Some(EntryData::Uint16(n)) => Ok(u64::from(*n)),
        Some(EntryData::Uint32(n)) => Ok(u64::from(*n)),
        Some(EntryData::Uint64(n)) => Ok(*n),
        Some(EntryData::Uint128(raw)) => u64::try_from(u128::from_be_bytes(raw.to_be_bytes()))
            .map_err(|_| EngineError::BadFormat(format!("field '{}' is out of range", key))),
        Some(_) => Err(EngineError::BadFormat(format!(
            "field '{}' is not an unsigned integer",
            key
        ))),
        None => Err(EngineError::BadFormat(format!(
            "required field '{}' not found",
            key
        ))),
    }
}
