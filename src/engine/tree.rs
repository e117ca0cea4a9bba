//! MMDB Search Tree Traversal
//!
//! Each node holds two records, one per bit value. A record is one of:
//! - another node index (`< node_count`), keep walking
//! - `node_count` exactly, no data for this network
//! - a data pointer (`> node_count`)

use std::net::IpAddr;

use super::format::MmdbHeader;
use super::types::{EngineError, IpVersion, RecordSize, DATA_SECTION_SEPARATOR_SIZE};

/// Bits of zero prefix in front of IPv4 space in an IPv6 tree
const IPV4_SUBTREE_DEPTH: usize = 96;

/// Location of an entry in the data section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRef {
    /// Offset relative to the data section start
    pub(crate) offset: usize,
}

impl EntryRef {
    /// Offset of the entry within the data section
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Outcome of a tree walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLookup {
    /// The entry for the matched network, if any
    pub entry: Option<EntryRef>,
    /// Prefix length of the network, in the address's own family
    pub prefix_len: u8,
}

/// Search tree for IP address lookups
pub struct SearchTree<'a> {
    data: &'a [u8],
    header: &'a MmdbHeader,
}

impl<'a> SearchTree<'a> {
    /// Create a search tree over the whole file image
    pub fn new(data: &'a [u8], header: &'a MmdbHeader) -> Self {
        Self { data, header }
    }

    /// Walk the tree for `ip`
    pub fn lookup(&self, ip: IpAddr) -> Result<TreeLookup, EngineError> {
        let mut bytes = [0u8; 16];
        let (bit_count, start_node, start_depth) = match (ip, self.header.ip_version) {
            (IpAddr::V4(addr), IpVersion::V4) => {
                bytes[..4].copy_from_slice(&addr.octets());
                (self.header.ip_version.bit_count(), 0, 0)
            }
            (IpAddr::V4(addr), IpVersion::V6) => {
                bytes[..4].copy_from_slice(&addr.octets());
                let (node, depth) = self.ipv4_start_node()?;
                (32, node, depth)
            }
            (IpAddr::V6(addr), IpVersion::V6) => {
                bytes = addr.octets();
                (self.header.ip_version.bit_count(), 0, 0)
            }
            (IpAddr::V6(_), IpVersion::V4) => return Err(EngineError::FamilyMismatch),
        };

        let node_count = self.header.node_count;
        let mut node = start_node;
        let mut depth = 0;
        while depth < bit_count && node < node_count {
            let bit = (bytes[depth >> 3] >> (7 - (depth & 7))) & 1;
            node = self.read_record(node, bit)?;
            depth += 1;
        }

        // Depth along the tree, then reported in the address's own terms
        let tree_depth = start_depth + depth;
        let prefix_len = match ip {
            IpAddr::V4(_) if self.header.ip_version == IpVersion::V6 => {
                tree_depth.saturating_sub(IPV4_SUBTREE_DEPTH)
            }
            _ => tree_depth,
        } as u8;

        if node == node_count {
            return Ok(TreeLookup {
                entry: None,
                prefix_len,
            });
        }
        if node < node_count {
            return Err(EngineError::Fault(format!(
                "invalid search tree: still at node {} after {} bits",
                node, tree_depth
            )));
        }

        let offset = self.data_offset(node)?;
        Ok(TreeLookup {
            entry: Some(EntryRef { offset }),
            prefix_len,
        })
    }

    /// Node reached by following 96 zero bits, and how deep it is
    ///
    /// Stops early if the walk leaves the tree before 96 bits.
    fn ipv4_start_node(&self) -> Result<(u32, usize), EngineError> {
        let mut node = 0u32;
        let mut depth = 0;
        while depth < IPV4_SUBTREE_DEPTH && node < self.header.node_count {
            node = self.read_record(node, 0)?;
            depth += 1;
        }
        Ok((node, depth))
    }

    /// Read one record of a node
    fn read_record(&self, node: u32, side: u8) -> Result<u32, EngineError> {
        let node_bytes = self.header.record_size.node_bytes();
        let offset = node as usize * node_bytes;
        let bytes = self
            .data
            .get(offset..offset + node_bytes)
            .filter(|_| offset + node_bytes <= self.header.tree_size)
            .ok_or_else(|| {
                EngineError::Fault(format!(
                    "invalid search tree: node {} is outside the tree",
                    node
                ))
            })?;

        let be = |b: &[u8]| b.iter().fold(0u32, |acc, &x| (acc << 8) | u32::from(x));
        Ok(match (self.header.record_size, side) {
            (RecordSize::Bits24, 0) => be(&bytes[0..3]),
            (RecordSize::Bits24, _) => be(&bytes[3..6]),
            (RecordSize::Bits28, 0) => (u32::from(bytes[3] & 0xF0) << 20) | be(&bytes[0..3]),
            (RecordSize::Bits28, _) => (u32::from(bytes[3] & 0x0F) << 24) | be(&bytes[4..7]),
            (RecordSize::Bits32, 0) => be(&bytes[0..4]),
            (RecordSize::Bits32, _) => be(&bytes[4..8]),
        })
    }

    /// Turn a data record into an offset within the data section
    fn data_offset(&self, record: u32) -> Result<usize, EngineError> {
        let offset = (record - self.header.node_count) as usize;
        let section_len = self.header.data_section.len();
        offset
            .checked_sub(DATA_SECTION_SEPARATOR_SIZE)
            .filter(|&o| o < section_len)
            .ok_or_else(|| {
                EngineError::Fault(format!(
                    "invalid search tree: record {} points outside the data section",
                    record
                ))
            })
    }
}
