//! MaxMind DB (MMDB) engine
//!
//! Owns the file image and knows the binary format. It answers two
//! questions: where is the entry for an address, and what nodes make up an
//! entry (or the metadata). Turning nodes into values is the decoder's job.
//!
//! ## Architecture
//!
//! - **types**: constants, `EngineError`, tree parameters
//! - **format**: section layout and the header fields needed for lookups
//! - **tree**: search tree traversal
//! - **walker**: data section flattening into a [`NodeList`]

pub mod format;
pub mod tree;
pub mod types;
pub mod walker;

use std::fs::File;
use std::io::Read;
use std::net::IpAddr;
use std::path::Path;

use memmap2::Mmap;

use crate::node::NodeList;
use crate::options::OpenMode;

use format::MmdbHeader;
use tree::SearchTree;
use walker::DataWalker;

pub use tree::{EntryRef, TreeLookup};
pub use types::EngineError;

/// Backing bytes, either owned or memory-mapped
enum Storage {
    Owned(Vec<u8>),
    Mmap(Mmap),
}

impl Storage {
    fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Owned(v) => v.as_slice(),
            Storage::Mmap(m) => &m[..],
        }
    }
}

/// An opened MMDB image with its parsed layout
pub struct Engine {
    storage: Storage,
    header: MmdbHeader,
}

impl Engine {
    /// Open a database file
    pub fn open(path: &Path, mode: OpenMode) -> Result<Self, EngineError> {
        let mut file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(EngineError::BadFormat("file is empty".to_string()));
        }

        let storage = match mode {
            // SAFETY: the mapping is read-only and every access is bounds
            // checked against the mapped length.
            OpenMode::Mmap => Storage::Mmap(unsafe { Mmap::map(&file) }?),
            OpenMode::Memory => {
                let mut buf = Vec::new();
                file.read_to_end(&mut buf)?;
                Storage::Owned(buf)
            }
        };

        Self::from_storage(storage)
    }

    /// Open an in-memory image
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, EngineError> {
        Self::from_storage(Storage::Owned(data))
    }

    fn from_storage(storage: Storage) -> Result<Self, EngineError> {
        let header = MmdbHeader::from_file(storage.as_slice())?;
        Ok(Self { storage, header })
    }

    /// Look up an address given as text
    pub fn lookup(&self, ip_text: &str) -> Result<TreeLookup, EngineError> {
        let ip: IpAddr = ip_text.parse().map_err(|_| EngineError::InvalidAddress)?;
        self.lookup_addr(ip)
    }

    /// Look up a parsed address
    pub fn lookup_addr(&self, ip: IpAddr) -> Result<TreeLookup, EngineError> {
        SearchTree::new(self.storage.as_slice(), &self.header).lookup(ip)
    }

    /// Flatten the entry a lookup returned
    pub fn entry_node_list(&self, entry: EntryRef) -> Result<NodeList<'_>, EngineError> {
        DataWalker::new(self.data_section()).flatten(entry.offset)
    }

    /// Flatten the metadata map
    pub fn metadata_node_list(&self) -> Result<NodeList<'_>, EngineError> {
        let data = self.storage.as_slice();
        DataWalker::new(&data[self.header.metadata_start..]).flatten(0)
    }

    /// Release the image
    pub fn close(self) {
        drop(self);
    }

    fn data_section(&self) -> &[u8] {
        &self.storage.as_slice()[self.header.data_section.clone()]
    }
}
