//! Open-time configuration

use std::path::Path;

use crate::decoder::DEFAULT_MAX_DEPTH;
use crate::handle::Reader;
use crate::Result;

/// How the database file is brought into memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Memory-map the file
    #[default]
    Mmap,
    /// Read the whole file into an owned buffer
    Memory,
}

/// Builder for opening a [`Reader`]
///
/// ```no_run
/// use mmdb_reader::{OpenMode, OpenOptions};
///
/// let reader = OpenOptions::new()
///     .mode(OpenMode::Memory)
///     .max_depth(64)
///     .open("GeoLite2-City.mmdb")?;
/// # Ok::<(), mmdb_reader::ReaderError>(())
/// ```
#[derive(Debug, Clone)]
pub struct OpenOptions {
    pub(crate) mode: OpenMode,
    pub(crate) max_depth: usize,
}

impl OpenOptions {
    /// Default options: memory-mapped, depth limit 512
    pub fn new() -> Self {
        Self {
            mode: OpenMode::Mmap,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the open mode
    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the decoder nesting limit
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Open a database with these options
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<Reader> {
        Reader::open_with(path, self)
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}
