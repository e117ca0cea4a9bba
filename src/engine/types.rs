//! MMDB-specific type definitions

use std::fmt;
use std::io;

/// MMDB metadata marker: "\xAB\xCD\xEFMaxMind.com"
pub const METADATA_MARKER: &[u8] = b"\xAB\xCD\xEFMaxMind.com";

/// Size of the zero-filled separator between search tree and data section
pub const DATA_SECTION_SEPARATOR_SIZE: usize = 16;

/// Major binary format version this engine reads
pub const SUPPORTED_MAJOR_VERSION: u64 = 2;

/// Maximum nesting the engine follows while flattening data
pub const MAX_DATA_DEPTH: usize = 512;

/// Engine-level failures
///
/// The handle translates these into [`ReaderError`](crate::ReaderError).
#[derive(Debug)]
pub enum EngineError {
    /// The file could not be opened or mapped
    FileNotFound(io::Error),
    /// The bytes are not a MaxMind DB
    BadFormat(String),
    /// The lookup text is not an IP address
    InvalidAddress,
    /// IPv6 lookup in an IPv4-only tree
    FamilyMismatch,
    /// Corrupt search tree or data section
    Fault(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::FileNotFound(e) => write!(f, "cannot open file: {}", e),
            EngineError::BadFormat(msg) => write!(f, "invalid MMDB format: {}", msg),
            EngineError::InvalidAddress => write!(f, "invalid IP address"),
            EngineError::FamilyMismatch => {
                write!(f, "IPv6 address looked up in an IPv4-only database")
            }
            EngineError::Fault(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::FileNotFound(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for EngineError {
    fn from(err: io::Error) -> Self {
        EngineError::FileNotFound(err)
    }
}

/// IP version of the search tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    /// IPv4 only
    V4,
    /// IPv6 (may include IPv4 under ::/96)
    V6,
}

impl IpVersion {
    /// Tree depth in bits
    pub fn bit_count(self) -> usize {
        match self {
            IpVersion::V4 => 32,
            IpVersion::V6 => 128,
        }
    }
}

/// Record size in bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSize {
    /// 24-bit records (3 bytes per record, 6 bytes per node)
    Bits24 = 24,
    /// 28-bit records (3.5 bytes per record, 7 bytes per node)
    Bits28 = 28,
    /// 32-bit records (4 bytes per record, 8 bytes per node)
    Bits32 = 32,
}

impl RecordSize {
    /// Get the size of a node (2 records) in bytes
    pub fn node_bytes(self) -> usize {
        match self {
            RecordSize::Bits24 => 6,
            RecordSize::Bits28 => 7,
            RecordSize::Bits32 => 8,
        }
    }

    /// Create from bit size
    pub fn from_bits(bits: u64) -> Result<Self, EngineError> {
        match bits {
            24 => Ok(RecordSize::Bits24),
            28 => Ok(RecordSize::Bits28),
            32 => Ok(RecordSize::Bits32),
            _ => Err(EngineError::BadFormat(format!(
                "unsupported record size: {} bits",
                bits
            ))),
        }
    }
}
