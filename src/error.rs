//! Error types for the reader
//!
//! Two layers: [`DecodeError`] for faults found while rebuilding a value from
//! a node list, and [`ReaderError`] for everything a caller of
//! [`Reader`](crate::Reader) can see.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for reader operations
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Errors raised while turning a node list into a [`DataValue`](crate::DataValue)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A map key node was not a UTF-8 string
    #[error("map key is not a string (found data type {type_id})")]
    MalformedKey {
        /// Data type of the offending key node
        type_id: u32,
    },

    /// The node carries a data type the decoder does not understand
    #[error("invalid data type: {0}")]
    UnknownType(u32),

    /// Nesting exceeded the configured limit
    #[error("data structure nested deeper than {limit} levels")]
    TooDeep {
        /// The depth limit that was exceeded
        limit: usize,
    },

    /// A container declared more children than the node list holds
    #[error("node list ended at position {position}, a container declared more children")]
    UnexpectedEnd {
        /// Cursor position where input ran out
        position: usize,
    },

    /// A string node held bytes that are not valid UTF-8
    #[error("string value is not valid UTF-8")]
    InvalidUtf8,

    /// Nodes were left over after the top-level value
    #[error("{0} node(s) left over after the decoded value")]
    TrailingNodes(usize),

    /// The decoded value had to be a map
    #[error("expected a map, found {found}")]
    NotAMap {
        /// Kind of value that was found instead
        found: &'static str,
    },
}

/// Main error type for reader operations
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The database file does not exist or cannot be read
    #[error("the file \"{}\" does not exist or is not readable: {source}", path.display())]
    NotReadable {
        /// Path that was passed to open
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The file was readable but is not a valid MaxMind DB
    #[error("error opening database file ({origin}), is this a valid MaxMind DB file? {detail}")]
    InvalidFormat {
        /// Path or "<memory>" for in-memory images
        origin: String,
        /// Why the engine rejected the file
        detail: String,
    },

    /// An operation was attempted on a closed handle
    #[error("attempt to read from a closed MaxMind DB")]
    ClosedHandle,

    /// `close` was called on a handle that is already closed
    #[error("attempt to close a closed MaxMind DB")]
    AlreadyClosed,

    /// The lookup text is not an IP address
    #[error("the value \"{0}\" is not a valid IP address")]
    InvalidAddress(String),

    /// The address family cannot be searched in this database
    #[error("error looking up {0}: an IPv6 address cannot be looked up in an IPv4-only database")]
    AddressFamilyMismatch(String),

    /// The engine hit corrupt or unreadable data
    #[error("error looking up {address}: {message}")]
    EngineFault {
        /// Address being looked up, or "metadata"
        address: String,
        /// Engine diagnostic
        message: String,
    },

    /// A node list could not be rebuilt into a value
    #[error("error decoding data: {0}")]
    Decode(#[from] DecodeError),

    /// A required metadata field is missing or has the wrong shape
    #[error("error decoding metadata: field '{field}' {detail}")]
    IncompleteMetadata {
        /// Name of the first field that failed
        field: &'static str,
        /// What was wrong with it
        detail: String,
    },
}

impl ReaderError {
    /// True for errors caused by how the reader was used rather than by the file
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ReaderError::ClosedHandle
                | ReaderError::AlreadyClosed
                | ReaderError::InvalidAddress(_)
                | ReaderError::AddressFamilyMismatch(_)
        )
    }

    /// True for errors that mean the database itself is unusable or corrupt
    pub fn is_database_error(&self) -> bool {
        matches!(
            self,
            ReaderError::InvalidFormat { .. }
                | ReaderError::EngineFault { .. }
                | ReaderError::Decode(_)
                | ReaderError::IncompleteMetadata { .. }
        )
    }

    pub(crate) fn missing_field(field: &'static str) -> Self {
        ReaderError::IncompleteMetadata {
            field,
            detail: "is missing".to_string(),
        }
    }

    pub(crate) fn bad_field(field: &'static str, detail: impl Into<String>) -> Self {
        ReaderError::IncompleteMetadata {
            field,
            detail: detail.into(),
        }
    }
}
