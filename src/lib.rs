//! mmdb-reader - Read-only access to MaxMind DB files
//!
//! Opens an MMDB file (GeoIP2, GeoLite2 and anything else written in the
//! MaxMind DB format), looks up IP addresses and returns the stored records
//! as nested, dynamically-typed values.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mmdb_reader::{DataValue, Reader};
//!
//! let mut reader = Reader::open("GeoLite2-City.mmdb")?;
//!
//! let metadata = reader.metadata()?;
//! println!("{} ({} nodes)", metadata.database_type, metadata.node_count);
//!
//! if let Some(record) = reader.get("81.2.69.160")? {
//!     let city = record.get_path(&["city", "names", "en"]);
//!     println!("city: {:?}", city.and_then(DataValue::as_str));
//! }
//!
//! reader.close()?;
//! # Ok::<(), mmdb_reader::ReaderError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  lookup(ip)   ┌──────────────┐
//! │    Reader    │ ────────────> │    Engine    │  search tree, data section,
//! │ (open/closed)│ <──────────── │   (mmap'd)   │  pointers, control bytes
//! └──────────────┘   NodeList    └──────────────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Decoder    │  pre-order NodeList -> DataValue
//! └──────────────┘
//! ```
//!
//! The engine never builds nested values; it flattens an entry into a
//! [`NodeList`] whose strings borrow from the mapped file. The [`Decoder`]
//! rebuilds the tree in one linear pass. Metadata goes through the same path
//! and is then projected onto the fixed [`Metadata`] record.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Flattened-entry → value reconstruction
pub mod decoder;
/// Error types for reader operations
pub mod error;
/// Database handle lifecycle
pub mod handle;
/// Database metadata
pub mod metadata;
/// Node list types produced by the engine
pub mod node;
/// Open-time configuration
pub mod options;
/// Decoded values
pub mod value;

/// MMDB format implementation (internal)
mod engine;
mod lookup;

pub use crate::decoder::{decode_node_list, Decoder, DEFAULT_MAX_DEPTH};
pub use crate::error::{DecodeError, ReaderError, Result};
pub use crate::handle::Reader;
pub use crate::metadata::Metadata;
pub use crate::node::{EntryData, NodeList, RawUint128};
pub use crate::options::{OpenMode, OpenOptions};
pub use crate::value::{DataMap, DataValue};

/// The handle type under its descriptive name
pub type DatabaseHandle = Reader;

/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
