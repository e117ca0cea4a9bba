//! Decoded values
//!
//! [`DataValue`] covers every MMDB data type that can appear in a record.
//! Pointers never show up here; the engine resolves them while flattening.
//! Maps keep their keys in decode order, which is what a reader of a GeoIP
//! record expects to see when the value is printed.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Ordered map with unique string keys
///
/// Inserting an existing key replaces its value in place, so the key keeps
/// the position of its first occurrence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataMap {
    entries: Vec<(String, DataValue)>,
}

impl DataMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create an empty map with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Wrap entries whose keys are already known to be unique
    pub(crate) fn from_unique_entries(entries: Vec<(String, DataValue)>) -> Self {
        Self { entries }
    }

    /// Insert or replace, returning the previous value for `key`
    pub fn insert(&mut self, key: impl Into<String>, value: DataValue) -> Option<DataValue> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// True if `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove a key, preserving the order of the rest
    pub fn remove(&mut self, key: &str) -> Option<DataValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl FromIterator<(String, DataValue)> for DataMap {
    fn from_iter<I: IntoIterator<Item = (String, DataValue)>>(iter: I) -> Self {
        let mut map = DataMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for DataMap {
    type Item = (String, DataValue);
    type IntoIter = std::vec::IntoIter<(String, DataValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A decoded MMDB value
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Key-value map (MMDB keys are always strings)
    Map(DataMap),
    /// Array of values
    Array(Vec<DataValue>),
    /// UTF-8 string
    String(String),
    /// Raw byte array
    Bytes(Vec<u8>),
    /// IEEE 754 double precision float
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
    Uint128(u128),
    /// Signed 32-bit integer
    Int32(i32),
    /// Boolean value
    Bool(bool),
}

impl DataValue {
    /// Short name of the variant, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            DataValue::Map(_) => "map",
            DataValue::Array(_) => "array",
            DataValue::String(_) => "string",
            DataValue::Bytes(_) => "bytes",
            DataValue::Double(_) => "double",
            DataValue::Float(_) => "float",
            DataValue::Uint16(_) => "uint16",
            DataValue::Uint32(_) => "uint32",
            DataValue::Uint64(_) => "uint64",
            DataValue::Uint128(_) => "uint128",
            DataValue::Int32(_) => "int32",
            DataValue::Bool(_) => "boolean",
        }
    }

    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Any non-negative integer that fits in a u64
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            DataValue::Uint16(n) => Some(u64::from(n)),
            DataValue::Uint32(n) => Some(u64::from(n)),
            DataValue::Uint64(n) => Some(n),
            DataValue::Uint128(n) => u64::try_from(n).ok(),
            DataValue::Int32(n) => u64::try_from(n).ok(),
            _ => None,
        }
    }

    /// Map contents, if this is a map
    pub fn as_map(&self) -> Option<&DataMap> {
        match self {
            DataValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Array contents, if this is an array
    pub fn as_array(&self) -> Option<&[DataValue]> {
        match self {
            DataValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Map member lookup; `None` for non-maps
    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.as_map()?.get(key)
    }

    /// Follow a path of map keys and array indices
    ///
    /// ```
    /// use mmdb_reader::{DataMap, DataValue};
    ///
    /// let mut names = DataMap::new();
    /// names.insert("en", DataValue::String("Germany".into()));
    /// let mut country = DataMap::new();
    /// country.insert("names", DataValue::Map(names));
    /// let mut record = DataMap::new();
    /// record.insert("country", DataValue::Map(country));
    /// let record = DataValue::Map(record);
    ///
    /// let name = record.get_path(&["country", "names", "en"]);
    /// assert_eq!(name.and_then(DataValue::as_str), Some("Germany"));
    /// ```
    pub fn get_path(&self, path: &[&str]) -> Option<&DataValue> {
        let mut value = self;
        for segment in path {
            value = match value {
                DataValue::Map(m) => m.get(segment)?,
                DataValue::Array(a) => a.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(value)
    }
}

impl Serialize for DataMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Serialize for DataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DataValue::Map(m) => m.serialize(serializer),
            DataValue::Array(a) => {
                let mut seq = serializer.serialize_seq(Some(a.len()))?;
                for item in a {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            DataValue::String(s) => serializer.serialize_str(s),
            DataValue::Bytes(b) => {
                let mut seq = serializer.serialize_seq(Some(b.len()))?;
                for byte in b {
                    seq.serialize_element(byte)?;
                }
                seq.end()
            }
            DataValue::Double(d) => serializer.serialize_f64(*d),
            DataValue::Float(f) => serializer.serialize_f32(*f),
            DataValue::Uint16(n) => serializer.serialize_u16(*n),
            DataValue::Uint32(n) => serializer.serialize_u32(*n),
            DataValue::Uint64(n) => serializer.serialize_u64(*n),
            DataValue::Uint128(n) => serializer.serialize_u128(*n),
            DataValue::Int32(n) => serializer.serialize_i32(*n),
            DataValue::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}
