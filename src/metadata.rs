//! Database metadata
//!
//! The metadata map is decoded like any other value and then projected onto
//! a fixed record. All nine fields are required; the projection either
//! succeeds completely or names the first field that failed.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::debug;

use crate::decoder::Decoder;
use crate::error::{DecodeError, ReaderError, Result};
use crate::handle::Reader;
use crate::value::{DataMap, DataValue};

/// Validated metadata record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Major version of the binary format
    pub binary_format_major_version: u16,
    /// Minor version of the binary format
    pub binary_format_minor_version: u16,
    /// Build time, seconds since the Unix epoch
    pub build_epoch: u64,
    /// Database type, e.g. "GeoIP2-City"
    pub database_type: String,
    /// Descriptions keyed by language code
    pub description: BTreeMap<String, String>,
    /// 4 or 6
    pub ip_version: u16,
    /// Locale codes the records may contain
    pub languages: Vec<String>,
    /// Number of nodes in the search tree
    pub node_count: u32,
    /// Record size in bits
    pub record_size: u16,
}

impl Metadata {
    /// Project a decoded metadata map
    pub fn from_map(map: &DataMap) -> Result<Self> {
        let binary_format_major_version = uint_field(map, "binary_format_major_version")?;
        let binary_format_minor_version = uint_field(map, "binary_format_minor_version")?;
        let build_epoch = uint_field(map, "build_epoch")?;
        let database_type = string_field(map, "database_type")?;
        let description = description_field(map)?;

        let ip_version: u16 = uint_field(map, "ip_version")?;
        if ip_version != 4 && ip_version != 6 {
            return Err(ReaderError::bad_field(
                "ip_version",
                format!("must be 4 or 6, found {}", ip_version),
            ));
        }

        let languages = languages_field(map)?;
        let node_count = uint_field(map, "node_count")?;
        let record_size = uint_field(map, "record_size")?;

        Ok(Metadata {
            binary_format_major_version,
            binary_format_minor_version,
            build_epoch,
            database_type,
            description,
            ip_version,
            languages,
            node_count,
            record_size,
        })
    }

    /// Build time as a [`SystemTime`]
    pub fn build_time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.build_epoch)
    }

    /// Description in one language
    pub fn description_for(&self, lang: &str) -> Option<&str> {
        self.description.get(lang).map(String::as_str)
    }
}

impl TryFrom<DataValue> for Metadata {
    type Error = ReaderError;

    fn try_from(value: DataValue) -> Result<Self> {
        match value {
            DataValue::Map(map) => Metadata::from_map(&map),
            other => Err(DecodeError::NotAMap {
                found: other.kind(),
            }
            .into()),
        }
    }
}

impl Reader {
    /// Decode and validate the database metadata
    pub fn metadata(&self) -> Result<Metadata> {
        let engine = self.engine()?;
        let nodes = engine
            .metadata_node_list()
            .map_err(|e| ReaderError::EngineFault {
                address: "metadata".to_string(),
                message: e.to_string(),
            })?;
        let value = Decoder::new(nodes.as_slice())
            .with_max_depth(self.max_depth())
            .decode_all()?;

        let metadata = Metadata::try_from(value)?;
        debug!(
            database_type = %metadata.database_type,
            node_count = metadata.node_count,
            "decoded metadata"
        );
        Ok(metadata)
    }
}

fn uint_field<T: TryFrom<u64>>(map: &DataMap, field: &'static str) -> Result<T> {
    let value = map.get(field).ok_or_else(|| ReaderError::missing_field(field))?;
    let n = value.as_u64().ok_or_else(|| {
        ReaderError::bad_field(
            field,
            format!("must be an unsigned integer, found {}", value.kind()),
        )
    })?;
    T::try_from(n).map_err(|_| ReaderError::bad_field(field, format!("value {} is out of range", n)))
}

fn string_field(map: &DataMap, field: &'static str) -> Result<String> {
    let value = map.get(field).ok_or_else(|| ReaderError::missing_field(field))?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ReaderError::bad_field(field, format!("must be a string, found {}", value.kind())))
}

fn description_field(map: &DataMap) -> Result<BTreeMap<String, String>> {
    const FIELD: &str = "description";
    let value = map.get(FIELD).ok_or_else(|| ReaderError::missing_field(FIELD))?;
    let entries = value.as_map().ok_or_else(|| {
        ReaderError::bad_field(FIELD, format!("must be a map, found {}", value.kind()))
    })?;

    entries
        .iter()
        .map(|(lang, text)| match text.as_str() {
            Some(text) => Ok((lang.to_string(), text.to_string())),
            None => Err(ReaderError::bad_field(
                FIELD,
                format!("entry '{}' must be a string, found {}", lang, text.kind()),
            )),
        })
        .collect()
}

fn languages_field(map: &DataMap) -> Result<Vec<String>> {
    const FIELD: &str = "languages";
    let value = map.get(FIELD).ok_or_else(|| ReaderError::missing_field(FIELD))?;
    let items = value.as_array().ok_or_else(|| {
        ReaderError::bad_field(FIELD, format!("must be an array, found {}", value.kind()))
    })?;

    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                ReaderError::bad_field(FIELD, format!("items must be strings, found {}", item.kind()))
            })
        })
        .collect()
}
