//! Test-only MaxMind DB writer
//!
//! Produces small but complete MMDB images: search tree, separator, data
//! section, marker and metadata. Map keys are interned, so repeated keys are
//! written as pointers the way real databases are. Supports 24, 28 and 32-bit
//! records and IPv4 or IPv6 trees.

#![allow(dead_code)]

use mmdb_reader::{DataMap, DataValue};
use std::collections::HashMap;
use std::io::Write;
use std::net::IpAddr;
use tempfile::NamedTempFile;

pub const METADATA_MARKER: &[u8] = b"\xAB\xCD\xEFMaxMind.com";

/// Data section encoder with key interning and value deduplication
pub struct DataEncoder {
    buffer: Vec<u8>,
    keys: HashMap<String, u32>,
    values: HashMap<String, u32>,
}

impl DataEncoder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            keys: HashMap::new(),
            values: HashMap::new(),
        }
    }

    /// Encode a top-level value and return its offset
    ///
    /// Identical values share one offset.
    pub fn encode(&mut self, value: &DataValue) -> u32 {
        let fingerprint = format!("{:?}", value);
        if let Some(&offset) = self.values.get(&fingerprint) {
            return offset;
        }
        let offset = self.buffer.len() as u32;
        self.write_value(value);
        self.values.insert(fingerprint, offset);
        offset
    }

    /// Append pre-encoded bytes and return their offset
    pub fn raw(&mut self, bytes: &[u8]) -> u32 {
        let offset = self.buffer.len() as u32;
        self.buffer.extend_from_slice(bytes);
        offset
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    fn write_value(&mut self, value: &DataValue) {
        match value {
            DataValue::Map(m) => {
                self.control(7, m.len());
                for (k, v) in m.iter() {
                    self.write_key(k);
                    self.write_value(v);
                }
            }
            DataValue::Array(a) => {
                self.control(11, a.len());
                for v in a {
                    self.write_value(v);
                }
            }
            DataValue::String(s) => {
                self.control(2, s.len());
                self.buffer.extend_from_slice(s.as_bytes());
            }
            DataValue::Bytes(b) => {
                self.control(4, b.len());
                self.buffer.extend_from_slice(b);
            }
            DataValue::Double(d) => {
                self.control(3, 8);
                self.buffer.extend_from_slice(&d.to_be_bytes());
            }
            DataValue::Float(f) => {
                self.control(15, 4);
                self.buffer.extend_from_slice(&f.to_be_bytes());
            }
            DataValue::Uint16(n) => self.uint(5, u128::from(*n)),
            DataValue::Uint32(n) => self.uint(6, u128::from(*n)),
            DataValue::Uint64(n) => self.uint(9, u128::from(*n)),
            DataValue::Uint128(n) => self.uint(10, *n),
            DataValue::Int32(n) if *n >= 0 => self.uint(8, *n as u128),
            DataValue::Int32(n) => {
                self.control(8, 4);
                self.buffer.extend_from_slice(&n.to_be_bytes());
            }
            DataValue::Bool(b) => self.control(14, usize::from(*b)),
        }
    }

    fn write_key(&mut self, key: &str) {
        if let Some(&offset) = self.keys.get(key) {
            self.pointer(offset);
            return;
        }
        self.keys.insert(key.to_string(), self.buffer.len() as u32);
        self.control(2, key.len());
        self.buffer.extend_from_slice(key.as_bytes());
    }

    // Minimal-length big-endian payload
    fn uint(&mut self, type_id: u8, n: u128) {
        let bytes = n.to_be_bytes();
        let skip = bytes.iter().take_while(|&&b| b == 0).count();
        self.control(type_id, 16 - skip);
        self.buffer.extend_from_slice(&bytes[skip..]);
    }

    fn pointer(&mut self, offset: u32) {
        if offset < 2048 {
            self.buffer.push(0x20 | ((offset >> 8) & 0x7) as u8);
            self.buffer.push(offset as u8);
        } else if offset < 526_336 {
            let v = offset - 2048;
            self.buffer.push(0x28 | ((v >> 16) & 0x7) as u8);
            self.buffer.extend_from_slice(&v.to_be_bytes()[2..]);
        } else if offset < 134_744_064 {
            let v = offset - 526_336;
            self.buffer.push(0x30 | ((v >> 24) & 0x7) as u8);
            self.buffer.extend_from_slice(&v.to_be_bytes()[1..]);
        } else {
            self.buffer.push(0x38);
            self.buffer.extend_from_slice(&offset.to_be_bytes());
        }
    }

    /// Control byte(s) for a type and size
    fn control(&mut self, type_id: u8, size: usize) {
        let (bits, extra) = size_bits(size);
        if type_id <= 7 {
            self.buffer.push((type_id << 5) | bits);
        } else {
            self.buffer.push(bits);
            self.buffer.push(type_id - 7);
        }
        self.buffer.extend_from_slice(&extra);
    }
}

fn size_bits(size: usize) -> (u8, Vec<u8>) {
    if size < 29 {
        (size as u8, Vec::new())
    } else if size < 285 {
        (29, vec![(size - 29) as u8])
    } else if size < 65_821 {
        (30, ((size - 285) as u16).to_be_bytes().to_vec())
    } else {
        (31, ((size - 65_821) as u32).to_be_bytes()[1..].to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Empty,
    Node(usize),
    Data { offset: u32, prefix_len: usize },
}

/// Binary trie over address bits
struct TreeBuilder {
    nodes: Vec<[Slot; 2]>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            nodes: vec![[Slot::Empty; 2]],
        }
    }

    fn insert(&mut self, bytes: &[u8; 16], prefix_len: usize, offset: u32) {
        assert!(prefix_len >= 1, "the tree root cannot hold data");
        let bit = |i: usize| ((bytes[i >> 3] >> (7 - (i & 7))) & 1) as usize;
        let data = Slot::Data { offset, prefix_len };

        let mut node = 0;
        for depth in 0..prefix_len - 1 {
            let side = bit(depth);
            node = match self.nodes[node][side] {
                Slot::Node(next) => next,
                existing => {
                    let next = self.nodes.len();
                    // Push a shorter prefix down into both children
                    self.nodes.push([existing; 2]);
                    self.nodes[node][side] = Slot::Node(next);
                    next
                }
            };
        }

        let side = bit(prefix_len - 1);
        match self.nodes[node][side] {
            Slot::Node(child) => self.backfill(child, data),
            _ => self.nodes[node][side] = data,
        }
    }

    // Fill gaps under a more specific subtree with a less specific network
    fn backfill(&mut self, node: usize, data: Slot) {
        let Slot::Data { prefix_len, .. } = data else {
            return;
        };
        for side in 0..2 {
            match self.nodes[node][side] {
                Slot::Node(child) => self.backfill(child, data),
                Slot::Empty => self.nodes[node][side] = data,
                Slot::Data { prefix_len: existing, .. } if existing < prefix_len => {
                    self.nodes[node][side] = data
                }
                Slot::Data { .. } => {}
            }
        }
    }

    fn node_count(&self) -> u32 {
        self.nodes.len() as u32
    }

    fn write(&self, record_size: u16) -> Vec<u8> {
        let node_count = self.node_count();
        let record = |slot: Slot| match slot {
            Slot::Empty => node_count,
            Slot::Node(i) => i as u32,
            Slot::Data { offset, .. } => node_count + 16 + offset,
        };

        let mut out = Vec::new();
        for [left, right] in &self.nodes {
            let (l, r) = (record(*left), record(*right));
            match record_size {
                24 => {
                    out.extend_from_slice(&l.to_be_bytes()[1..]);
                    out.extend_from_slice(&r.to_be_bytes()[1..]);
                }
                28 => {
                    out.extend_from_slice(&l.to_be_bytes()[1..]);
                    out.push((((l >> 24) & 0x0F) << 4) as u8 | ((r >> 24) & 0x0F) as u8);
                    out.extend_from_slice(&r.to_be_bytes()[1..]);
                }
                32 => {
                    out.extend_from_slice(&l.to_be_bytes());
                    out.extend_from_slice(&r.to_be_bytes());
                }
                other => panic!("unsupported record size {}", other),
            }
        }
        out
    }
}

/// Builder for complete MMDB images
pub struct MmdbWriter {
    ip_version: u16,
    record_size: u16,
    database_type: String,
    languages: Vec<String>,
    description: Vec<(String, String)>,
    build_epoch: u64,
    data: DataEncoder,
    networks: Vec<([u8; 16], usize, u32)>,
}

impl MmdbWriter {
    pub fn new(ip_version: u16, record_size: u16) -> Self {
        Self {
            ip_version,
            record_size,
            database_type: "Test-Fixture".to_string(),
            languages: vec!["en".to_string()],
            description: vec![("en".to_string(), "Test fixture database".to_string())],
            build_epoch: 1_700_000_000,
            data: DataEncoder::new(),
            networks: Vec::new(),
        }
    }

    pub fn database_type(mut self, name: &str) -> Self {
        self.database_type = name.to_string();
        self
    }

    pub fn languages(mut self, langs: &[&str]) -> Self {
        self.languages = langs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn description(mut self, lang: &str, text: &str) -> Self {
        self.description.push((lang.to_string(), text.to_string()));
        self
    }

    /// Map a network ("a.b.c.d/len" or IPv6 CIDR) to a value
    pub fn insert(&mut self, cidr: &str, value: &DataValue) {
        let offset = self.data.encode(value);
        self.insert_offset(cidr, offset);
    }

    /// Map a network to raw, possibly malformed, data bytes
    pub fn insert_raw(&mut self, cidr: &str, bytes: &[u8]) {
        let offset = self.data.raw(bytes);
        self.insert_offset(cidr, offset);
    }

    fn insert_offset(&mut self, cidr: &str, offset: u32) {
        let (addr, len) = cidr.split_once('/').expect("CIDR needs a prefix length");
        let addr: IpAddr = addr.parse().expect("bad network address");
        let len: usize = len.parse().expect("bad prefix length");

        let mut bytes = [0u8; 16];
        let tree_len = match (addr, self.ip_version) {
            (IpAddr::V4(a), 4) => {
                bytes[..4].copy_from_slice(&a.octets());
                len
            }
            (IpAddr::V4(a), _) => {
                bytes[12..].copy_from_slice(&a.octets());
                96 + len
            }
            (IpAddr::V6(a), 6) => {
                bytes = a.octets();
                len
            }
            (IpAddr::V6(_), _) => panic!("IPv6 network in an IPv4 tree"),
        };
        self.networks.push((bytes, tree_len, offset));
    }

    /// Metadata map the image will carry
    pub fn metadata_map(&self, node_count: u32) -> DataMap {
        let mut description = DataMap::new();
        for (lang, text) in &self.description {
            description.insert(lang.clone(), DataValue::String(text.clone()));
        }

        let mut map = DataMap::new();
        map.insert("binary_format_major_version", DataValue::Uint16(2));
        map.insert("binary_format_minor_version", DataValue::Uint16(0));
        map.insert("build_epoch", DataValue::Uint64(self.build_epoch));
        map.insert("database_type", DataValue::String(self.database_type.clone()));
        map.insert("description", DataValue::Map(description));
        map.insert("ip_version", DataValue::Uint16(self.ip_version));
        map.insert(
            "languages",
            DataValue::Array(
                self.languages
                    .iter()
                    .map(|l| DataValue::String(l.clone()))
                    .collect(),
            ),
        );
        map.insert("node_count", DataValue::Uint32(node_count));
        map.insert("record_size", DataValue::Uint16(self.record_size));
        map
    }

    pub fn build(self) -> Vec<u8> {
        self.build_with_metadata(|_| {})
    }

    /// Build, letting the caller edit the metadata map first
    pub fn build_with_metadata(self, edit: impl FnOnce(&mut DataMap)) -> Vec<u8> {
        let mut tree = TreeBuilder::new();
        for (bytes, len, offset) in &self.networks {
            tree.insert(bytes, *len, *offset);
        }

        let mut metadata = self.metadata_map(tree.node_count());
        edit(&mut metadata);
        let mut meta_encoder = DataEncoder::new();
        meta_encoder.encode(&DataValue::Map(metadata));

        let mut out = tree.write(self.record_size);
        out.extend_from_slice(&[0u8; 16]);
        out.extend_from_slice(&self.data.into_bytes());
        out.extend_from_slice(METADATA_MARKER);
        out.extend_from_slice(&meta_encoder.into_bytes());
        out
    }
}

/// Write bytes to a temporary file that lives as long as the handle
pub fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

fn s(v: &str) -> DataValue {
    DataValue::String(v.to_string())
}

fn names(en: &str, de: &str) -> DataValue {
    let mut m = DataMap::new();
    m.insert("en", s(en));
    m.insert("de", s(de));
    DataValue::Map(m)
}

fn country(iso: &str, en: &str, de: &str, geoname_id: u32) -> DataValue {
    let mut m = DataMap::new();
    m.insert("geoname_id", DataValue::Uint32(geoname_id));
    m.insert("iso_code", s(iso));
    m.insert("names", names(en, de));
    DataValue::Map(m)
}

/// City-style record for tests
pub fn city_record(city_en: &str, iso: &str, country_en: &str, lat: f64, lon: f64) -> DataValue {
    let mut city = DataMap::new();
    city.insert("names", names(city_en, city_en));

    let mut location = DataMap::new();
    location.insert("latitude", DataValue::Double(lat));
    location.insert("longitude", DataValue::Double(lon));
    location.insert("accuracy_radius", DataValue::Uint16(100));

    let mut record = DataMap::new();
    record.insert("city", DataValue::Map(city));
    record.insert("country", country(iso, country_en, country_en, 2_635_167));
    record.insert("location", DataValue::Map(location));
    record.insert(
        "subdivisions",
        DataValue::Array(vec![DataValue::Map(
            vec![("iso_code".to_string(), s("ENG"))].into_iter().collect(),
        )]),
    );
    DataValue::Map(record)
}

/// Record exercising every scalar type
pub fn all_types_record() -> DataValue {
    let mut m = DataMap::new();
    m.insert("utf8_string", s("unicode! ☯ - ♫"));
    m.insert("double", DataValue::Double(42.123456));
    m.insert("bytes", DataValue::Bytes(vec![0x00, 0x00, 0x00, 0x2a]));
    m.insert("uint16", DataValue::Uint16(100));
    m.insert("uint32", DataValue::Uint32(268_435_456));
    m.insert("int32", DataValue::Int32(-268_435_456));
    m.insert("uint64", DataValue::Uint64(1_152_921_504_606_846_976));
    m.insert("uint128", DataValue::Uint128(1u128 << 120));
    m.insert(
        "array",
        DataValue::Array(vec![
            DataValue::Uint32(1),
            DataValue::Uint32(2),
            DataValue::Uint32(3),
        ]),
    );
    m.insert("boolean", DataValue::Bool(true));
    m.insert("float", DataValue::Float(1.1));
    m.insert("long_string", s(&"x".repeat(300)));
    DataValue::Map(m)
}

/// IPv6 database with IPv4 and IPv6 networks
///
/// - 81.2.69.0/24   London
/// - 81.2.69.160/27 London (more specific, different coordinates)
/// - 89.160.20.0/24 Linköping
/// - 2001:218::/32  Tokyo
/// - 1.1.1.0/24     every data type
pub fn city_database(record_size: u16) -> Vec<u8> {
    let mut w = MmdbWriter::new(6, record_size)
        .database_type("Test-City")
        .languages(&["en", "de"])
        .description("de", "Testdatenbank");
    w.insert(
        "81.2.69.0/24",
        &city_record("London", "GB", "United Kingdom", 51.5142, -0.0931),
    );
    w.insert(
        "81.2.69.160/27",
        &city_record("London", "GB", "United Kingdom", 51.5, -0.1),
    );
    w.insert(
        "89.160.20.0/24",
        &city_record("Linköping", "SE", "Sweden", 58.4167, 15.6167),
    );
    w.insert(
        "2001:218::/32",
        &city_record("Tokyo", "JP", "Japan", 35.68, 139.75),
    );
    w.insert("1.1.1.0/24", &all_types_record());
    w.build()
}

/// IPv4-only database with two networks
pub fn ipv4_database(record_size: u16) -> Vec<u8> {
    let mut w = MmdbWriter::new(4, record_size).database_type("Test-IPv4");
    w.insert("1.1.1.0/24", &s("one"));
    w.insert("8.8.8.0/24", &s("eight"));
    w.build()
}
