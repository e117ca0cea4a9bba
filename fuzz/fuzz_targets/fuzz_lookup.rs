#![no_main]
use libfuzzer_sys::fuzz_target;
use mmdb_reader::Reader;
use std::net::IpAddr;
use std::sync::OnceLock;

#[path = "../../tests/common/mod.rs"]
mod common;

fn reader() -> &'static Reader {
    static READER: OnceLock<Reader> = OnceLock::new();
    READER.get_or_init(|| Reader::from_bytes(common::city_database(28)).unwrap())
}

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Address parsing edge cases
        let by_text = reader().get(s);

        if let Ok(ip) = s.parse::<IpAddr>() {
            let by_addr = reader().get_addr(ip);
            assert_eq!(by_text.ok(), by_addr.ok());
        }
    }

    if data.len() == 16 {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(data);
        let _ = reader().get_addr(IpAddr::from(octets));
    }
});
