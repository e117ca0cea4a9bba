#![no_main]
use libfuzzer_sys::fuzz_target;
use mmdb_reader::Reader;

fuzz_target!(|data: &[u8]| {
    // Garbage must produce errors, never panics
    if let Ok(mut reader) = Reader::from_bytes(data.to_vec()) {
        let _ = reader.metadata();
        for ip in ["1.1.1.1", "81.2.69.160", "::", "2001:db8::1", "255.255.255.255"] {
            let _ = reader.get_with_prefix_len(ip);
        }
        let _ = reader.close();
    }
});
