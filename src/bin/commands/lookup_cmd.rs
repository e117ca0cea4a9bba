use anyhow::{Context, Result};
use mmdb_reader::{DataValue, OpenOptions, Reader};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli_utils::format_cidr;

/// One NDJSON output line
///
/// Must not go through `serde_json::Value`: it cannot hold a uint128 above
/// `u64::MAX`.
#[derive(Serialize)]
struct LookupLine<'a> {
    ip: &'a str,
    network: String,
    prefix_len: u8,
    data: Option<DataValue>,
}

pub fn cmd_lookup(database: PathBuf, ips: Vec<String>, options: &OpenOptions) -> Result<()> {
    let mut reader = Reader::open_with(&database, options)
        .with_context(|| format!("Failed to open database: {}", database.display()))?;

    let mut missing = 0usize;
    for ip in &ips {
        let (data, prefix_len) = reader
            .get_with_prefix_len(ip)
            .with_context(|| format!("Lookup failed for: {}", ip))?;

        if data.is_none() {
            missing += 1;
        }

        let line = LookupLine {
            ip,
            network: format_cidr(ip, prefix_len),
            prefix_len,
            data,
        };
        println!("{}", serde_json::to_string(&line)?);
    }

    reader.close().context("Failed to close database")?;

    // Exit 1 if any address had no record
    if missing > 0 {
        std::process::exit(1);
    }
    Ok(())
}
