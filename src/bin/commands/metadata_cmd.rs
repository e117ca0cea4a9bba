use anyhow::{Context, Result};
use mmdb_reader::{OpenOptions, Reader};
use std::path::PathBuf;

use crate::cli_utils::format_unix_timestamp;

pub fn cmd_metadata(database: PathBuf, json_output: bool, options: &OpenOptions) -> Result<()> {
    let mut reader = Reader::open_with(&database, options)
        .with_context(|| format!("Failed to open database: {}", database.display()))?;

    let metadata = reader
        .metadata()
        .with_context(|| format!("Failed to read metadata: {}", database.display()))?;
    reader.close().context("Failed to close database")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
        return Ok(());
    }

    println!("Database:       {}", database.display());
    println!("Type:           {}", metadata.database_type);
    println!(
        "Format version: {}.{}",
        metadata.binary_format_major_version, metadata.binary_format_minor_version
    );
    println!("IP version:     {}", metadata.ip_version);
    println!("Record size:    {} bits", metadata.record_size);
    println!("Node count:     {}", metadata.node_count);
    println!(
        "Built:          {}",
        format_unix_timestamp(metadata.build_epoch)
    );
    if !metadata.languages.is_empty() {
        println!("Languages:      {}", metadata.languages.join(", "));
    }
    if !metadata.description.is_empty() {
        println!();
        println!("Description:");
        for (lang, text) in &metadata.description {
            println!("  {}: {}", lang, text);
        }
    }

    Ok(())
}
