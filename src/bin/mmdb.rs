mod cli_utils;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::{cmd_lookup, cmd_metadata};

#[derive(Parser)]
#[command(name = "mmdb")]
#[command(
    about = "Look up IP addresses in MaxMind DB files",
    long_about = "mmdb - Read-only MaxMind DB (MMDB) reader\n\n\
    Opens GeoIP2, GeoLite2 and other MMDB files and prints the record stored\n\
    for each address as JSON.\n\n\
    Examples:\n\
      mmdb lookup GeoLite2-City.mmdb 81.2.69.160 2001:218::1\n\
      mmdb metadata GeoLite2-City.mmdb\n\
      mmdb --memory metadata GeoLite2-City.mmdb --json\n\n\
    Set RUST_LOG=debug to see lifecycle logging on stderr."
)]
#[command(version)]
struct Cli {
    /// Read the whole file into memory instead of memory-mapping it
    #[arg(long, global = true)]
    memory: bool,

    /// Maximum nesting depth accepted when decoding records
    #[arg(long, global = true, value_name = "N")]
    max_depth: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up one or more IP addresses
    ///
    /// Prints one JSON object per line. Exits with status 1 if any address
    /// has no record.
    Lookup {
        /// Path to the MaxMind DB file
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// IPv4 or IPv6 addresses to look up
        #[arg(value_name = "IP", required = true)]
        ips: Vec<String>,
    },

    /// Show database metadata
    Metadata {
        /// Path to the MaxMind DB file
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = cli_utils::open_options(cli.memory, cli.max_depth);

    match cli.command {
        Commands::Lookup { database, ips } => cmd_lookup(database, ips, &options),
        Commands::Metadata { database, json } => cmd_metadata(database, json, &options),
    }
}
