pub mod lookup_cmd;
pub mod metadata_cmd;

pub use lookup_cmd::cmd_lookup;
pub use metadata_cmd::cmd_metadata;
