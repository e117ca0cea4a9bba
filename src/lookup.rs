//! Address lookups
//!
//! The engine finds the entry and flattens it; the decoder rebuilds it. A
//! lookup either returns a complete value or an error, never half a record.

use std::net::IpAddr;

use tracing::trace;

use crate::decoder::Decoder;
use crate::engine::{Engine, EngineError, TreeLookup};
use crate::error::{ReaderError, Result};
use crate::handle::Reader;
use crate::value::DataValue;

impl Reader {
    /// Look up the record for an address given as text
    ///
    /// Returns `Ok(None)` when the database has no data for the address.
    pub fn get(&self, ip_text: &str) -> Result<Option<DataValue>> {
        self.get_with_prefix_len(ip_text).map(|(value, _)| value)
    }

    /// Like [`get`](Self::get), also returning the matched prefix length
    ///
    /// IPv4 addresses report an IPv4 prefix even in IPv6 databases.
    pub fn get_with_prefix_len(&self, ip_text: &str) -> Result<(Option<DataValue>, u8)> {
        let engine = self.engine()?;
        let found = engine
            .lookup(ip_text)
            .map_err(|e| lookup_error(ip_text, e))?;
        self.resolve(engine, ip_text, found)
    }

    /// Look up the record for an already-parsed address
    pub fn get_addr(&self, ip: IpAddr) -> Result<Option<DataValue>> {
        let engine = self.engine()?;
        let text = ip.to_string();
        let found = engine
            .lookup_addr(ip)
            .map_err(|e| lookup_error(&text, e))?;
        self.resolve(engine, &text, found).map(|(value, _)| value)
    }

    fn resolve(
        &self,
        engine: &Engine,
        ip_text: &str,
        found: TreeLookup,
    ) -> Result<(Option<DataValue>, u8)> {
        let Some(entry) = found.entry else {
            trace!(ip = ip_text, prefix_len = found.prefix_len, "no entry");
            return Ok((None, found.prefix_len));
        };

        trace!(
            ip = ip_text,
            prefix_len = found.prefix_len,
            offset = entry.offset(),
            "entry found"
        );
        let nodes = engine
            .entry_node_list(entry)
            .map_err(|e| lookup_error(ip_text, e))?;
        let value = Decoder::new(nodes.as_slice())
            .with_max_depth(self.max_depth())
            .decode_all()?;
        Ok((Some(value), found.prefix_len))
    }
}

fn lookup_error(ip_text: &str, err: EngineError) -> ReaderError {
    match err {
        EngineError::InvalidAddress => ReaderError::InvalidAddress(ip_text.to_string()),
        EngineError::FamilyMismatch => ReaderError::AddressFamilyMismatch(ip_text.to_string()),
        EngineError::Fault(message) | EngineError::BadFormat(message) => {
            ReaderError::EngineFault {
                address: ip_text.to_string(),
                message,
            }
        }
        EngineError::FileNotFound(e) => ReaderError::EngineFault {
            address: ip_text.to_string(),
            message: e.to_string(),
        },
    }
}
