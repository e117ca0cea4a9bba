//! Database handle lifecycle
//!
//! A [`Reader`] is either open (it owns an engine and the mapped file) or
//! closed. Closing takes the engine out and releases it; every later
//! operation reports [`ReaderError::ClosedHandle`].

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::engine::{Engine, EngineError};
use crate::error::{ReaderError, Result};
use crate::options::{OpenMode, OpenOptions};

/// Origin label used in errors for images opened from memory
const MEMORY_ORIGIN: &str = "<memory>";

/// A handle to an opened MaxMind DB file
///
/// # Example
///
/// ```no_run
/// use mmdb_reader::Reader;
///
/// let mut reader = Reader::open("GeoLite2-Country.mmdb")?;
/// if let Some(record) = reader.get("81.2.69.160")? {
///     println!("{}", serde_json::to_string(&record).unwrap());
/// }
/// reader.close()?;
/// # Ok::<(), mmdb_reader::ReaderError>(())
/// ```
pub struct Reader {
    engine: Option<Engine>,
    path: Option<PathBuf>,
    mode: OpenMode,
    max_depth: usize,
}

impl Reader {
    /// Open a database file with default options
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &OpenOptions::new())
    }

    /// Open a database file with explicit options
    pub fn open_with<P: AsRef<Path>>(path: P, options: &OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        let engine = Engine::open(path, options.mode).map_err(|e| match e {
            EngineError::FileNotFound(source) => ReaderError::NotReadable {
                path: path.to_path_buf(),
                source,
            },
            other => invalid_format(path.display().to_string(), other),
        })?;

        debug!(path = %path.display(), mode = ?options.mode, "opened database");
        Ok(Self {
            engine: Some(engine),
            path: Some(path.to_path_buf()),
            mode: options.mode,
            max_depth: options.max_depth,
        })
    }

    /// Open a database image already held in memory
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with(data, &OpenOptions::new())
    }

    /// Open an in-memory image with explicit options
    ///
    /// The open mode is always [`OpenMode::Memory`] here.
    pub fn from_bytes_with(data: Vec<u8>, options: &OpenOptions) -> Result<Self> {
        let len = data.len();
        let engine =
            Engine::from_bytes(data).map_err(|e| invalid_format(MEMORY_ORIGIN.to_string(), e))?;

        debug!(bytes = len, "opened in-memory database");
        Ok(Self {
            engine: Some(engine),
            path: None,
            mode: OpenMode::Memory,
            max_depth: options.max_depth,
        })
    }

    /// Close the database and release the file
    ///
    /// Closing twice is an error.
    pub fn close(&mut self) -> Result<()> {
        let engine = self.engine.take().ok_or(ReaderError::AlreadyClosed)?;
        engine.close();
        debug!(origin = %self.origin(), "closed database");
        Ok(())
    }

    /// True once [`close`](Self::close) has succeeded
    pub fn is_closed(&self) -> bool {
        self.engine.is_none()
    }

    /// Path the handle was opened from, `None` for in-memory images
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// How the file is held in memory
    pub fn open_mode(&self) -> OpenMode {
        self.mode
    }

    /// Decoder nesting limit
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub(crate) fn engine(&self) -> Result<&Engine> {
        self.engine.as_ref().ok_or(ReaderError::ClosedHandle)
    }

    fn origin(&self) -> String {
        match &self.path {
            Some(p) => p.display().to_string(),
            None => MEMORY_ORIGIN.to_string(),
        }
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            engine.close();
            debug!(origin = %self.origin(), "closed database on drop");
        }
    }
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn invalid_format(origin: String, err: EngineError) -> ReaderError {
    let detail = match err {
        EngineError::BadFormat(msg) | EngineError::Fault(msg) => msg,
        other => other.to_string(),
    };
    ReaderError::InvalidFormat { origin, detail }
}
