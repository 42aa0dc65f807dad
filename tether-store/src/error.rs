//! Error types for tether-store.

use std::{fmt, io};

/// The error type returned by every fallible [`crate::Storage`] operation.
#[derive(Debug)]
pub enum StoreError {
    /// Filesystem failure (creating the backing file or its directory).
    Io(io::Error),
    /// SQLite failure (open, schema, row read/write).
    Sqlite(rusqlite::Error),
    /// The operation needs a durable table and the store is in-memory only.
    Unsupported(&'static str),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)          => write!(f, "I/O error: {e}"),
            Self::Sqlite(e)      => write!(f, "sqlite error: {e}"),
            Self::Unsupported(s) => write!(f, "unsupported in in-memory mode: {s}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e)     => Some(e),
            Self::Sqlite(e) => Some(e),
            Self::Unsupported(_) => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self { Self::Io(e) }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self { Self::Sqlite(e) }
}
