//! Persistent response cache.

mod disk_cache;
mod key;
mod schema;

use std::path::PathBuf;
use thiserror::Error;

pub use disk_cache::{CacheClass, CacheInfo, ConsistencyReport, DiskCache};
pub use key::cache_key;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache at {path:?} holds '{found}' entries, refusing to open it as '{expected}'")]
    ClassMismatch {
        path: PathBuf,
        expected: CacheClass,
        found: String,
    },

    #[error("cache schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: usize, supported: usize },

    #[error("cache connection lock poisoned")]
    Poisoned,
}

impl CacheError {
    /// The database file itself is damaged, as opposed to a failing query.
    pub fn is_corruption(&self) -> bool {
        match self {
            CacheError::Sqlite(e) => matches!(
                e.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseCorrupt | rusqlite::ErrorCode::NotADatabase)
            ),
            _ => false,
        }
    }
}
