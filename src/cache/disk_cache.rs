//! SQLite-backed key/value cache, one database file per resource class.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::key::checksum;
use super::schema::{CACHE_CLASS_KEY, CACHE_VERSIONED_SCHEMAS, SCHEMA_VERSION_KEY};
use super::CacheError;

/// Kind of resource a cache file holds. Each class lives in its own file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheClass {
    /// Raw upstream API response bodies.
    Api,
    /// Scraped recommendation pages.
    Scraper,
}

impl CacheClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheClass::Api => "api",
            CacheClass::Scraper => "scraper",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "api" => Some(CacheClass::Api),
            "scraper" => Some(CacheClass::Scraper),
            _ => None,
        }
    }
}

impl fmt::Display for CacheClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a cache file, for the `cache info` command.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheInfo {
    pub class: CacheClass,
    pub path: PathBuf,
    pub entries: usize,
    pub total_value_bytes: u64,
    pub file_size_bytes: u64,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

impl fmt::Display for CacheInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "class:       {}", self.class)?;
        writeln!(f, "path:        {}", self.path.display())?;
        writeln!(f, "entries:     {}", self.entries)?;
        writeln!(
            f,
            "values:      {:#}",
            byte_unit::Byte::from(self.total_value_bytes)
        )?;
        writeln!(
            f,
            "file size:   {:#}",
            byte_unit::Byte::from(self.file_size_bytes)
        )?;
        match (&self.oldest_entry, &self.newest_entry) {
            (Some(oldest), Some(newest)) => write!(f, "entries from {} to {}", oldest, newest),
            _ => write!(f, "no entries"),
        }
    }
}

/// Result of [`DiskCache::check`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub entries_checked: usize,
    /// Keys whose rows were corrupted and have been deleted.
    pub dropped_keys: Vec<String>,
    /// Messages reported by SQLite's own integrity check, if any.
    pub integrity_warnings: Vec<String>,
    /// Where a structurally damaged file was moved before starting over empty.
    pub quarantined: Option<PathBuf>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_keys.is_empty()
            && self.integrity_warnings.is_empty()
            && self.quarantined.is_none()
    }
}

/// Persistent cache for one [`CacheClass`].
///
/// Values are opaque bytes. Entries never expire; they stay until [`DiskCache::clear`].
#[derive(Clone)]
pub struct DiskCache {
    class: CacheClass,
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
    /// Where a damaged file found at open time was moved.
    recovered_from: Option<PathBuf>,
}

impl DiskCache {
    /// Open (or create) the cache for `class` under `cache_dir`.
    ///
    /// The database lives at `<cache_dir>/<class>_cache/cache.db`. A file SQLite
    /// cannot read is moved aside to `cache.db.corrupt-<timestamp>` and replaced
    /// with an empty cache.
    pub fn open(cache_dir: &Path, class: CacheClass) -> Result<Self, CacheError> {
        let dir = cache_dir.join(format!("{}_cache", class));
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("cache.db");

        let (conn, recovered_from) = match open_connection(&path, class) {
            Ok(conn) => (conn, None),
            Err(e) if e.is_corruption() => {
                let moved = quarantine(&path)?;
                warn!(
                    "{} cache at {:?} is damaged ({}), moved it to {:?} and starting empty",
                    class, path, e, moved
                );
                (open_connection(&path, class)?, Some(moved))
            }
            Err(e) => return Err(e),
        };

        debug!("Opened {} cache at {:?}", class, path);
        Ok(Self {
            class,
            path,
            conn: Arc::new(Mutex::new(conn)),
            recovered_from,
        })
    }

    pub fn class(&self) -> CacheClass {
        self.class
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Look up a value. A row whose checksum no longer matches is dropped and
    /// reported as absent.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let conn = self.conn()?;
        let row: Option<(Vec<u8>, String)> = conn
            .query_row(
                "SELECT value, checksum FROM cache_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((value, stored)) if checksum(&value) == stored => Ok(Some(value)),
            Some(_) => {
                warn!("Dropping corrupted {} cache entry {}", self.class, key);
                conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (key, value, checksum, inserted_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key, value, checksum(value), Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// Remove every entry. Returns the number of removed entries.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM cache_entries", [])?;
        conn.execute_batch("VACUUM")?;
        info!("Cleared {} entries from {} cache", removed, self.class);
        Ok(removed)
    }

    pub fn list_keys(&self) -> Result<Vec<String>, CacheError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key FROM cache_entries ORDER BY inserted_at, key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    pub fn read_value(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.get(key)
    }

    pub fn len(&self) -> Result<usize, CacheError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    pub fn info(&self) -> Result<CacheInfo, CacheError> {
        let conn = self.conn()?;
        let (entries, total, oldest, newest): (i64, i64, Option<i64>, Option<i64>) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(value)), 0), MIN(inserted_at), MAX(inserted_at)
             FROM cache_entries",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        let file_size_bytes = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);

        Ok(CacheInfo {
            class: self.class,
            path: self.path.clone(),
            entries: entries as usize,
            total_value_bytes: total as u64,
            file_size_bytes,
            oldest_entry: oldest.and_then(|t| Utc.timestamp_opt(t, 0).single()),
            newest_entry: newest.and_then(|t| Utc.timestamp_opt(t, 0).single()),
        })
    }

    /// Verify the cache file and every entry in it.
    ///
    /// Runs SQLite's integrity check, then verifies each row's checksum (and,
    /// for the api class, that the value is well-formed JSON). Corrupted rows
    /// are deleted and the file is vacuumed. A file with structural damage is
    /// moved aside and replaced with an empty one; every key that could still
    /// be listed is reported as dropped.
    pub fn check(&self) -> Result<ConsistencyReport, CacheError> {
        let mut conn = self.conn()?;
        let mut report = ConsistencyReport {
            quarantined: self.recovered_from.clone(),
            ..ConsistencyReport::default()
        };

        let damaged = match self.scan(&conn, &mut report) {
            Ok(()) => !report.integrity_warnings.is_empty(),
            Err(e) if e.is_corruption() => {
                warn!("{} cache at {:?} is unreadable: {}", self.class, self.path, e);
                true
            }
            Err(e) => return Err(e),
        };

        if damaged {
            let lost = list_keys_lossy(&conn);
            self.reset(&mut conn, &mut report, lost)?;
        } else {
            for key in &report.dropped_keys {
                warn!("Dropping corrupted {} cache entry {}", self.class, key);
                conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
            }
        }
        conn.execute_batch("VACUUM")?;

        info!(
            "Checked {} {} cache entries, dropped {}, {} integrity warning(s)",
            report.entries_checked,
            self.class,
            report.dropped_keys.len(),
            report.integrity_warnings.len()
        );
        Ok(report)
    }

    fn scan(&self, conn: &Connection, report: &mut ConsistencyReport) -> Result<(), CacheError> {
        {
            let mut stmt = conn.prepare("PRAGMA integrity_check")?;
            let messages = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            report.integrity_warnings = messages.into_iter().filter(|m| m != "ok").collect();
        }

        let mut stmt = conn.prepare("SELECT key, value, checksum FROM cache_entries")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (key, value, stored) = row?;
            report.entries_checked += 1;
            if !self.entry_is_valid(&value, &stored) {
                report.dropped_keys.push(key);
            }
        }
        Ok(())
    }

    /// Replace the damaged file under `conn` with an empty cache.
    fn reset(
        &self,
        conn: &mut Connection,
        report: &mut ConsistencyReport,
        mut lost: Vec<String>,
    ) -> Result<(), CacheError> {
        // Close the damaged file before moving it.
        drop(std::mem::replace(conn, Connection::open_in_memory()?));
        let moved = quarantine(&self.path)?;
        *conn = open_connection(&self.path, self.class)?;
        warn!(
            "Moved damaged {} cache to {:?}, {} entries lost",
            self.class,
            moved,
            lost.len()
        );

        for key in std::mem::take(&mut report.dropped_keys) {
            if !lost.contains(&key) {
                lost.push(key);
            }
        }
        report.dropped_keys = lost;
        report.quarantined = Some(moved);
        Ok(())
    }

    fn entry_is_valid(&self, value: &[u8], stored_checksum: &str) -> bool {
        if checksum(value) != stored_checksum {
            return false;
        }
        match self.class {
            CacheClass::Api => serde_json::from_slice::<serde::de::IgnoredAny>(value).is_ok(),
            CacheClass::Scraper => true,
        }
    }
}

/// Keys still readable from a damaged file, in rowid order.
fn list_keys_lossy(conn: &Connection) -> Vec<String> {
    let Ok(mut stmt) = conn.prepare("SELECT key FROM cache_entries") else {
        return Vec::new();
    };
    let Ok(rows) = stmt.query_map([], |row| row.get::<_, String>(0)) else {
        return Vec::new();
    };
    rows.map_while(Result::ok).collect()
}

/// Open `path` and bring it to the current schema, checking the class it was created for.
fn open_connection(path: &Path, class: CacheClass) -> Result<Connection, CacheError> {
    let conn = Connection::open(path)?;
    let schema = &CACHE_VERSIONED_SCHEMAS[CACHE_VERSIONED_SCHEMAS.len() - 1];
    conn.execute_batch(schema.up)?;

    let stored_class: Option<String> = conn
        .query_row(
            "SELECT value FROM cache_meta WHERE key = ?1",
            params![CACHE_CLASS_KEY],
            |row| row.get(0),
        )
        .optional()?;
    match stored_class {
        Some(found) if found != class.as_str() => {
            return Err(CacheError::ClassMismatch {
                path: path.to_path_buf(),
                expected: class,
                found,
            });
        }
        Some(_) => {}
        None => {
            conn.execute(
                "INSERT INTO cache_meta (key, value) VALUES (?1, ?2)",
                params![CACHE_CLASS_KEY, class.as_str()],
            )?;
        }
    }

    let stored_version: Option<String> = conn
        .query_row(
            "SELECT value FROM cache_meta WHERE key = ?1",
            params![SCHEMA_VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;
    match stored_version.and_then(|v| v.parse::<usize>().ok()) {
        Some(found) if found > schema.version => {
            return Err(CacheError::UnsupportedSchema {
                found,
                supported: schema.version,
            });
        }
        Some(_) => {}
        None => {
            conn.execute(
                "INSERT OR REPLACE INTO cache_meta (key, value) VALUES (?1, ?2)",
                params![SCHEMA_VERSION_KEY, schema.version.to_string()],
            )?;
        }
    }

    Ok(conn)
}

/// Move a damaged database file out of the way. Returns its new path.
fn quarantine(path: &Path) -> Result<PathBuf, CacheError> {
    let target = path.with_extension(format!("db.corrupt-{}", Utc::now().timestamp_millis()));
    std::fs::rename(path, &target)?;
    for suffix in ["-journal", "-wal", "-shm"] {
        let mut side = path.as_os_str().to_owned();
        side.push(suffix);
        let _ = std::fs::remove_file(PathBuf::from(side));
    }
    Ok(target)
}
