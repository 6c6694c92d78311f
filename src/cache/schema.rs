//! Schema definition for cache databases.

pub struct CacheSchema {
    pub version: usize,
    pub up: &'static str,
}

pub const CACHE_VERSIONED_SCHEMAS: &[CacheSchema] = &[CacheSchema {
    version: 1,
    up: r#"
            CREATE TABLE IF NOT EXISTS cache_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                checksum TEXT NOT NULL,
                inserted_at INTEGER NOT NULL
            );
        "#,
}];

pub const SCHEMA_VERSION_KEY: &str = "schema_version";
pub const CACHE_CLASS_KEY: &str = "cache_class";
