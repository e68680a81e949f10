//! SQLite-backed `PersistenceStore`: one row per cache key, value zstd-compressed.
//!
//! Values are zstd-compressed before being stored as a BLOB column, keeping
//! large aggregate snapshots small on disk; one row per cache key so
//! concurrent CLI invocations don't clobber each other's writes the way a
//! single shared file would.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use hotspot_core::PersistenceStore;

const ZSTD_LEVEL: i32 = 3;

pub struct SqliteStore {
    conn: std::sync::Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(repo_root: &Path) -> Result<Self> {
        let path = cache_path(repo_root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        let conn = Connection::open(&path)
            .with_context(|| format!("failed to open cache database: {}", path.display()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS aggregate_cache (
                key TEXT PRIMARY KEY,
                bytes BLOB NOT NULL,
                schema_version INTEGER NOT NULL,
                created_at_unix INTEGER NOT NULL
            )",
            [],
        )
        .context("failed to create cache table")?;
        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }
}

fn cache_path(repo_root: &Path) -> PathBuf {
    repo_root.join(".hotspot").join("cache.sqlite3")
}

impl PersistenceStore for SqliteStore {
    fn get(&self, key: &str) -> Result<(Vec<u8>, i32, i64)> {
        let conn = self.conn.lock().unwrap();
        let (compressed, schema_version, created_at_unix): (Vec<u8>, i32, i64) = conn
            .query_row(
                "SELECT bytes, schema_version, created_at_unix FROM aggregate_cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .context("cache miss")?;
        let bytes = zstd::decode_all(compressed.as_slice()).context("failed to decompress cache entry")?;
        Ok((bytes, schema_version, created_at_unix))
    }

    fn set(&self, key: &str, bytes: &[u8], schema_version: i32, created_at_unix: i64) -> Result<()> {
        let compressed = zstd::encode_all(bytes, ZSTD_LEVEL).context("failed to compress cache entry")?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO aggregate_cache (key, bytes, schema_version, created_at_unix)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                bytes = excluded.bytes,
                schema_version = excluded.schema_version,
                created_at_unix = excluded.created_at_unix",
            params![key, compressed, schema_version, created_at_unix],
        )
        .context("failed to write cache entry")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_written_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path()).unwrap();
        store.set("k", b"hello", 1, 1_700_000_000).unwrap();
        let (bytes, schema_version, created_at) = store.get("k").unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(schema_version, 1);
        assert_eq!(created_at, 1_700_000_000);
    }

    #[test]
    fn overwrite_replaces_the_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path()).unwrap();
        store.set("k", b"first", 1, 100).unwrap();
        store.set("k", b"second", 1, 200).unwrap();
        let (bytes, _, created_at) = store.get("k").unwrap();
        assert_eq!(bytes, b"second");
        assert_eq!(created_at, 200);
    }

    #[test]
    fn missing_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path()).unwrap();
        assert!(store.get("nope").is_err());
    }
}
