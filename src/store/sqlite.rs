//! SQLite persistence for the cache store.
//!
//! One row per entity-type collection: the key is the collection name, the
//! value is the JSON-serialized array. Disposable by design — a missing
//! file or row reads as an empty collection and the next sync pass
//! repopulates it.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS collections (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
";

/// Open (creating if needed) the cache database at `path`.
pub fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

/// Open an in-memory cache database (tests and throwaway embedders).
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

/// Read the raw JSON value stored under `key`, if any.
pub fn read_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM collections WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

/// Replace the JSON value stored under `key`.
pub fn write_value(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO collections (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        rusqlite::params![key, value, chrono::Utc::now().timestamp_millis()],
    )?;
    Ok(())
}

/// Remove the value stored under `key`.
pub fn delete_value(conn: &Connection, key: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM collections WHERE key = ?1",
        rusqlite::params![key],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_round_trip() {
        let conn = open_in_memory().unwrap();
        assert_eq!(read_value(&conn, "staff").unwrap(), None);

        write_value(&conn, "staff", "[1,2,3]").unwrap();
        assert_eq!(read_value(&conn, "staff").unwrap(), Some("[1,2,3]".to_string()));

        write_value(&conn, "staff", "[]").unwrap();
        assert_eq!(read_value(&conn, "staff").unwrap(), Some("[]".to_string()));
    }

    #[test]
    fn test_delete_value() {
        let conn = open_in_memory().unwrap();
        write_value(&conn, "session:user", "{}").unwrap();
        delete_value(&conn, "session:user").unwrap();
        assert_eq!(read_value(&conn, "session:user").unwrap(), None);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.db");
        let conn = open(&path).unwrap();
        write_value(&conn, "k", "[]").unwrap();
        assert!(path.exists());
    }
}
