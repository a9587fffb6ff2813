//! Cache storage trait and its backends.

use chrono::{DateTime, TimeZone, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A serialized payload and the moment it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
  /// JSON text of the cached value
  pub payload: String,
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// Backends only move strings; (de)serialization happens in `CacheLayer`.
pub trait CacheStorage: Send + Sync {
  /// Get the entry stored under `key`.
  fn get(&self, key: &str) -> Result<Option<StoredEntry>>;

  /// Store `payload` under `key`, replacing any previous entry.
  fn put(&self, key: &str, payload: &str, cached_at: DateTime<Utc>) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &str) -> Result<Option<StoredEntry>> {
    Ok(None) // Always miss
  }

  fn put(&self, _key: &str, _payload: &str, _cached_at: DateTime<Utc>) -> Result<()> {
    Ok(()) // Discard
  }
}

/// Process-local storage. Used when the on-disk cache cannot be opened.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, StoredEntry>>,
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(key).cloned())
  }

  fn put(&self, key: &str, payload: &str, cached_at: DateTime<Utc>) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(
      key.to_string(),
      StoredEntry {
        payload: payload.to_string(),
        cached_at,
      },
    );
    Ok(())
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_key TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    cached_at INTEGER NOT NULL
);
"#;

impl SqliteStorage {
  /// Create a new SQLite storage at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open or create the cache database at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("oatrack").join("cache.db"))
  }
}

impl CacheStorage for SqliteStorage {
  fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(String, i64)> = conn
      .query_row(
        "SELECT payload, cached_at FROM cache_entries WHERE cache_key = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry: {}", e))?;

    match row {
      Some((payload, millis)) => {
        let cached_at = Utc
          .timestamp_millis_opt(millis)
          .single()
          .ok_or_else(|| eyre!("Invalid cache timestamp {}", millis))?;
        Ok(Some(StoredEntry { payload, cached_at }))
      }
      None => Ok(None),
    }
  }

  fn put(&self, key: &str, payload: &str, cached_at: DateTime<Utc>) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO cache_entries (cache_key, payload, cached_at)
         VALUES (?, ?, ?)",
        params![key, payload, cached_at.timestamp_millis()],
      )
      .map_err(|e| eyre!("Failed to store cache entry: {}", e))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn millis_now() -> DateTime<Utc> {
    // SQLite keeps millisecond precision
    Utc
      .timestamp_millis_opt(Utc::now().timestamp_millis())
      .unwrap()
  }

  #[test]
  fn test_sqlite_round_trip() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let at = millis_now();

    assert_eq!(storage.get("k").unwrap(), None);

    storage.put("k", r#"{"a":"1"}"#, at).unwrap();
    let entry = storage.get("k").unwrap().unwrap();
    assert_eq!(entry.payload, r#"{"a":"1"}"#);
    assert_eq!(entry.cached_at, at);
  }

  #[test]
  fn test_sqlite_put_replaces() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let old = millis_now() - Duration::hours(1);
    let new = millis_now();

    storage.put("k", "old", old).unwrap();
    storage.put("k", "new", new).unwrap();

    let entry = storage.get("k").unwrap().unwrap();
    assert_eq!(entry.payload, "new");
    assert_eq!(entry.cached_at, new);
  }

  #[test]
  fn test_sqlite_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.db");
    let at = millis_now();

    {
      let storage = SqliteStorage::open_at(&path).unwrap();
      storage.put("k", "payload", at).unwrap();
    }

    let storage = SqliteStorage::open_at(&path).unwrap();
    assert_eq!(
      storage.get("k").unwrap(),
      Some(StoredEntry {
        payload: "payload".to_string(),
        cached_at: at,
      })
    );
  }

  #[test]
  fn test_memory_storage() {
    let storage = MemoryStorage::default();
    let at = Utc::now();
    storage.put("a", "1", at).unwrap();

    assert_eq!(storage.get("a").unwrap().map(|e| e.payload), Some("1".into()));
    assert_eq!(storage.get("b").unwrap(), None);
  }

  #[test]
  fn test_noop_storage_always_misses() {
    let storage = NoopStorage;
    storage.put("a", "1", Utc::now()).unwrap();
    assert_eq!(storage.get("a").unwrap(), None);
  }
}
