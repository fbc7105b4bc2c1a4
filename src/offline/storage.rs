//! Cache generation storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::traits::Response;
use crate::db;

/// A single cached response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  /// The cached response
  pub response: Response,
  /// When the response was cached
  pub cached_at: DateTime<Utc>,
}

/// Trait for storage holding named cache generations.
pub trait CacheStore: Send + Sync {
  /// Create the named cache if it does not exist yet.
  fn open(&self, cache_name: &str) -> Result<()>;

  /// Names of all existing caches, oldest first.
  fn keys(&self) -> Result<Vec<String>>;

  /// Delete a cache and all of its entries. Returns whether it existed.
  fn delete(&self, cache_name: &str) -> Result<bool>;

  /// Store a response for `path` in the named cache.
  fn put(&self, cache_name: &str, path: &str, response: &Response) -> Result<()>;

  /// Look up the response stored for `path` in the named cache.
  fn lookup(&self, cache_name: &str, path: &str) -> Result<Option<CachedResponse>>;
}

/// SQLite-based cache storage implementation.
pub struct SqliteCacheStore {
  conn: Mutex<Connection>,
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- One row per cache generation
CREATE TABLE IF NOT EXISTS caches (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Cached responses, keyed by generation and request path
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_name TEXT NOT NULL,
    path TEXT NOT NULL,
    status INTEGER NOT NULL,
    content_type TEXT,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (cache_name, path),
    FOREIGN KEY (cache_name) REFERENCES caches(name) ON DELETE CASCADE
);
"#;

impl SqliteCacheStore {
  /// Open or create the cache database at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    let conn = db::open_database(path, CACHE_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Open a cache database that lives only as long as this value.
  pub fn open_in_memory() -> Result<Self> {
    let conn = db::open_in_memory(CACHE_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

impl CacheStore for SqliteCacheStore {
  fn open(&self, cache_name: &str) -> Result<()> {
    let conn = self.conn()?;
    conn
      .execute(
        "INSERT OR IGNORE INTO caches (name) VALUES (?)",
        params![cache_name],
      )
      .map_err(|e| eyre!("Failed to open cache {}: {}", cache_name, e))?;
    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>> {
    let conn = self.conn()?;
    let mut stmt = conn
      .prepare("SELECT name FROM caches ORDER BY rowid")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list caches: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read cache name: {}", e))?;

    Ok(names)
  }

  fn delete(&self, cache_name: &str) -> Result<bool> {
    let mut conn = self.conn()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "DELETE FROM cache_entries WHERE cache_name = ?",
      params![cache_name],
    )
    .map_err(|e| eyre!("Failed to delete cache entries: {}", e))?;

    let removed = tx
      .execute("DELETE FROM caches WHERE name = ?", params![cache_name])
      .map_err(|e| eyre!("Failed to delete cache {}: {}", cache_name, e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(removed > 0)
  }

  fn put(&self, cache_name: &str, path: &str, response: &Response) -> Result<()> {
    let mut conn = self.conn()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "INSERT OR IGNORE INTO caches (name) VALUES (?)",
      params![cache_name],
    )
    .map_err(|e| eyre!("Failed to open cache {}: {}", cache_name, e))?;

    tx.execute(
      "INSERT OR REPLACE INTO cache_entries (cache_name, path, status, content_type, body, cached_at)
       VALUES (?, ?, ?, ?, ?, datetime('now'))",
      params![
        cache_name,
        path,
        response.status,
        response.content_type,
        response.body
      ],
    )
    .map_err(|e| eyre!("Failed to store {}: {}", path, e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn lookup(&self, cache_name: &str, path: &str) -> Result<Option<CachedResponse>> {
    let conn = self.conn()?;

    let row: Option<(u16, Option<String>, Vec<u8>, String)> = conn
      .query_row(
        "SELECT status, content_type, body, cached_at FROM cache_entries
         WHERE cache_name = ? AND path = ?",
        params![cache_name, path],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up {}: {}", path, e))?;

    match row {
      Some((status, content_type, body, cached_at_str)) => Ok(Some(CachedResponse {
        response: Response {
          status,
          content_type,
          body,
        },
        cached_at: parse_datetime(&cached_at_str)?,
      })),
      None => Ok(None),
    }
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
