//! SQLite-backed durable tiers.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use super::traits::{KeyValueStore, Tier, PROBE_KEY};
use crate::db;

/// Schema for the key-value table.
const KV_SCHEMA: &str = r#"
-- Flat string store, shared with any other application using the same file
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// SQLite-based key-value store.
///
/// Every key is namespaced with `prefix` so that co-located data in the same
/// table does not collide. The same type backs both the local and the session
/// tier; only the database location differs.
pub struct SqliteStore {
  conn: Mutex<Connection>,
  prefix: String,
  tier: Tier,
}

impl SqliteStore {
  /// Open or create a store at `path`.
  pub fn open(path: &Path, tier: Tier, prefix: &str) -> Result<Self> {
    let conn = db::open_database(path, KV_SCHEMA)?;
    debug!(path = %path.display(), %tier, "opened sqlite store");
    Ok(Self::with_connection(conn, tier, prefix))
  }

  /// Open a store that lives only as long as this value.
  pub fn open_in_memory(tier: Tier, prefix: &str) -> Result<Self> {
    let conn = db::open_in_memory(KV_SCHEMA)?;
    Ok(Self::with_connection(conn, tier, prefix))
  }

  fn with_connection(conn: Connection, tier: Tier, prefix: &str) -> Self {
    Self {
      conn: Mutex::new(conn),
      prefix: prefix.to_string(),
      tier,
    }
  }

  fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  fn namespaced(&self, key: &str) -> String {
    format!("{}{}", self.prefix, key)
  }

  fn try_get(&self, key: &str) -> Result<Option<String>> {
    let conn = self.conn()?;
    conn
      .query_row(
        "SELECT value FROM kv WHERE key = ?",
        params![self.namespaced(key)],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read key {}: {}", key, e))
  }

  fn try_set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self.conn()?;
    conn
      .execute(
        "INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)",
        params![self.namespaced(key), value],
      )
      .map_err(|e| eyre!("Failed to write key {}: {}", key, e))?;
    Ok(())
  }

  fn try_remove(&self, key: &str) -> Result<()> {
    let conn = self.conn()?;
    conn
      .execute("DELETE FROM kv WHERE key = ?", params![self.namespaced(key)])
      .map_err(|e| eyre!("Failed to remove key {}: {}", key, e))?;
    Ok(())
  }

  /// Write-then-delete of the probe key, keeping the raw SQLite error so the
  /// caller can tell a full database apart from other faults.
  fn write_probe(conn: &Connection, key: &str) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)",
      params![key, key],
    )?;
    conn.execute("DELETE FROM kv WHERE key = ?", params![key])?;
    Ok(())
  }

  fn is_empty(conn: &Connection) -> bool {
    conn
      .query_row("SELECT EXISTS(SELECT 1 FROM kv)", [], |row| row.get::<_, bool>(0))
      .map(|exists| !exists)
      .unwrap_or(true)
  }
}

/// Decide availability from a probe outcome.
///
/// A full database (the quota fault) still counts as available when it
/// already holds data: the store works, it is just out of room. An empty store
/// that rejects its very first write is treated as unavailable.
fn probe_outcome(result: rusqlite::Result<()>, store_is_empty: bool) -> bool {
  match result {
    Ok(()) => true,
    Err(e) if is_quota_exceeded(&e) => !store_is_empty,
    Err(_) => false,
  }
}

fn is_quota_exceeded(err: &rusqlite::Error) -> bool {
  matches!(err, rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::DiskFull)
}

impl KeyValueStore for SqliteStore {
  fn get(&self, key: &str) -> Option<String> {
    self.try_get(key).unwrap_or_else(|e| {
      warn!(tier = %self.tier, error = %e, "storage read failed");
      None
    })
  }

  fn set(&self, key: &str, value: &str) {
    if let Err(e) = self.try_set(key, value) {
      warn!(tier = %self.tier, error = %e, "storage write failed");
    }
  }

  fn remove(&self, key: &str) {
    if let Err(e) = self.try_remove(key) {
      warn!(tier = %self.tier, error = %e, "storage remove failed");
    }
  }

  fn probe(&self) -> bool {
    let conn = match self.conn() {
      Ok(conn) => conn,
      Err(e) => {
        debug!(tier = %self.tier, error = %e, "probe could not acquire connection");
        return false;
      }
    };

    let result = Self::write_probe(&conn, &self.namespaced(PROBE_KEY));
    if let Err(e) = &result {
      debug!(tier = %self.tier, error = %e, "probe write failed");
    }
    probe_outcome(result, Self::is_empty(&conn))
  }

  fn tier(&self) -> Tier {
    self.tier
  }
}
