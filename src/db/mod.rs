//! SQLite connection helpers shared by the durable storage tiers and the
//! offline cache.

use color_eyre::{eyre::eyre, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Open or create a database at `path` and apply `schema`.
pub fn open_database(path: &Path, schema: &str) -> Result<Connection> {
  // Ensure parent directory exists
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)
      .map_err(|e| eyre!("Failed to create database directory: {}", e))?;
  }

  let conn = Connection::open(path)
    .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;

  run_migrations(&conn, schema)?;
  Ok(conn)
}

/// Open a private in-memory database and apply `schema`.
pub fn open_in_memory(schema: &str) -> Result<Connection> {
  let conn =
    Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;
  run_migrations(&conn, schema)?;
  Ok(conn)
}

fn run_migrations(conn: &Connection, schema: &str) -> Result<()> {
  conn
    .execute_batch(schema)
    .map_err(|e| eyre!("Failed to run migrations: {}", e))
}

/// Per-user data directory for plus (`$XDG_DATA_HOME/plus`).
pub fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("plus"))
}

/// Per-login-session directory for plus.
///
/// Uses `$XDG_RUNTIME_DIR`, which is cleared on logout. Platforms without one
/// fall back to the OS temp directory, cleared on reboot.
pub fn session_dir() -> PathBuf {
  dirs::runtime_dir()
    .unwrap_or_else(std::env::temp_dir)
    .join("plus")
}

/// Per-user cache directory for plus (`$XDG_CACHE_HOME/plus`).
pub fn cache_dir() -> Result<PathBuf> {
  let cache_dir = dirs::cache_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".cache")))
    .ok_or_else(|| eyre!("Could not determine cache directory"))?;

  Ok(cache_dir.join("plus"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_open_database_creates_parent_dirs() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("test.db");

    let conn = open_database(&path, "CREATE TABLE IF NOT EXISTS t (x INTEGER);").unwrap();
    conn.execute("INSERT INTO t (x) VALUES (1)", []).unwrap();

    assert!(path.exists());
  }

  #[test]
  fn test_schema_is_reapplied_idempotently() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    let schema = "CREATE TABLE IF NOT EXISTS t (x INTEGER);";

    drop(open_database(&path, schema).unwrap());
    let conn = open_database(&path, schema).unwrap();
    let count: i64 = conn
      .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
      .unwrap();
    assert_eq!(count, 0);
  }
}
