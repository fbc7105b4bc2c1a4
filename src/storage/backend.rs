//! One-time tier selection.

use tracing::{info, warn};

use super::memory::MemoryStore;
use super::sqlite::SqliteStore;
use super::traits::{KeyValueStore, Tier};
use crate::config::StorageConfig;

/// The store selected at startup.
///
/// Construct once and hand it to whatever needs persistence; the chosen tier
/// is fixed for the lifetime of the value.
pub struct StorageBackend {
  inner: Box<dyn KeyValueStore>,
}

impl StorageBackend {
  /// Pick the first candidate whose probe succeeds, in order.
  ///
  /// Falls back to a [`MemoryStore`] when every candidate fails, so this
  /// always returns a usable backend.
  pub fn select(candidates: Vec<Box<dyn KeyValueStore>>) -> Self {
    for candidate in candidates {
      let tier = candidate.tier();
      if candidate.probe() {
        info!(%tier, "selected storage tier");
        return Self { inner: candidate };
      }
      warn!(%tier, "storage tier unavailable, trying next");
    }

    warn!("no durable storage available, counters will not persist");
    Self {
      inner: Box::new(MemoryStore::new()),
    }
  }

  /// Build the local and session candidates from `config` and select one.
  pub fn open(config: &StorageConfig) -> Self {
    let mut candidates: Vec<Box<dyn KeyValueStore>> = Vec::new();

    match config.local_path() {
      Ok(path) => match SqliteStore::open(&path, Tier::Local, &config.prefix) {
        Ok(store) => candidates.push(Box::new(store)),
        Err(e) => warn!(tier = %Tier::Local, error = %e, "could not open storage"),
      },
      Err(e) => warn!(tier = %Tier::Local, error = %e, "no storage location"),
    }

    let session_path = config.session_path();
    match SqliteStore::open(&session_path, Tier::Session, &config.prefix) {
      Ok(store) => candidates.push(Box::new(store)),
      Err(e) => warn!(tier = %Tier::Session, error = %e, "could not open storage"),
    }

    Self::select(candidates)
  }

  /// A backend with no durable tier at all.
  pub fn in_memory() -> Self {
    Self::select(Vec::new())
  }
}

impl KeyValueStore for StorageBackend {
  fn get(&self, key: &str) -> Option<String> {
    self.inner.get(key)
  }

  fn set(&self, key: &str, value: &str) {
    self.inner.set(key, value)
  }

  fn remove(&self, key: &str) {
    self.inner.remove(key)
  }

  fn probe(&self) -> bool {
    self.inner.probe()
  }

  fn tier(&self) -> Tier {
    self.inner.tier()
  }
}
