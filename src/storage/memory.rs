//! Process-lifetime fallback tier.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::traits::{KeyValueStore, Tier};

/// In-memory store. Always available, never persistent.
///
/// Keys are stored without the namespace prefix.
#[derive(Debug, Default)]
pub struct MemoryStore {
  data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  // No operation leaves the map half-updated, so poisoning is recoverable.
  fn data(&self) -> MutexGuard<'_, HashMap<String, String>> {
    self.data.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Option<String> {
    self.data().get(key).cloned()
  }

  fn set(&self, key: &str, value: &str) {
    self.data().insert(key.to_string(), value.to_string());
  }

  fn remove(&self, key: &str) {
    self.data().remove(key);
  }

  fn probe(&self) -> bool {
    true
  }

  fn tier(&self) -> Tier {
    Tier::Memory
  }
}
