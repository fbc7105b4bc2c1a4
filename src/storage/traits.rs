//! The key-value contract shared by all storage tiers.

use std::fmt;
use std::sync::Arc;

/// Throwaway key written and deleted while probing a tier.
pub const PROBE_KEY: &str = "__storage_test__";

/// Which storage mechanism a store is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
  /// Durable across process restarts
  Local,
  /// Durable for the current login session only
  Session,
  /// Lost when the process exits
  Memory,
}

impl Tier {
  /// Whether data written to this tier outlives the process.
  pub fn is_durable(self) -> bool {
    !matches!(self, Tier::Memory)
  }
}

impl fmt::Display for Tier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Tier::Local => "local",
      Tier::Session => "session",
      Tier::Memory => "memory",
    };
    f.write_str(name)
  }
}

/// String key-value store.
///
/// Operations never fail from the caller's point of view. Implementations log
/// internal faults and degrade: `get` returns `None`, writes are dropped.
pub trait KeyValueStore: Send + Sync {
  /// Read the value stored under `key`.
  fn get(&self, key: &str) -> Option<String>;

  /// Store `value` under `key`, replacing any previous value.
  fn set(&self, key: &str, value: &str);

  /// Delete `key`. Removing a missing key is a no-op.
  fn remove(&self, key: &str);

  /// Check that the store accepts writes by writing and deleting
  /// [`PROBE_KEY`]. Has no other side effects.
  fn probe(&self) -> bool;

  /// The tier this store belongs to.
  fn tier(&self) -> Tier;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
  fn get(&self, key: &str) -> Option<String> {
    (**self).get(key)
  }

  fn set(&self, key: &str, value: &str) {
    (**self).set(key, value)
  }

  fn remove(&self, key: &str) {
    (**self).remove(key)
  }

  fn probe(&self) -> bool {
    (**self).probe()
  }

  fn tier(&self) -> Tier {
    (**self).tier()
  }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
  fn get(&self, key: &str) -> Option<String> {
    (**self).get(key)
  }

  fn set(&self, key: &str, value: &str) {
    (**self).set(key, value)
  }

  fn remove(&self, key: &str) {
    (**self).remove(key)
  }

  fn probe(&self) -> bool {
    (**self).probe()
  }

  fn tier(&self) -> Tier {
    (**self).tier()
  }
}
