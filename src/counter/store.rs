//! Counter persistence on top of a [`KeyValueStore`].

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::id::IdMinter;
use crate::storage::{KeyValueStore, StorageBackend};

/// Key holding the JSON array of listed counter ids.
pub const LIST_KEY: &str = "list";
pub const TOTAL_SUFFIX: &str = "_total";
pub const NAME_SUFFIX: &str = "_name";

/// Display name for counters whose name entry is missing.
pub const UNNAMED_COUNTER: &str = "Unnamed counter";

/// Name given to the counter created when none exists yet.
pub const FALLBACK_NAME: &str = "Unnamed";

/// A snapshot of one counter, read fresh from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
  pub id: String,
  pub name: String,
  pub total: u64,
}

/// Counter operations.
///
/// Nothing is cached here: every read goes to the backing store. All
/// operations are infallible; corrupted data reads as a safe default and is
/// reported through `tracing`.
pub struct CounterStore<S: KeyValueStore = StorageBackend> {
  storage: Arc<S>,
  ids: IdMinter,
}

impl<S: KeyValueStore> CounterStore<S> {
  pub fn new(storage: S) -> Self {
    Self::with_shared(Arc::new(storage))
  }

  pub fn with_shared(storage: Arc<S>) -> Self {
    Self {
      storage,
      ids: IdMinter::new(),
    }
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  fn total_key(id: &str) -> String {
    format!("{}{}", id, TOTAL_SUFFIX)
  }

  fn name_key(id: &str) -> String {
    format!("{}{}", id, NAME_SUFFIX)
  }

  /// Create a counter and append it to the list. Returns its id.
  pub fn create(&self, name: &str) -> String {
    let id = self.ids.mint(name);

    let mut list = self.get_list();
    list.push(id.clone());
    self.set_list(&list);

    self.set_name(&id, name);
    self.set_total(&id, 0);

    info!(%id, name, "created counter");
    id
  }

  /// Remove `id` from the list. Same as [`CounterStore::unlist`].
  pub fn delete(&self, id: &str) {
    self.unlist(id)
  }

  /// Remove `id` from the list, keeping its total and name entries.
  ///
  /// A later [`CounterStore::purge_data`] erases those. Unlisting an id that
  /// is not listed writes nothing.
  pub fn unlist(&self, id: &str) {
    let list = self.get_list();
    if !list.iter().any(|listed| listed == id) {
      debug!(%id, "unlist: not in list");
      return;
    }

    let remaining: Vec<String> = list.into_iter().filter(|listed| listed != id).collect();
    self.set_list(&remaining);
    info!(%id, "unlisted counter");
  }

  /// Erase the total and name entries of `id`. The list is left alone.
  pub fn purge_data(&self, id: &str) {
    self.storage.remove(&Self::total_key(id));
    self.storage.remove(&Self::name_key(id));
    info!(%id, "purged counter data");
  }

  /// Current total. Missing, non-numeric and negative values read as 0.
  pub fn get_total(&self, id: &str) -> u64 {
    let Some(raw) = self.storage.get(&Self::total_key(id)) else {
      return 0;
    };

    match raw.trim().parse::<i64>() {
      Ok(total) if total >= 0 => total as u64,
      Ok(total) => {
        debug!(%id, total, "negative total read as 0");
        0
      }
      Err(_) if raw.is_empty() => 0,
      Err(e) => {
        warn!(%id, raw = %raw, error = %e, "corrupted counter total, using 0");
        0
      }
    }
  }

  /// Overwrite the total. Not clamped; negative values read back as 0.
  pub fn set_total(&self, id: &str, total: i64) {
    self.storage.set(&Self::total_key(id), &total.to_string());
  }

  /// Increment by one. Returns the new total.
  pub fn add(&self, id: &str) -> u64 {
    let next = self.get_total(id).saturating_add(1);
    self.set_total(id, i64::try_from(next).unwrap_or(i64::MAX));
    next
  }

  /// Decrement by one. Returns the value written, which is `-1` when the
  /// counter was already at 0.
  pub fn subtract(&self, id: &str) -> i64 {
    let next = i64::try_from(self.get_total(id)).unwrap_or(i64::MAX) - 1;
    self.set_total(id, next);
    next
  }

  /// Display name, or [`UNNAMED_COUNTER`] when none is stored.
  ///
  /// This is a pure read; use [`CounterStore::normalize_name`] to persist the
  /// placeholder.
  pub fn get_name(&self, id: &str) -> String {
    match self.storage.get(&Self::name_key(id)) {
      Some(name) if !name.is_empty() => name,
      _ => {
        warn!(%id, "unnamed counter");
        UNNAMED_COUNTER.to_string()
      }
    }
  }

  /// Persist [`UNNAMED_COUNTER`] if the counter has no name.
  ///
  /// Returns whether a write happened.
  pub fn normalize_name(&self, id: &str) -> bool {
    let key = Self::name_key(id);
    match self.storage.get(&key) {
      Some(name) if !name.is_empty() => false,
      _ => {
        self.storage.set(&key, UNNAMED_COUNTER);
        info!(%id, "stored placeholder name");
        true
      }
    }
  }

  /// Like [`normalize_name`](Self::normalize_name), but leaves ids that are
  /// not in the list untouched so a stray id never leaves data behind.
  pub fn normalize_listed_name(&self, id: &str) -> bool {
    if !self.is_listed(id) {
      debug!(%id, "not listed, name left as is");
      return false;
    }
    self.normalize_name(id)
  }

  pub fn set_name(&self, id: &str, name: &str) {
    self.storage.set(&Self::name_key(id), name);
  }

  /// Listed counter ids in creation order.
  ///
  /// A malformed list reads as empty. The empty list is not written back;
  /// the next list change overwrites the bad value.
  pub fn get_list(&self) -> Vec<String> {
    let raw = match self.storage.get(LIST_KEY) {
      Some(raw) if !raw.is_empty() => raw,
      _ => return Vec::new(),
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
      error!(raw = %raw, error = %e, "corrupted counter list");
      Vec::new()
    })
  }

  pub fn is_listed(&self, id: &str) -> bool {
    self.get_list().iter().any(|listed| listed == id)
  }

  pub(crate) fn set_list(&self, list: &[String]) {
    match serde_json::to_string(list) {
      Ok(json) => self.storage.set(LIST_KEY, &json),
      Err(e) => error!(error = %e, "failed to serialize counter list"),
    }
  }

  /// Resolve which counter a front-end should show.
  ///
  /// 1. A non-empty `requested` id, as-is
  /// 2. The first listed counter
  /// 3. A newly created counter named [`FALLBACK_NAME`]
  pub fn current(&self, requested: Option<&str>) -> String {
    if let Some(id) = requested.filter(|id| !id.is_empty()) {
      return id.to_string();
    }

    if let Some(first) = self.get_list().into_iter().next() {
      return first;
    }

    self.create(FALLBACK_NAME)
  }

  /// Snapshot of every listed counter, in list order.
  pub fn counters(&self) -> Vec<Counter> {
    self
      .get_list()
      .into_iter()
      .map(|id| Counter {
        name: self.get_name(&id),
        total: self.get_total(&id),
        id,
      })
      .collect()
  }
}
