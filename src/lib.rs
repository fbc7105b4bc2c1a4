//! Named counters with tiered local persistence, plus an offline cache for
//! the application shell.

pub mod config;
pub mod counter;
pub mod db;
pub mod logging;
pub mod offline;
pub mod storage;

pub use config::Config;
pub use counter::{Counter, CounterStore};
pub use offline::OfflineCache;
pub use storage::{KeyValueStore, StorageBackend, Tier};
