//! Tiered key-value persistence.
//!
//! Counters are stored through a small string key-value contract that every
//! tier satisfies:
//! - `Local`: SQLite database in the user data directory, survives restarts
//! - `Session`: SQLite database in the per-session runtime directory
//! - `Memory`: process-lifetime map, used when nothing durable is available
//!
//! The tier is picked once by [`StorageBackend::open`] and never changes.

mod backend;
mod memory;
mod sqlite;
mod traits;

pub use backend::StorageBackend;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{KeyValueStore, Tier, PROBE_KEY};
