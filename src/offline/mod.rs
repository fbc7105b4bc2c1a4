//! Offline asset cache.
//!
//! This module keeps an application shell available without a network:
//! - `install` precaches a fixed manifest into a version-named generation
//! - `activate` deletes every generation but the current one
//! - `handle_fetch` answers requests cache-first, falling back to the network
//!
//! Responses fetched after install are never written to the cache.

mod fetch;
mod manager;
mod manifest;
mod storage;
mod traits;

pub use fetch::HttpFetcher;
pub use manager::{AssetFailure, InstallReport, Lifecycle, OfflineCache};
pub use manifest::{Manifest, DEFAULT_APP, DEFAULT_ASSETS, DEFAULT_VERSION};
pub use storage::{CacheStore, CachedResponse, SqliteCacheStore};
pub use traits::{CacheResult, CacheSource, Fetch, Request, Response};
