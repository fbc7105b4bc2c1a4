//! Offline cache lifecycle: install, activate, and fetch interception.

use color_eyre::Result;
use futures::future::join_all;
use reqwest::Method;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::manifest::Manifest;
use super::storage::CacheStore;
use super::traits::{CacheResult, Fetch, Request, Response};

/// Where the cache is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
  /// Created, manifest not yet populated
  Installing,
  /// Manifest populated, older generations still present
  Installed,
  /// Older generations removed, serving requests cache-first
  Active,
}

/// A manifest entry that could not be precached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFailure {
  pub path: String,
  pub reason: String,
}

/// Outcome of [`OfflineCache::install`].
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
  /// Paths stored in the cache, in manifest order
  pub cached: Vec<String>,
  /// Paths that failed, in manifest order
  pub failed: Vec<AssetFailure>,
}

impl InstallReport {
  /// Whether every manifest entry was cached.
  pub fn is_complete(&self) -> bool {
    self.failed.is_empty()
  }
}

/// Precaches a manifest and answers requests cache-first.
///
/// The cache is written only during [`install`](Self::install): network
/// responses served later are never stored, and cached copies are refreshed
/// only by installing a new version.
pub struct OfflineCache<S: CacheStore, F: Fetch> {
  storage: Arc<S>,
  fetcher: F,
  manifest: Manifest,
  state: Lifecycle,
}

impl<S: CacheStore, F: Fetch> OfflineCache<S, F> {
  pub fn new(storage: S, fetcher: F, manifest: Manifest) -> Self {
    Self::with_shared(Arc::new(storage), fetcher, manifest)
  }

  pub fn with_shared(storage: Arc<S>, fetcher: F, manifest: Manifest) -> Self {
    Self {
      storage,
      fetcher,
      manifest,
      state: Lifecycle::Installing,
    }
  }

  /// Pick up where a previous run left off.
  ///
  /// If the current generation exists and no stale generation is left, an
  /// earlier run already installed and activated it, so the cache goes
  /// straight to `Active`. Returns whether that happened.
  pub fn resume(&mut self) -> Result<bool> {
    let current = self.cache_name();
    let keys = self.storage.keys()?;
    let resumed = keys.len() == 1 && keys[0] == current;
    if resumed {
      debug!(cache = %current, "resuming active cache");
      self.state = Lifecycle::Active;
    }
    Ok(resumed)
  }

  pub fn state(&self) -> Lifecycle {
    self.state
  }

  pub fn manifest(&self) -> &Manifest {
    &self.manifest
  }

  pub fn cache_name(&self) -> String {
    self.manifest.cache_name()
  }

  /// Populate the current generation with every manifest entry.
  ///
  /// Entries are fetched concurrently and the call returns once all of them
  /// settled. A failed entry is logged and reported but does not fail the
  /// install. Only a storage fault opening the generation is an error.
  pub async fn install(&mut self) -> Result<InstallReport> {
    let cache_name = self.cache_name();
    info!(cache = %cache_name, "installing");

    self.storage.open(&cache_name)?;
    debug!(cache = %cache_name, assets = self.manifest.assets().len(), "caching app shell");

    let fetcher = &self.fetcher;
    let fetches = self.manifest.assets().iter().map(|path| async move {
      let outcome = fetcher.fetch(&Request::get(path.as_str())).await;
      (path, outcome)
    });
    let outcomes = join_all(fetches).await;

    let mut report = InstallReport::default();
    for (path, outcome) in outcomes {
      match self.store_asset(&cache_name, path, outcome) {
        Ok(()) => report.cached.push(path.clone()),
        Err(reason) => {
          warn!(cache = %cache_name, %path, %reason, "failed to precache asset");
          report.failed.push(AssetFailure {
            path: path.clone(),
            reason,
          });
        }
      }
    }

    info!(
      cache = %cache_name,
      cached = report.cached.len(),
      failed = report.failed.len(),
      "install finished"
    );
    self.state = Lifecycle::Installed;
    Ok(report)
  }

  fn store_asset(
    &self,
    cache_name: &str,
    path: &str,
    outcome: Result<Response>,
  ) -> std::result::Result<(), String> {
    let response = outcome.map_err(|e| e.to_string())?;
    if !response.is_success() {
      return Err(format!("unexpected status {}", response.status));
    }
    self
      .storage
      .put(cache_name, path, &response)
      .map_err(|e| e.to_string())
  }

  /// Delete every cache generation other than the current one.
  ///
  /// Returns the names of the deleted generations. Failing to delete one
  /// generation is logged and does not stop the sweep.
  pub async fn activate(&mut self) -> Result<Vec<String>> {
    let current = self.cache_name();
    if self.state == Lifecycle::Installing {
      warn!(cache = %current, "activating before install");
    }

    let mut removed = Vec::new();
    for key in self.storage.keys()? {
      if key == current {
        continue;
      }
      info!(cache = %key, "removing cache");
      match self.storage.delete(&key) {
        Ok(_) => removed.push(key),
        Err(e) => warn!(cache = %key, error = %e, "failed to remove cache"),
      }
    }

    self.state = Lifecycle::Active;
    Ok(removed)
  }

  /// Answer a request cache-first, falling back to the network.
  ///
  /// Returns `None` when the request failed; the error has been logged.
  /// Until activation, and for anything but GET, the cache is bypassed.
  pub async fn handle_fetch(&self, request: &Request) -> Option<CacheResult<Response>> {
    if self.state != Lifecycle::Active || request.method != Method::GET {
      debug!(method = %request.method, path = %request.path, "bypassing cache");
      return self.from_network(request).await;
    }

    let cache_name = self.cache_name();
    match self.storage.lookup(&cache_name, &request.path) {
      Ok(Some(cached)) => {
        debug!(path = %request.path, "cache hit");
        Some(CacheResult::from_cache(cached.response, cached.cached_at))
      }
      Ok(None) => self.from_network(request).await,
      Err(e) => {
        warn!(path = %request.path, error = %e, "cache lookup failed");
        None
      }
    }
  }

  async fn from_network(&self, request: &Request) -> Option<CacheResult<Response>> {
    match self.fetcher.fetch(request).await {
      Ok(response) => Some(CacheResult::from_network(response)),
      Err(e) => {
        warn!(path = %request.path, error = %e, "fetch failed");
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::offline::storage::SqliteCacheStore;
  use crate::offline::traits::CacheSource;
  use color_eyre::eyre::eyre;
  use std::collections::HashMap;
  use std::sync::Mutex;

  /// Serves a fixed set of paths and records every request it sees.
  #[derive(Clone, Default)]
  struct StubFetcher {
    responses: HashMap<String, Response>,
    calls: Arc<Mutex<Vec<String>>>,
  }

  impl StubFetcher {
    fn with(mut self, path: &str, response: Response) -> Self {
      self.responses.insert(path.to_string(), response);
      self
    }

    fn calls(&self) -> Vec<String> {
      self.calls.lock().unwrap().clone()
    }
  }

  impl Fetch for StubFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
      self.calls.lock().unwrap().push(request.path.clone());
      self
        .responses
        .get(&request.path)
        .cloned()
        .ok_or_else(|| eyre!("network unreachable for {}", request.path))
    }
  }

  fn html(body: &str) -> Response {
    Response::ok(Some("text/html"), body)
  }

  fn cache_with(
    fetcher: StubFetcher,
    version: &str,
    assets: &[&str],
  ) -> OfflineCache<SqliteCacheStore, StubFetcher> {
    let manifest = Manifest::new("shell", version, assets.iter().copied());
    OfflineCache::new(SqliteCacheStore::open_in_memory().unwrap(), fetcher, manifest)
  }

  #[tokio::test]
  async fn test_install_caches_manifest() {
    let fetcher = StubFetcher::default()
      .with("/", html("index"))
      .with("/main.js", Response::ok(Some("text/javascript"), "main()"));
    let mut cache = cache_with(fetcher, "v1", &["/", "/main.js"]);

    let report = cache.install().await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.cached, vec!["/", "/main.js"]);
    assert_eq!(cache.state(), Lifecycle::Installed);
    assert!(cache.storage.lookup("shell-v1", "/main.js").unwrap().is_some());
  }

  #[tokio::test]
  async fn test_install_tolerates_failed_assets() {
    let fetcher = StubFetcher::default()
      .with("/", html("index"))
      .with(
        "/gone.png",
        Response {
          status: 404,
          content_type: None,
          body: Vec::new(),
        },
      );
    let mut cache = cache_with(fetcher, "v1", &["/", "/missing.svg", "/gone.png"]);

    let report = cache.install().await.unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.cached, vec!["/"]);
    let failed: Vec<&str> = report.failed.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(failed, vec!["/missing.svg", "/gone.png"]);
    assert_eq!(cache.state(), Lifecycle::Installed);

    assert!(cache.storage.lookup("shell-v1", "/").unwrap().is_some());
    assert!(cache.storage.lookup("shell-v1", "/gone.png").unwrap().is_none());
  }

  #[tokio::test]
  async fn test_activate_removes_only_stale_generations() {
    let mut cache = cache_with(StubFetcher::default(), "v2", &[]);
    cache.storage.open("shell-v1").unwrap();
    cache.storage.open("shell-v2").unwrap();

    let removed = cache.activate().await.unwrap();

    assert_eq!(removed, vec!["shell-v1"]);
    assert_eq!(cache.storage.keys().unwrap(), vec!["shell-v2"]);
    assert_eq!(cache.state(), Lifecycle::Active);
  }

  #[tokio::test]
  async fn test_version_bump_replaces_generation() {
    let fetcher = StubFetcher::default().with("/", html("index"));
    let storage = Arc::new(SqliteCacheStore::open_in_memory().unwrap());

    let mut old = OfflineCache::with_shared(
      Arc::clone(&storage),
      fetcher.clone(),
      Manifest::new("shell", "v1", ["/"]),
    );
    old.install().await.unwrap();
    old.activate().await.unwrap();

    let mut new = OfflineCache::with_shared(
      Arc::clone(&storage),
      fetcher,
      Manifest::new("shell", "v2", ["/"]),
    );
    new.install().await.unwrap();
    assert_eq!(storage.keys().unwrap(), vec!["shell-v1", "shell-v2"]);

    assert_eq!(new.activate().await.unwrap(), vec!["shell-v1"]);
    assert_eq!(storage.keys().unwrap(), vec!["shell-v2"]);
  }

  #[tokio::test]
  async fn test_cache_hit_skips_network() {
    let fetcher = StubFetcher::default().with("/", html("index"));
    let mut cache = cache_with(fetcher.clone(), "v1", &["/"]);
    cache.install().await.unwrap();
    cache.activate().await.unwrap();
    let installed_calls = fetcher.calls().len();

    let result = cache.handle_fetch(&Request::get("/")).await.unwrap();

    assert_eq!(result.source, CacheSource::Cache);
    assert!(result.cached_at.is_some());
    assert_eq!(result.data.body, b"index");
    assert_eq!(fetcher.calls().len(), installed_calls);
  }

  #[tokio::test]
  async fn test_miss_is_served_from_network_and_not_cached() {
    let fetcher = StubFetcher::default().with("/data.json", Response::ok(None, "{}"));
    let mut cache = cache_with(fetcher.clone(), "v1", &[]);
    cache.install().await.unwrap();
    cache.activate().await.unwrap();

    let first = cache.handle_fetch(&Request::get("/data.json")).await.unwrap();
    assert_eq!(first.source, CacheSource::Network);
    assert!(cache.storage.lookup("shell-v1", "/data.json").unwrap().is_none());

    let second = cache.handle_fetch(&Request::get("/data.json")).await.unwrap();
    assert_eq!(second.source, CacheSource::Network);
    assert_eq!(fetcher.calls(), vec!["/data.json", "/data.json"]);
  }

  #[tokio::test]
  async fn test_network_failure_is_swallowed() {
    let mut cache = cache_with(StubFetcher::default(), "v1", &[]);
    cache.install().await.unwrap();
    cache.activate().await.unwrap();

    assert!(cache.handle_fetch(&Request::get("/offline.png")).await.is_none());
  }

  #[tokio::test]
  async fn test_bypasses_cache_before_activation() {
    let fetcher = StubFetcher::default().with("/", html("index"));
    let mut cache = cache_with(fetcher.clone(), "v1", &["/"]);
    cache.install().await.unwrap();

    let result = cache.handle_fetch(&Request::get("/")).await.unwrap();
    assert_eq!(result.source, CacheSource::Network);
  }

  #[tokio::test]
  async fn test_resume_after_previous_activation() {
    let fetcher = StubFetcher::default().with("/", html("index"));
    let storage = Arc::new(SqliteCacheStore::open_in_memory().unwrap());
    let manifest = Manifest::new("shell", "v1", ["/"]);

    let mut first =
      OfflineCache::with_shared(Arc::clone(&storage), fetcher.clone(), manifest.clone());
    assert!(!first.resume().unwrap());
    first.install().await.unwrap();
    first.activate().await.unwrap();

    let mut second = OfflineCache::with_shared(Arc::clone(&storage), fetcher, manifest);
    assert!(second.resume().unwrap());
    assert_eq!(second.state(), Lifecycle::Active);

    let result = second.handle_fetch(&Request::get("/")).await.unwrap();
    assert_eq!(result.source, CacheSource::Cache);
  }

  #[tokio::test]
  async fn test_no_resume_with_stale_generations() {
    let mut cache = cache_with(StubFetcher::default(), "v2", &[]);
    cache.storage.open("shell-v1").unwrap();
    cache.storage.open("shell-v2").unwrap();

    assert!(!cache.resume().unwrap());
    assert_eq!(cache.state(), Lifecycle::Installing);
  }

  #[tokio::test]
  async fn test_non_get_goes_to_network() {
    let fetcher = StubFetcher::default().with("/", html("index"));
    let mut cache = cache_with(fetcher.clone(), "v1", &["/"]);
    cache.install().await.unwrap();
    cache.activate().await.unwrap();

    let result = cache
      .handle_fetch(&Request::new(Method::POST, "/"))
      .await
      .unwrap();
    assert_eq!(result.source, CacheSource::Network);
  }
}
