//! Precache manifest and cache generation naming.

pub const DEFAULT_APP: &str = "plus";
pub const DEFAULT_VERSION: &str = "0.0.2";

/// The application shell.
pub const DEFAULT_ASSETS: &[&str] = &[
  "/",
  "/main.js",
  "/service-workers.js",
  "/style.css",
  "/icon-256x256.png",
  "/icon-512x512.png",
  "/manifest.json",
  "/js/core.js",
  "/assets/hamburger.svg",
  "/assets/minus.svg",
  "/assets/plus.svg",
  "/assets/icon.svg",
];

/// The asset set for one cache generation.
///
/// Immutable once built. A different asset set or version means a new
/// `Manifest`, and a new version means a new generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
  app: String,
  version: String,
  assets: Vec<String>,
}

impl Manifest {
  /// Build a manifest. Repeated paths are dropped, first occurrence wins.
  pub fn new<I, P>(app: &str, version: &str, assets: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<String>,
  {
    let mut unique: Vec<String> = Vec::new();
    for path in assets {
      let path = path.into();
      if !unique.contains(&path) {
        unique.push(path);
      }
    }

    Self {
      app: app.to_string(),
      version: version.to_string(),
      assets: unique,
    }
  }

  pub fn app(&self) -> &str {
    &self.app
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  /// Name of this manifest's cache generation: `<app>-<version>`.
  pub fn cache_name(&self) -> String {
    format!("{}-{}", self.app, self.version)
  }
}

impl Default for Manifest {
  fn default() -> Self {
    Self::new(DEFAULT_APP, DEFAULT_VERSION, DEFAULT_ASSETS.iter().copied())
  }
}
