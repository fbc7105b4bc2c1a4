use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::db;
use crate::offline::{Manifest, DEFAULT_APP, DEFAULT_ASSETS, DEFAULT_VERSION};

/// Namespace prefix applied to keys in the durable tiers.
pub const DEFAULT_PREFIX: &str = "plus_";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub offline: OfflineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
  /// Local tier database (defaults to $XDG_DATA_HOME/plus/storage.db)
  pub path: Option<PathBuf>,
  /// Session tier database (defaults to $XDG_RUNTIME_DIR/plus/session.db)
  pub session_path: Option<PathBuf>,
  #[serde(default = "default_prefix")]
  pub prefix: String,
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self {
      path: None,
      session_path: None,
      prefix: default_prefix(),
    }
  }
}

impl StorageConfig {
  pub fn local_path(&self) -> Result<PathBuf> {
    match &self.path {
      Some(p) => Ok(p.clone()),
      None => Ok(db::data_dir()?.join("storage.db")),
    }
  }

  pub fn session_path(&self) -> PathBuf {
    self
      .session_path
      .clone()
      .unwrap_or_else(|| db::session_dir().join("session.db"))
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfflineConfig {
  /// Origin that manifest paths and intercepted requests are resolved against
  #[serde(default = "default_origin")]
  pub origin: Url,
  #[serde(default = "default_app")]
  pub app: String,
  /// Bumping this is the only way to invalidate older cache generations
  #[serde(default = "default_version")]
  pub version: String,
  #[serde(default = "default_assets")]
  pub manifest: Vec<String>,
  /// Cache database (defaults to $XDG_CACHE_HOME/plus/offline.db)
  pub cache_path: Option<PathBuf>,
}

impl Default for OfflineConfig {
  fn default() -> Self {
    Self {
      origin: default_origin(),
      app: default_app(),
      version: default_version(),
      manifest: default_assets(),
      cache_path: None,
    }
  }
}

impl OfflineConfig {
  pub fn manifest(&self) -> Manifest {
    Manifest::new(&self.app, &self.version, self.manifest.iter().cloned())
  }

  pub fn cache_path(&self) -> Result<PathBuf> {
    match &self.cache_path {
      Some(p) => Ok(p.clone()),
      None => Ok(db::cache_dir()?.join("offline.db")),
    }
  }
}

fn default_prefix() -> String {
  DEFAULT_PREFIX.to_string()
}

fn default_origin() -> Url {
  Url::parse("http://localhost:8080/").expect("static origin is a valid URL")
}

fn default_app() -> String {
  DEFAULT_APP.to_string()
}

fn default_version() -> String {
  DEFAULT_VERSION.to_string()
}

fn default_assets() -> Vec<String> {
  DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./plus.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/plus/config.yaml
  ///
  /// With no file found, defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("plus.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("plus").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file is valid and means "all defaults".
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))
  }
}
