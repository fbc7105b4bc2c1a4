//! Core traits and types for the offline cache.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use reqwest::Method;
use std::future::Future;

/// A resource request, addressed by path relative to the app origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  pub method: Method,
  pub path: String,
}

impl Request {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::GET, path)
  }
}

/// A resource response, either cached or fresh from the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
}

impl Response {
  pub fn ok(content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status: 200,
      content_type: content_type.map(String::from),
      body: body.into(),
    }
  }

  /// Whether the status is in the 2xx range.
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Result of an intercepted request, including where it was answered from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new result from cached data.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Live network fetch
  Network,
  /// Current cache generation
  Cache,
}

/// Network access for the offline cache.
pub trait Fetch: Send + Sync {
  /// Perform a live request. Non-2xx statuses are returned as responses;
  /// only transport failures are errors.
  fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send;
}
