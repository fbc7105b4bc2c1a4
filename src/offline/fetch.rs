//! HTTP network access for the offline cache.

use color_eyre::{eyre::eyre, Result};
use reqwest::header::CONTENT_TYPE;
use url::Url;

use super::traits::{Fetch, Request, Response};

/// Fetches request paths from a fixed origin over HTTP.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
  origin: Url,
}

impl HttpFetcher {
  pub fn new(origin: Url) -> Result<Self> {
    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, origin })
  }

  /// Absolute URL for a request path.
  pub fn resolve(&self, path: &str) -> Result<Url> {
    self
      .origin
      .join(path)
      .map_err(|e| eyre!("Invalid request path {}: {}", path, e))
  }
}

impl Fetch for HttpFetcher {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    let url = self.resolve(&request.path)?;

    let response = self
      .client
      .request(request.method.clone(), url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch {}: {}", url, e))?;

    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body of {}: {}", url, e))?;

    Ok(Response {
      status,
      content_type,
      body: body.to_vec(),
    })
  }
}
