//! Registry fetch client
//!
//! The pipeline only needs "GET this URL and hand me parsed JSON". The HTTP
//! implementation keeps a force-cache on disk: once a URL has a cached body
//! it is reused regardless of age until the cache directory is cleared or a
//! refresh is requested.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Request timeout for a single registry page
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Seam between the pipeline and the network
#[async_trait]
pub trait FetchClient: Send + Sync {
    /// Fetch `url` and return its parsed JSON body
    async fn get_json(&self, url: &str) -> Result<Value>;
}

/// reqwest-backed client with an on-disk response cache
pub struct HttpFetchClient {
    client: reqwest::Client,
    cache_dir: Option<PathBuf>,
    refresh: bool,
}

impl HttpFetchClient {
    /// Create a client without a response cache
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pkgdex/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            cache_dir: None,
            refresh: false,
        })
    }

    /// Create a client caching responses under `cache_dir`
    ///
    /// With `refresh` set, cached bodies are never read but fresh responses
    /// still overwrite them.
    pub fn with_cache(cache_dir: impl Into<PathBuf>, refresh: bool) -> Result<Self> {
        let mut client = Self::new()?;
        client.cache_dir = Some(cache_dir.into());
        client.refresh = refresh;
        Ok(client)
    }

    /// Cache file for a URL
    pub fn cache_path_for_url(cache_dir: &Path, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        cache_dir.join(format!("response_{}.json", hex::encode(digest)))
    }

    async fn load_cached(&self, url: &str) -> Option<Value> {
        let cache_dir = self.cache_dir.as_ref()?;
        if self.refresh {
            return None;
        }

        let path = Self::cache_path_for_url(cache_dir, url);
        let bytes = tokio::fs::read(&path).await.ok()?;

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                tracing::debug!("Using cached response for {}", url);
                Some(value)
            }
            Err(e) => {
                tracing::warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn save_to_cache(&self, url: &str, body: &[u8]) -> Result<()> {
        let Some(cache_dir) = &self.cache_dir else {
            return Ok(());
        };

        tokio::fs::create_dir_all(cache_dir).await.with_context(|| {
            format!("Failed to create cache directory: {}", cache_dir.display())
        })?;

        let path = Self::cache_path_for_url(cache_dir, url);
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write cache: {}", path.display()))?;

        tracing::debug!("Saved response to cache: {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl FetchClient for HttpFetchClient {
    async fn get_json(&self, url: &str) -> Result<Value> {
        if let Some(cached) = self.load_cached(url).await {
            return Ok(cached);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("Registry request failed: HTTP {} from {}", response.status(), url);
        }

        let body = response
            .bytes()
            .await
            .context("Failed to read response body")?;

        let value = serde_json::from_slice(&body)
            .with_context(|| format!("Registry returned invalid JSON from {url}"))?;

        // Caching is best effort
        if let Err(e) = self.save_to_cache(url, &body).await {
            tracing::warn!("Failed to save response to cache: {}", e);
        }

        Ok(value)
    }
}
