//! Go module proxy client
//!
//! Implements the read side of the GOPROXY protocol:
//!
//! | Call | Endpoint | Cache key | TTL |
//! |------|----------|-----------|-----|
//! | `latest` | `/{module}/@latest` | `module@latest` | 5 min |
//! | `versions` | `/{module}/@v/list` | `module@list` | 5 min |
//! | `info` | `/{module}/@v/{version}.info` | `module@version` | 1 h |
//! | `manifest` | `/{module}/@v/{version}.mod` | `module@version.mod` | 1 h |
//!
//! Concurrent misses for the same key are not coalesced; both requests go out
//! and the last one to finish wins the cache slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::version::cache::{DEFAULT_SWEEP_INTERVAL, SweepHandle, VersionCache};
use crate::version::error::{RegistryError, TransportCause};
use crate::version::registry::ModuleRegistry;
use crate::version::types::{CachedResponse, VersionInfo};

/// Default base URL for Go proxy
pub const DEFAULT_BASE_URL: &str = "https://proxy.golang.org";

/// Default number of requests allowed in flight at once
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Default timeout of a single HTTP request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// TTL for answers that move over time (`@latest`, `@v/list`)
pub const DEFAULT_LATEST_TTL: Duration = Duration::from_secs(5 * 60);

/// TTL for answers about a fixed version, which never change
pub const DEFAULT_INFO_TTL: Duration = Duration::from_secs(60 * 60);

/// Settings for [`RegistryClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Proxy origin; empty means [`DEFAULT_BASE_URL`]
    pub base_url: String,
    pub timeout: Duration,
    pub max_concurrent: usize,
    pub latest_ttl: Duration,
    pub info_ttl: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            latest_ttl: DEFAULT_LATEST_TTL,
            info_ttl: DEFAULT_INFO_TTL,
        }
    }
}

/// Caching, rate-limited client for a Go module proxy
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
    cache: Arc<VersionCache<CachedResponse>>,
    gate: Semaphore,
    latest_ttl: Duration,
    info_ttl: Duration,
    _sweeper: Option<SweepHandle>,
}

impl RegistryClient {
    /// Creates a client with default settings against `base_url`
    pub fn new(base_url: &str) -> Result<Self, RegistryError> {
        Self::with_options(ClientOptions {
            base_url: base_url.to_string(),
            ..ClientOptions::default()
        })
    }

    pub fn with_options(options: ClientOptions) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gx/", env!("CARGO_PKG_VERSION")))
            .timeout(options.timeout)
            .build()
            .map_err(RegistryError::Client)?;

        let cache = VersionCache::shared();
        let sweeper = start_sweeper_if_in_runtime(&cache);

        Ok(Self {
            http,
            base_url: normalize_base_url(&options.base_url),
            cache,
            gate: Semaphore::new(options.max_concurrent.max(1)),
            latest_ttl: options.latest_ttl,
            info_ttl: options.info_ttl,
            _sweeper: sweeper,
        })
    }

    /// Replaces the response cache, e.g. to share one cache between clients
    pub fn with_cache(mut self, cache: Arc<VersionCache<CachedResponse>>) -> Self {
        self._sweeper = start_sweeper_if_in_runtime(&cache);
        self.cache = cache;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache(&self) -> &Arc<VersionCache<CachedResponse>> {
        &self.cache
    }

    /// Number of request slots currently free
    pub fn available_permits(&self) -> usize {
        self.gate.available_permits()
    }

    fn cached(&self, key: &str) -> Option<CachedResponse> {
        let cached = self.cache.get(key);
        match &cached {
            Some(response) => debug!("Cache hit for {} ({})", key, response.kind()),
            None => debug!("Cache miss for {}", key),
        }
        cached
    }

    /// Waits for a request slot unless the caller cancels first.
    ///
    /// Cancellation is checked before the slot, so an already cancelled call
    /// never reaches the network even when slots are free.
    async fn admit(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SemaphorePermit<'_>, RegistryError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RegistryError::AdmissionCancelled),
            permit = self.gate.acquire() => permit.map_err(|_| RegistryError::AdmissionCancelled),
        }
    }

    /// Issues one GET and returns the body of a 2xx response
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, RegistryError> {
        // Released on every return path, including errors
        let _permit = self.admit(cancel).await?;

        debug!("GET {}", url);
        let request = async {
            let response = self.http.get(url).send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let transport_error = |source: TransportCause| RegistryError::Transport {
            url: url.to_string(),
            source,
        };

        let (status, body) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(transport_error(TransportCause::Cancelled)),
            result = request => result.map_err(|e| transport_error(TransportCause::Http(e)))?,
        };

        if !status.is_success() {
            warn!("Go proxy returned status {}: {}", status, url);
            return Err(RegistryError::UpstreamStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body.to_vec())
    }

    async fn fetch_info(
        &self,
        url: String,
        cache_key: String,
        ttl: Duration,
        cancel: &CancellationToken,
    ) -> Result<VersionInfo, RegistryError> {
        let body = self.fetch(&url, cancel).await?;
        let info: VersionInfo =
            serde_json::from_slice(&body).map_err(|source| RegistryError::Decode {
                url: url.clone(),
                source,
            })?;

        self.cache
            .set(cache_key, CachedResponse::Info(info.clone()), ttl);
        Ok(info)
    }
}

#[async_trait::async_trait]
impl ModuleRegistry for RegistryClient {
    async fn latest(
        &self,
        module_path: &str,
        cancel: &CancellationToken,
    ) -> Result<VersionInfo, RegistryError> {
        let cache_key = format!("{}@latest", module_path);
        if let Some(info) = self.cached(&cache_key).and_then(CachedResponse::into_info) {
            return Ok(info);
        }

        let url = format!("{}/{}/@latest", self.base_url, encode_module_path(module_path));
        self.fetch_info(url, cache_key, self.latest_ttl, cancel)
            .await
    }

    async fn versions(
        &self,
        module_path: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RegistryError> {
        let cache_key = format!("{}@list", module_path);
        if let Some(versions) = self
            .cached(&cache_key)
            .and_then(CachedResponse::into_version_list)
        {
            return Ok(versions);
        }

        let url = format!("{}/{}/@v/list", self.base_url, encode_module_path(module_path));
        let body = self.fetch(&url, cancel).await?;

        // One version per line. An empty body still yields one empty entry.
        let versions: Vec<String> = String::from_utf8_lossy(&body)
            .trim()
            .split('\n')
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect();

        self.cache.set(
            cache_key,
            CachedResponse::VersionList(versions.clone()),
            self.latest_ttl,
        );
        Ok(versions)
    }

    async fn info(
        &self,
        module_path: &str,
        version: &str,
        cancel: &CancellationToken,
    ) -> Result<VersionInfo, RegistryError> {
        let cache_key = format!("{}@{}", module_path, version);
        if let Some(info) = self.cached(&cache_key).and_then(CachedResponse::into_info) {
            return Ok(info);
        }

        let url = format!(
            "{}/{}/@v/{}.info",
            self.base_url,
            encode_module_path(module_path),
            version
        );
        self.fetch_info(url, cache_key, self.info_ttl, cancel).await
    }

    async fn manifest(
        &self,
        module_path: &str,
        version: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, RegistryError> {
        let cache_key = format!("{}@{}.mod", module_path, version);
        if let Some(data) = self
            .cached(&cache_key)
            .and_then(CachedResponse::into_manifest)
        {
            return Ok(data.to_vec());
        }

        let url = format!(
            "{}/{}/@v/{}.mod",
            self.base_url,
            encode_module_path(module_path),
            version
        );
        let data = self.fetch(&url, cancel).await?;

        self.cache.set(
            cache_key,
            CachedResponse::Manifest(Arc::from(data.as_slice())),
            self.info_ttl,
        );
        Ok(data)
    }
}

fn start_sweeper_if_in_runtime(cache: &Arc<VersionCache<CachedResponse>>) -> Option<SweepHandle> {
    tokio::runtime::Handle::try_current()
        .ok()
        .map(|_| cache.start_sweeper(DEFAULT_SWEEP_INTERVAL))
}

fn normalize_base_url(base_url: &str) -> String {
    let base_url = if base_url.is_empty() {
        DEFAULT_BASE_URL
    } else {
        base_url
    };
    base_url.strip_suffix('/').unwrap_or(base_url).to_string()
}

/// Encodes a Go module path for use in proxy URLs.
/// Uppercase letters are escaped as !{lowercase}.
pub fn encode_module_path(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_ascii_uppercase() {
            result.push('!');
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
