//! Fetch interception policy.
//!
//! Decides, per request and in order: pass-through (non-GET or excluded
//! host), cache hit, network fetch with conditional store, or the offline
//! fallback document for failed navigations.

use std::sync::Arc;

use futures::future::BoxFuture;
use http::Method;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};
use url::Url;

use plaza_core::config::AppConfig;

use crate::cache::{CacheStorage, ResponseSnapshot};
use crate::SwError;

/// A request as seen by the interception layer.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub method: Method,
    /// Whether this is a full-page navigation rather than a sub-resource
    /// fetch.
    pub is_navigation: bool,
}

impl FetchRequest {
    /// Sub-resource GET request.
    pub fn get(url: Url) -> Self {
        Self {
            url,
            method: Method::GET,
            is_navigation: false,
        }
    }

    /// Full-page navigation request.
    pub fn navigate(url: Url) -> Self {
        Self {
            url,
            method: Method::GET,
            is_navigation: true,
        }
    }

    /// Request with an explicit method.
    pub fn with_method(url: Url, method: Method) -> Self {
        Self {
            url,
            method,
            is_navigation: false,
        }
    }
}

/// Network seam of the manager.
///
/// Production wires an HTTP client; tests inject a scripted fake.
pub trait Fetcher: Send + Sync {
    /// Issue the request against the network.
    fn fetch<'a>(
        &'a self,
        request: &'a FetchRequest,
    ) -> BoxFuture<'a, Result<ResponseSnapshot, SwError>>;
}

/// Outcome of running a request through the interception policy.
#[derive(Debug, Clone)]
pub enum FetchDecision {
    /// Not intercepted; default network handling applies.
    PassThrough,
    /// Served by the manager: cache hit, network result, or offline
    /// fallback.
    Respond(ResponseSnapshot),
}

impl FetchDecision {
    /// The served snapshot, if any.
    pub fn response(&self) -> Option<&ResponseSnapshot> {
        match self {
            FetchDecision::Respond(snapshot) => Some(snapshot),
            FetchDecision::PassThrough => None,
        }
    }
}

/// Cache-first request router for one worker instance.
pub struct FetchRouter {
    storage: Arc<RwLock<CacheStorage>>,
    fetcher: Arc<dyn Fetcher>,
    cache_name: String,
    offline_url: Url,
    bypass_hosts: Vec<String>,
}

impl FetchRouter {
    /// Build a router for the given configuration and page origin.
    pub fn new(
        config: &AppConfig,
        origin: &Url,
        storage: Arc<RwLock<CacheStorage>>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, SwError> {
        let offline_url = origin
            .join(&config.offline_document)
            .map_err(|e| SwError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            storage,
            fetcher,
            cache_name: config.cache_name().to_string(),
            offline_url,
            bypass_hosts: config.bypass_hosts.clone(),
        })
    }

    fn is_bypassed(&self, url: &Url) -> bool {
        self.bypass_hosts
            .iter()
            .any(|host| url.as_str().contains(host.as_str()))
    }

    /// Offline fallback document from the current store, if cached.
    async fn offline_fallback(&self) -> Option<ResponseSnapshot> {
        let storage = self.storage.read().await;
        let cache = storage.get(&self.cache_name)?;
        cache.match_url(self.offline_url.as_str()).cloned()
    }

    /// Run a request through the interception policy.
    ///
    /// A network failure on a non-navigation miss propagates to the caller;
    /// the offline document is substituted for navigations only.
    pub async fn route(&self, request: &FetchRequest) -> Result<FetchDecision, SwError> {
        if request.method != Method::GET {
            trace!(method = %request.method, "Pass-through: non-GET");
            return Ok(FetchDecision::PassThrough);
        }
        if self.is_bypassed(&request.url) {
            trace!(url = %request.url, "Pass-through: excluded host");
            return Ok(FetchDecision::PassThrough);
        }

        {
            let storage = self.storage.read().await;
            if let Some(cache) = storage.get(&self.cache_name) {
                if let Some(snapshot) = cache.match_url(request.url.as_str()) {
                    debug!(url = %request.url, "Cache hit");
                    return Ok(FetchDecision::Respond(snapshot.clone()));
                }
            }
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    let copy = response.clone();
                    let mut storage = self.storage.write().await;
                    storage
                        .open(&self.cache_name)
                        .put(request.url.as_str(), copy);
                }
                Ok(FetchDecision::Respond(response))
            }
            Err(err) => {
                if request.is_navigation {
                    if let Some(offline) = self.offline_fallback().await {
                        warn!(url = %request.url, "Network failed, serving offline document");
                        return Ok(FetchDecision::Respond(offline));
                    }
                }
                debug!(url = %request.url, error = %err, "Network failed with no fallback");
                Err(err)
            }
        }
    }
}
