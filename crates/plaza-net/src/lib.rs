//! # Plaza Net
//!
//! HTTP network backend for the Plaza offline cache engine: the production
//! implementation of the manager's fetcher seam.
//!
//! ## Design Goals
//!
//! 1. **Async HTTP**: non-blocking requests through one shared client
//! 2. **Snapshotting**: responses land as independent, fully-read copies
//! 3. **Origin classification**: same-origin responses become `Basic`, the
//!    only kind the cache layer will store

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use thiserror::Error;
use tracing::trace;
use url::Url;

use plaza_sw::cache::{ResponseKind, ResponseSnapshot};
use plaza_sw::fetch::{FetchRequest, Fetcher};
use plaza_sw::SwError;

/// Errors raised while building or driving the HTTP backend.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("Client build failed: {0}")]
    ClientBuild(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// HTTP backend configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// User agent string.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum redirects.
    pub max_redirects: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            user_agent: "PlazaSW/1.0".to_string(),
            timeout: Duration::from_secs(30),
            max_redirects: 10,
        }
    }
}

/// Fetcher backed by a real HTTP client.
pub struct HttpFetcher {
    client: Client,
    /// Origin used to classify responses; `None` treats everything as
    /// same-origin.
    origin: Option<Url>,
}

impl HttpFetcher {
    /// Build a fetcher from the backend configuration.
    pub fn new(config: BackendConfig) -> Result<Self, NetError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| NetError::ClientBuild(e.to_string()))?;
        Ok(Self {
            client,
            origin: None,
        })
    }

    /// Classify responses relative to this origin.
    pub fn with_origin(mut self, origin: Url) -> Self {
        self.origin = Some(origin);
        self
    }

    fn classify(&self, response_url: &Url) -> ResponseKind {
        match &self.origin {
            Some(origin) => {
                let same_origin = origin.scheme() == response_url.scheme()
                    && origin.host_str() == response_url.host_str()
                    && origin.port_or_known_default() == response_url.port_or_known_default();
                if same_origin {
                    ResponseKind::Basic
                } else {
                    ResponseKind::Cors
                }
            }
            None => ResponseKind::Basic,
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        request: &'a FetchRequest,
    ) -> BoxFuture<'a, Result<ResponseSnapshot, SwError>> {
        Box::pin(async move {
            trace!(url = %request.url, method = %request.method, "Fetching");

            let response = self
                .client
                .request(request.method.clone(), request.url.clone())
                .send()
                .await
                .map_err(|e| SwError::Network(e.to_string()))?;

            let status = response.status().as_u16();
            let final_url = response.url().clone();
            let kind = self.classify(&final_url);

            let mut snapshot = ResponseSnapshot::new(final_url.as_str(), status, kind);
            for (name, value) in response.headers() {
                if let Ok(value) = value.to_str() {
                    snapshot
                        .headers
                        .insert(name.as_str().to_string(), value.to_string());
                }
            }
            snapshot.body = response
                .bytes()
                .await
                .map_err(|e| SwError::Network(e.to_string()))?
                .to_vec();

            trace!(
                url = %snapshot.url,
                status = snapshot.status,
                body_len = snapshot.body.len(),
                "Response snapshotted"
            );
            Ok(snapshot)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::RwLock;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use plaza_core::config::AppConfig;
    use plaza_sw::cache::CacheStorage;
    use plaza_sw::lifecycle::OfflineCacheManager;
    use plaza_sw::session::SessionRegistry;

    use super::*;

    async fn server_with_pages() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html>shell</html>"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/offline.html"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html>offline</html>"),
            )
            .mount(&server)
            .await;
        server
    }

    fn fetcher_for(server: &MockServer) -> HttpFetcher {
        let origin = Url::parse(&server.uri()).unwrap();
        HttpFetcher::new(BackendConfig::default())
            .unwrap()
            .with_origin(origin)
    }

    #[tokio::test]
    async fn test_success_snapshot_is_cacheable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logo.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server);
        let url = Url::parse(&server.uri()).unwrap().join("/logo.png").unwrap();
        let snapshot = fetcher.fetch(&FetchRequest::get(url)).await.unwrap();

        assert_eq!(snapshot.status, 200);
        assert_eq!(snapshot.kind, ResponseKind::Basic);
        assert_eq!(snapshot.body, b"png".to_vec());
        assert!(snapshot.is_cacheable());
    }

    #[tokio::test]
    async fn test_error_status_is_not_cacheable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server);
        let url = Url::parse(&server.uri()).unwrap().join("/missing").unwrap();
        let snapshot = fetcher.fetch(&FetchRequest::get(url)).await.unwrap();

        assert_eq!(snapshot.status, 404);
        assert!(!snapshot.is_cacheable());
    }

    #[tokio::test]
    async fn test_cross_origin_is_not_basic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/widget.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("js"))
            .mount(&server)
            .await;

        // Configured origin differs from the server
        let fetcher = HttpFetcher::new(BackendConfig::default())
            .unwrap()
            .with_origin(Url::parse("https://plaza.test").unwrap());
        let url = Url::parse(&server.uri()).unwrap().join("/widget.js").unwrap();
        let snapshot = fetcher.fetch(&FetchRequest::get(url)).await.unwrap();

        assert_eq!(snapshot.kind, ResponseKind::Cors);
        assert!(!snapshot.is_cacheable());
    }

    #[tokio::test]
    async fn test_connection_failure_is_a_network_error() {
        let server = MockServer::start().await;
        let url = Url::parse(&server.uri()).unwrap().join("/gone").unwrap();
        drop(server);

        let fetcher = HttpFetcher::new(BackendConfig {
            timeout: Duration::from_secs(2),
            ..BackendConfig::default()
        })
        .unwrap();
        let result = fetcher.fetch(&FetchRequest::get(url)).await;
        assert!(matches!(result, Err(SwError::Network(_))));
    }

    #[tokio::test]
    async fn test_manager_serves_offline_document_after_network_loss() {
        let server = server_with_pages().await;
        let origin = Url::parse(&server.uri()).unwrap();

        let fetcher = Arc::new(
            HttpFetcher::new(BackendConfig {
                timeout: Duration::from_secs(2),
                ..BackendConfig::default()
            })
            .unwrap()
            .with_origin(origin.clone()),
        );
        let storage = Arc::new(RwLock::new(CacheStorage::new()));
        let sessions = Arc::new(RwLock::new(SessionRegistry::new()));
        let manager = OfflineCacheManager::new(
            AppConfig::default(),
            origin.clone(),
            Arc::clone(&storage),
            Arc::clone(&sessions),
            fetcher,
        )
        .unwrap();

        let cached = manager.install().await.unwrap();
        assert_eq!(cached, 2);
        manager.activate().await.unwrap();

        // Take the network away
        drop(server);

        // The prefetched shell is served from the store
        let shell = manager
            .handle_fetch(&FetchRequest::navigate(
                origin.join("/").unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(shell.response().unwrap().text(), "<html>shell</html>");

        // An uncached navigation falls back to the offline document
        let fallback = manager
            .handle_fetch(&FetchRequest::navigate(
                origin.join("/catalog").unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(fallback.response().unwrap().text(), "<html>offline</html>");

        // An uncached sub-resource rejects with no fallback
        let failed = manager
            .handle_fetch(&FetchRequest::get(
                origin.join("/api/data").unwrap(),
            ))
            .await;
        assert!(failed.is_err());
    }
}
