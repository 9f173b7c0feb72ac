//! Worker lifecycle: install, activate, and the event loop.
//!
//! The manager is constructed once per worker instance and driven by a
//! channel of events, the Rust rendering of the platform's callback
//! registration. Install and activate run to completion inline, which
//! preserves their ordering; fetch events are served on spawned tasks so a
//! slow network round-trip never blocks the loop. Awaiting a handler to
//! completion is the analog of extending the event's lifetime until its
//! async work settles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use plaza_core::config::AppConfig;
use plaza_core::types::{CacheName, WorkerId};

use crate::cache::CacheStorage;
use crate::fetch::{FetchDecision, FetchRequest, FetchRouter, Fetcher};
use crate::message::ControlMessage;
use crate::session::SessionRegistry;
use crate::SwError;

/// Worker lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    /// Prefetching static resources into the current store.
    Installing,
    /// Installed, waiting for existing sessions to release control.
    Waiting,
    /// Evicting stale stores and claiming sessions.
    Activating,
    /// Steady state, serving fetch and message events.
    Active,
}

/// Event delivered to the worker's loop.
pub enum WorkerEvent {
    /// First registration, or an updated script was detected.
    Install,
    /// No previous instance holds sessions, or activation was forced.
    Activate,
    /// An intercepted request; the decision travels back on `reply`.
    Fetch {
        request: FetchRequest,
        reply: oneshot::Sender<Result<FetchDecision, SwError>>,
    },
    /// Raw control message from the page.
    Message { data: String },
}

/// The offline cache manager for one worker instance.
///
/// Worker-scoped state (current cache name, static resource list) lives on
/// this struct rather than in ambient globals, so tests construct managers
/// with a fake network seam and a private store.
pub struct OfflineCacheManager {
    id: WorkerId,
    config: AppConfig,
    origin: Url,
    cache_name: CacheName,
    storage: Arc<RwLock<CacheStorage>>,
    sessions: Arc<RwLock<SessionRegistry>>,
    fetcher: Arc<dyn Fetcher>,
    router: FetchRouter,
    phase: RwLock<WorkerPhase>,
    skip_requested: AtomicBool,
}

impl OfflineCacheManager {
    /// Build a manager for the given origin, sharing `storage` and
    /// `sessions` with any previous worker instance.
    pub fn new(
        config: AppConfig,
        origin: Url,
        storage: Arc<RwLock<CacheStorage>>,
        sessions: Arc<RwLock<SessionRegistry>>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, SwError> {
        let router = FetchRouter::new(&config, &origin, Arc::clone(&storage), Arc::clone(&fetcher))?;
        Ok(Self {
            id: WorkerId::new(),
            cache_name: config.cache_name(),
            config,
            origin,
            storage,
            sessions,
            fetcher,
            router,
            phase: RwLock::new(WorkerPhase::Installing),
            skip_requested: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Name of the store this instance considers current.
    pub fn cache_name(&self) -> &CacheName {
        &self.cache_name
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> WorkerPhase {
        *self.phase.read().await
    }

    async fn set_phase(&self, phase: WorkerPhase) {
        *self.phase.write().await = phase;
        debug!(worker = self.id.0, ?phase, "Phase change");
    }

    fn resolve(&self, path: &str) -> Result<Url, SwError> {
        self.origin
            .join(path)
            .map_err(|e| SwError::InvalidUrl(e.to_string()))
    }

    /// Prefetch the static resource list into the current store.
    ///
    /// A resource that fails to resolve or fetch is logged and skipped;
    /// installation never aborts on a partial failure. Returns the number of
    /// resources cached.
    pub async fn install(&self) -> Result<usize, SwError> {
        self.set_phase(WorkerPhase::Installing).await;
        info!(worker = self.id.0, cache = %self.cache_name, "Installing");

        let name = self.cache_name.to_string();
        self.storage.write().await.open(&name);

        let mut cached = 0;
        for path in &self.config.static_resources {
            let url = match self.resolve(path) {
                Ok(url) => url,
                Err(err) => {
                    warn!(resource = %path, error = %err, "Skipping unresolvable resource");
                    continue;
                }
            };
            let request = FetchRequest::get(url.clone());
            match self.fetcher.fetch(&request).await {
                Ok(snapshot) if snapshot.is_cacheable() => {
                    let mut storage = self.storage.write().await;
                    storage.open(&name).put(url.as_str(), snapshot);
                    cached += 1;
                }
                Ok(snapshot) => {
                    warn!(
                        resource = %path,
                        status = snapshot.status,
                        "Skipping non-cacheable resource"
                    );
                }
                Err(err) => {
                    warn!(resource = %path, error = %err, "Failed to prefetch resource");
                }
            }
        }
        info!(worker = self.id.0, cached, "Install settled");

        if self.skip_requested.load(Ordering::SeqCst) {
            self.activate().await?;
        } else {
            self.set_phase(WorkerPhase::Waiting).await;
        }
        Ok(cached)
    }

    /// Evict stale stores, then claim every open session.
    ///
    /// After this settles, exactly one store matching the current version
    /// tag remains, and this instance serves all open pages.
    pub async fn activate(&self) -> Result<(), SwError> {
        self.set_phase(WorkerPhase::Activating).await;

        let deleted = self.storage.write().await.evict_stale(&self.cache_name);
        if !deleted.is_empty() {
            info!(worker = self.id.0, count = deleted.len(), "Deleted stale cache stores");
        }

        let claimed = self.sessions.write().await.claim(self.id);
        self.set_phase(WorkerPhase::Active).await;
        info!(worker = self.id.0, claimed, "Activated");
        Ok(())
    }

    /// Force immediate activation, bypassing the wait for existing sessions.
    ///
    /// Issued before install settles, the request takes effect as soon as
    /// the prefetch completes.
    pub async fn skip_waiting(&self) -> Result<(), SwError> {
        self.skip_requested.store(true, Ordering::SeqCst);
        if *self.phase.read().await == WorkerPhase::Waiting {
            self.activate().await?;
        }
        Ok(())
    }

    /// Handle a decoded control command.
    pub async fn handle_message(&self, message: ControlMessage) -> Result<(), SwError> {
        match message {
            ControlMessage::SkipWaiting => self.skip_waiting().await,
        }
    }

    /// Handle a raw control message; unrecognized shapes are ignored.
    pub async fn handle_raw_message(&self, raw: &str) -> Result<(), SwError> {
        match ControlMessage::parse(raw) {
            Some(message) => self.handle_message(message).await,
            None => Ok(()),
        }
    }

    /// Run one intercepted request through the cache policy.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<FetchDecision, SwError> {
        self.router.route(request).await
    }

    /// Drive the worker from a channel of events until the channel closes.
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<WorkerEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                WorkerEvent::Install => {
                    if let Err(err) = self.install().await {
                        warn!(worker = self.id.0, error = %err, "Install failed");
                    }
                }
                WorkerEvent::Activate => {
                    if let Err(err) = self.activate().await {
                        warn!(worker = self.id.0, error = %err, "Activate failed");
                    }
                }
                WorkerEvent::Fetch { request, reply } => {
                    let manager = Arc::clone(&self);
                    tokio::spawn(async move {
                        let decision = manager.handle_fetch(&request).await;
                        let _ = reply.send(decision);
                    });
                }
                WorkerEvent::Message { data } => {
                    if let Err(err) = self.handle_raw_message(&data).await {
                        warn!(worker = self.id.0, error = %err, "Message handling failed");
                    }
                }
            }
        }
        debug!(worker = self.id.0, "Event channel closed, worker done");
    }
}
