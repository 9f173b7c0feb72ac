//! Page-side registration contract.
//!
//! The page attempts to register the worker script. When the hosting
//! environment has no worker capability the app keeps running without
//! offline support; that absence is signaled at log level only, never as an
//! error raised to the page.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info};
use url::Url;

use plaza_core::config::AppConfig;
use plaza_core::types::WorkerId;

use crate::cache::CacheStorage;
use crate::fetch::{FetchDecision, FetchRequest, Fetcher};
use crate::lifecycle::{OfflineCacheManager, WorkerEvent};
use crate::message::ControlMessage;
use crate::session::SessionRegistry;
use crate::SwError;

/// Worker capability of the hosting environment.
///
/// Some environments disallow worker registration entirely; the app stays
/// installable and usable there, only offline support is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerSupport {
    Supported,
    Unsupported,
}

/// Handle the page keeps to a spawned worker.
#[derive(Clone)]
pub struct WorkerHandle {
    id: WorkerId,
    script_url: Url,
    events: mpsc::UnboundedSender<WorkerEvent>,
}

impl WorkerHandle {
    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn script_url(&self) -> &Url {
        &self.script_url
    }

    fn send(&self, event: WorkerEvent) -> Result<(), SwError> {
        self.events
            .send(event)
            .map_err(|_| SwError::State("worker event loop is gone".to_string()))
    }

    /// Fire-and-forget control message to the worker.
    pub fn post_message(&self, message: ControlMessage) -> Result<(), SwError> {
        self.send(WorkerEvent::Message {
            data: message.to_json(),
        })
    }

    /// Ask the worker to activate.
    pub fn activate(&self) -> Result<(), SwError> {
        self.send(WorkerEvent::Activate)
    }

    /// Round-trip an intercepted request through the worker.
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchDecision, SwError> {
        let (tx, rx) = oneshot::channel();
        self.send(WorkerEvent::Fetch { request, reply: tx })?;
        rx.await
            .map_err(|_| SwError::State("worker dropped the request".to_string()))?
    }
}

/// The page's view of the worker lifecycle.
pub struct Registration {
    pub scope: Url,
    /// Worker currently installing or waiting.
    pub installing: Option<WorkerHandle>,
    /// Worker serving the page.
    pub active: Option<WorkerHandle>,
    /// A newer worker version was detected on re-registration.
    pub update_found: bool,
}

/// Page-side registry, the owner of the registration slot.
pub struct Registry {
    support: WorkerSupport,
    origin: Url,
    storage: Arc<RwLock<CacheStorage>>,
    sessions: Arc<RwLock<SessionRegistry>>,
    fetcher: Arc<dyn Fetcher>,
    registration: RwLock<Option<Registration>>,
}

impl Registry {
    /// Build a registry for one origin with fresh storage and sessions.
    pub fn new(support: WorkerSupport, origin: Url, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            support,
            origin,
            storage: Arc::new(RwLock::new(CacheStorage::new())),
            sessions: Arc::new(RwLock::new(SessionRegistry::new())),
            fetcher,
            registration: RwLock::new(None),
        }
    }

    /// Shared cache storage, for inspection and tooling.
    pub fn storage(&self) -> Arc<RwLock<CacheStorage>> {
        Arc::clone(&self.storage)
    }

    /// Shared session registry.
    pub fn sessions(&self) -> Arc<RwLock<SessionRegistry>> {
        Arc::clone(&self.sessions)
    }

    /// Register the worker script and start its install.
    ///
    /// Returns `Ok(None)` when the environment has no worker support; the
    /// caller must treat that as a working degraded mode, not a failure.
    /// Registering again with a different script URL marks an update found
    /// and spawns the new worker alongside the active one.
    pub async fn register(
        &self,
        script_url: Url,
        config: AppConfig,
    ) -> Result<Option<WorkerHandle>, SwError> {
        if self.support == WorkerSupport::Unsupported {
            info!("Worker not supported in this environment; app continues without offline support");
            return Ok(None);
        }

        let manager = Arc::new(OfflineCacheManager::new(
            config,
            self.origin.clone(),
            Arc::clone(&self.storage),
            Arc::clone(&self.sessions),
            Arc::clone(&self.fetcher),
        )?);

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = WorkerHandle {
            id: manager.id(),
            script_url,
            events: tx,
        };
        tokio::spawn(Arc::clone(&manager).run(rx));
        handle.send(WorkerEvent::Install)?;

        let mut slot = self.registration.write().await;
        match slot.as_mut() {
            Some(registration) => {
                info!(script = %handle.script_url, "New worker version found");
                registration.installing = Some(handle.clone());
                registration.update_found = true;
            }
            None => {
                debug!(script = %handle.script_url, scope = %self.origin, "Worker registered");
                *slot = Some(Registration {
                    scope: self.origin.clone(),
                    installing: Some(handle.clone()),
                    active: None,
                    update_found: false,
                });
            }
        }
        Ok(Some(handle))
    }

    /// Record that the installing worker took control, the page side of the
    /// controller change.
    pub async fn promote(&self) -> Result<(), SwError> {
        let mut slot = self.registration.write().await;
        let registration = slot
            .as_mut()
            .ok_or_else(|| SwError::NotFound("no registration".to_string()))?;
        let worker = registration
            .installing
            .take()
            .ok_or_else(|| SwError::State("no installing worker".to_string()))?;
        registration.active = Some(worker);
        registration.update_found = false;
        Ok(())
    }

    /// Whether a registration exists.
    pub async fn is_registered(&self) -> bool {
        self.registration.read().await.is_some()
    }

    /// Whether a newer worker version is pending.
    pub async fn update_found(&self) -> bool {
        self.registration
            .read()
            .await
            .as_ref()
            .map(|r| r.update_found)
            .unwrap_or(false)
    }

    /// Handle to the worker serving the page, if promoted.
    pub async fn active(&self) -> Option<WorkerHandle> {
        self.registration
            .read()
            .await
            .as_ref()
            .and_then(|r| r.active.clone())
    }

    /// Tear the registration down. Returns whether one existed.
    ///
    /// Debugging aid; dropping the handles closes the worker loops.
    pub async fn unregister(&self) -> bool {
        self.registration.write().await.take().is_some()
    }
}
