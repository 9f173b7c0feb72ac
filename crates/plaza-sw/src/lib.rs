//! # Plaza Offline Cache Manager
//!
//! Offline caching engine for the Plaza marketplace PWA: a worker-context
//! component that intercepts the page's network requests and mediates them
//! against a versioned local cache store.
//!
//! ## Features
//!
//! - **Lifecycle**: install, activate, fetch, message events
//! - **Versioned stores**: `plaza-market-v1` naming, stale-store eviction
//! - **Fetch interception**: cache-first with network fallback
//! - **Offline fallback**: pre-cached document for failed navigations
//! - **Sessions**: claim of open pages on activation
//! - **Registration**: page-side contract with graceful degradation
//!
//! ## Architecture
//!
//! ```text
//! Registry (page side)
//!     │
//!     └── Registration
//!             ├── installing / active (WorkerHandle)
//!             └── events ──→ OfflineCacheManager (worker side)
//!                                 ├── CacheStorage
//!                                 │       └── Cache (versioned store)
//!                                 ├── SessionRegistry
//!                                 └── Fetcher (network seam)
//! ```

use thiserror::Error;

pub mod cache;
pub mod fetch;
pub mod lifecycle;
pub mod message;
pub mod registration;
pub mod session;

pub use cache::{Cache, CacheStorage, ResponseKind, ResponseSnapshot};
pub use fetch::{FetchDecision, FetchRequest, Fetcher};
pub use lifecycle::{OfflineCacheManager, WorkerEvent, WorkerPhase};
pub use message::ControlMessage;
pub use registration::{Registration, Registry, WorkerHandle, WorkerSupport};
pub use session::{PageSession, SessionRegistry};

/// Errors that can occur in the offline cache engine.
#[derive(Error, Debug, Clone)]
pub enum SwError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
