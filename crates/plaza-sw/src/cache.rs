//! Versioned cache stores and response snapshots.
//!
//! A store maps request URLs to immutable response snapshots. Stores are
//! named `<app>-v<version>`; exactly one is current after activation, and
//! the rest are deleted wholesale when a new worker version activates.

use hashbrown::HashMap;
use http::StatusCode;
use mime::Mime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use plaza_core::types::CacheName;

/// How a response relates to the requesting origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    /// Same-origin response, body and headers fully visible.
    Basic,
    /// Cross-origin response delivered with CORS headers.
    Cors,
    /// Cross-origin response without CORS, body hidden.
    Opaque,
    /// Network-level error stand-in.
    Error,
}

/// Immutable snapshot of a response.
///
/// A snapshot is cloned before it is written to a store and before it is
/// handed back to a caller, so the stored copy and the returned value are
/// always independent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    /// Final URL of the response.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
    /// Origin classification.
    pub kind: ResponseKind,
}

impl ResponseSnapshot {
    /// Empty-bodied snapshot.
    pub fn new(url: impl Into<String>, status: u16, kind: ResponseKind) -> Self {
        Self {
            url: url.into(),
            status,
            headers: HashMap::new(),
            body: Vec::new(),
            kind,
        }
    }

    /// Same-origin snapshot with a body.
    pub fn basic(url: impl Into<String>, status: u16, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            status,
            headers: HashMap::new(),
            body,
            kind: ResponseKind::Basic,
        }
    }

    /// Typed status code.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Whether the status is in the success class.
    pub fn ok(&self) -> bool {
        self.status_code().is_success()
    }

    /// Parsed Content-Type header, if present and valid.
    pub fn content_type(&self) -> Option<Mime> {
        self.headers.get("content-type")?.parse().ok()
    }

    /// Whether this response may be written to a store.
    ///
    /// Only a fully successful same-origin response qualifies; error and
    /// opaque responses are never cached.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.kind == ResponseKind::Basic
    }

    /// Body as UTF-8 text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A single named store of response snapshots keyed by request URL.
#[derive(Debug, Default)]
pub struct Cache {
    /// Store name, `<app>-v<version>`.
    pub name: String,
    entries: HashMap<String, ResponseSnapshot>,
}

impl Cache {
    /// Create an empty store.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: HashMap::new(),
        }
    }

    /// Look up a stored snapshot.
    pub fn match_url(&self, url: &str) -> Option<&ResponseSnapshot> {
        self.entries.get(url)
    }

    /// Store a snapshot under a URL. A same-key write overwrites.
    pub fn put(&mut self, url: &str, snapshot: ResponseSnapshot) {
        debug!(cache = %self.name, url, "Stored response");
        self.entries.insert(url.to_string(), snapshot);
    }

    /// Remove an entry. Returns whether one was present.
    pub fn delete(&mut self, url: &str) -> bool {
        self.entries.remove(url).is_some()
    }

    /// All stored URLs.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The set of named stores.
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: HashMap<String, Cache>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store, creating it if missing.
    pub fn open(&mut self, name: &str) -> &mut Cache {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| Cache::new(name))
    }

    /// Borrow a store if it exists.
    pub fn get(&self, name: &str) -> Option<&Cache> {
        self.caches.get(name)
    }

    /// Whether a store exists.
    pub fn has(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Delete a store. Returns whether one was present.
    pub fn delete(&mut self, name: &str) -> bool {
        self.caches.remove(name).is_some()
    }

    /// All store names.
    pub fn keys(&self) -> Vec<&str> {
        self.caches.keys().map(|s| s.as_str()).collect()
    }

    /// Delete every store whose name is not `current`.
    ///
    /// Returns the deleted names.
    pub fn evict_stale(&mut self, current: &CacheName) -> Vec<String> {
        let keep = current.to_string();
        let stale: Vec<String> = self
            .caches
            .keys()
            .filter(|name| **name != keep)
            .cloned()
            .collect();
        for name in &stale {
            info!(cache = %name, "Deleting stale cache store");
            self.caches.remove(name);
        }
        stale
    }
}
