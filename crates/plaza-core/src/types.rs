//! Common types used throughout Plaza

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a worker instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub u64);

/// Unique identifier for an open page session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl WorkerId {
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionId {
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Versioned cache store name, `<app-name>-v<version>`.
///
/// Bumping the version on deploy is the only mechanism that triggers
/// stale-store eviction during activation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheName {
    app: String,
    version: u32,
}

impl CacheName {
    /// Create a cache name for an app and version.
    pub fn new(app: impl Into<String>, version: u32) -> Self {
        Self {
            app: app.into(),
            version,
        }
    }

    /// Application name part.
    pub fn app(&self) -> &str {
        &self.app
    }

    /// Version part.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Same app, next version.
    pub fn bumped(&self) -> Self {
        Self {
            app: self.app.clone(),
            version: self.version + 1,
        }
    }

    /// Parse a store name back into its app and version parts.
    ///
    /// Returns `None` for names that do not follow the convention.
    pub fn parse(name: &str) -> Option<Self> {
        let (app, tag) = name.rsplit_once("-v")?;
        if app.is_empty() {
            return None;
        }
        let version = tag.parse().ok()?;
        Some(Self {
            app: app.to_string(),
            version,
        })
    }

    /// Whether a store name denotes this exact app and version.
    pub fn matches(&self, name: &str) -> bool {
        Self::parse(name).as_ref() == Some(self)
    }
}

impl fmt::Display for CacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-v{}", self.app, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_name_display() {
        let name = CacheName::new("plaza-market", 1);
        assert_eq!(name.to_string(), "plaza-market-v1");
    }

    #[test]
    fn test_cache_name_parse_round_trip() {
        let name = CacheName::parse("plaza-market-v3").unwrap();
        assert_eq!(name.app(), "plaza-market");
        assert_eq!(name.version(), 3);
        assert_eq!(name.to_string(), "plaza-market-v3");
    }

    #[test]
    fn test_cache_name_parse_rejects_malformed() {
        assert!(CacheName::parse("no-version-tag").is_none());
        assert!(CacheName::parse("-v2").is_none());
        assert!(CacheName::parse("app-vx").is_none());
    }

    #[test]
    fn test_cache_name_bump() {
        let name = CacheName::new("plaza-market", 1);
        let next = name.bumped();
        assert_eq!(next.to_string(), "plaza-market-v2");
        assert!(!next.matches("plaza-market-v1"));
        assert!(next.matches("plaza-market-v2"));
    }

    #[test]
    fn test_id_uniqueness() {
        assert_ne!(WorkerId::new(), WorkerId::new());
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
