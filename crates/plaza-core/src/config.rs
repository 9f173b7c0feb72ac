//! Engine configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PlazaError, PlazaResult};
use crate::types::CacheName;

/// Offline cache engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name, the prefix of every cache store name
    pub app_name: String,

    /// Cache version, bumped on deploy to evict stale stores
    pub cache_version: u32,

    /// URL paths pre-populated into the store at install time
    pub static_resources: Vec<String>,

    /// Offline fallback document served to failed navigations
    pub offline_document: String,

    /// Host substrings whose requests bypass the cache entirely
    pub bypass_hosts: Vec<String>,

    /// Network timeout in seconds
    pub network_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "plaza-market".to_string(),
            cache_version: 1,
            static_resources: vec!["/".to_string(), "/offline.html".to_string()],
            offline_document: "/offline.html".to_string(),
            bypass_hosts: vec!["supabase.co".to_string()],
            network_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Current cache store name for this configuration.
    pub fn cache_name(&self) -> CacheName {
        CacheName::new(self.app_name.clone(), self.cache_version)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> PlazaResult<Self> {
        serde_json::from_str(json).map_err(|e| PlazaError::config(e.to_string()))
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> PlazaResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Check the invariants the rest of the engine relies on.
    pub fn validate(&self) -> PlazaResult<()> {
        if self.app_name.is_empty() {
            return Err(PlazaError::config("app_name must not be empty"));
        }
        if self.static_resources.is_empty() {
            return Err(PlazaError::config("static_resources must not be empty"));
        }
        if !self
            .static_resources
            .iter()
            .any(|r| r == &self.offline_document)
        {
            return Err(PlazaError::config(format!(
                "offline document {} is not in the static resource list",
                self.offline_document
            )));
        }
        Ok(())
    }
}
