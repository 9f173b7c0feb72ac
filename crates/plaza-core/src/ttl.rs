//! In-memory TTL cache for page data.
//!
//! Memoizes backend responses with a per-entry expiry so repeated reads
//! within the window skip the backing call. Entries are dropped lazily on
//! access; the cache never spawns a sweeper.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Recommended lifetimes per data family.
pub mod lifetimes {
    use std::time::Duration;

    /// Products change frequently.
    pub const PRODUCTS: Duration = Duration::from_secs(30);
    /// Stores change less.
    pub const STORES: Duration = Duration::from_secs(60);
    /// Orders need frequent refresh.
    pub const ORDERS: Duration = Duration::from_secs(15);
    /// Chat messages need fast refresh.
    pub const CHATS: Duration = Duration::from_secs(10);
    /// Users change little.
    pub const USERS: Duration = Duration::from_secs(60);
    /// Badge counters.
    pub const COUNTERS: Duration = Duration::from_secs(15);
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn expired(&self) -> bool {
        self.stored_at.elapsed() > self.ttl
    }
}

/// String-keyed cache with per-entry expiry.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: HashMap<String, Entry<V>>,
}

impl<V> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Get a value if present and not expired.
    ///
    /// An expired entry is removed on the way out.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.expired(),
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        let entry = self.entries.get(key)?;
        debug!(
            "cache hit for {} (age: {}s)",
            key,
            entry.stored_at.elapsed().as_secs()
        );
        Some(&entry.value)
    }

    /// Store a value with the default lifetime.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, DEFAULT_TTL);
    }

    /// Store a value with an explicit lifetime.
    pub fn set_with_ttl(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        debug!("cache set for {} (ttl: {}s)", key, ttl.as_secs());
        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Drop a single entry. Returns whether one was present.
    pub fn invalidate(&mut self, key: &str) -> bool {
        let dropped = self.entries.remove(key).is_some();
        if dropped {
            debug!("cache invalidated for {}", key);
        }
        dropped
    }

    /// Drop every entry whose key contains the pattern. Returns the count.
    pub fn invalidate_matching(&mut self, pattern: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.contains(pattern));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            debug!("cache invalidated {} entries matching {}", dropped, pattern);
        }
        dropped
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_before_expiry() {
        let mut cache = TtlCache::new();
        cache.set("products:all", vec![1, 2, 3]);
        assert_eq!(cache.get("products:all"), Some(&vec![1, 2, 3]));
    }

    #[test]
    fn test_miss_after_expiry() {
        let mut cache = TtlCache::new();
        cache.set_with_ttl("orders:42", "pending", Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("orders:42"), None);
        // The expired entry is gone, not just hidden
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_single_key() {
        let mut cache = TtlCache::new();
        cache.set("users:1", "ana");
        assert!(cache.invalidate("users:1"));
        assert!(!cache.invalidate("users:1"));
        assert_eq!(cache.get("users:1"), None);
    }

    #[test]
    fn test_invalidate_matching_drops_only_matches() {
        let mut cache = TtlCache::new();
        cache.set("products:1", 1);
        cache.set("products:2", 2);
        cache.set("stores:1", 3);
        assert_eq!(cache.invalidate_matching("products:"), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("stores:1"), Some(&3));
    }

    #[test]
    fn test_clear() {
        let mut cache = TtlCache::new();
        cache.set("a", 1);
        cache.set("b", 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_overwrites_existing_key() {
        let mut cache = TtlCache::new();
        cache.set("counters:badges", 1);
        cache.set("counters:badges", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("counters:badges"), Some(&2));
    }
}
