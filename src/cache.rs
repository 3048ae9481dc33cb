//! TTL cache
//!
//! Generic key/value store with per-entry expiry. Entries are evicted
//! lazily: a `get` past the deadline removes the entry and reports a miss.
//! There is no background sweep.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cached value with its expiry deadline
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Check if this entry is expired
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// TTL cache guarded by a single read/write lock.
///
/// Readers do not block each other; writers are exclusive.
#[derive(Debug)]
pub struct Cache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Get a cached value.
    ///
    /// An expired entry is removed from storage and reported as a miss.
    pub async fn get(&self, key: &K) -> Option<V> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // The entry was expired under the read lock; re-check under the
        // write lock in case a writer replaced it in between.
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value under a key for `ttl`
    pub async fn set(&self, key: K, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let mut entries = self.entries.write().await;
        entries.insert(key, entry);
    }

    /// Remove a key, returning whether it was present
    pub async fn remove(&self, key: &K) -> bool {
        let mut entries = self.entries.write().await;
        entries.remove(key).is_some()
    }

    /// Number of entries currently held, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache: Cache<String, u32> = Cache::new();
        cache.set("a".to_string(), 1, Duration::from_secs(60)).await;

        assert_eq!(cache.get(&"a".to_string()).await, Some(1));
        assert_eq!(cache.get(&"b".to_string()).await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache: Cache<String, u32> = Cache::new();
        cache.set("a".to_string(), 1, Duration::from_millis(10)).await;

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(cache.get(&"a".to_string()).await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_removed_after_one_get() {
        let cache: Cache<String, u32> = Cache::new();
        cache.set("a".to_string(), 1, Duration::from_millis(10)).await;
        assert_eq!(cache.len().await, 1);

        tokio::time::sleep(Duration::from_millis(25)).await;
        // still in storage until a get touches it
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&"a".to_string()).await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_set_refreshes_expiry() {
        let cache: Cache<String, u32> = Cache::new();
        cache.set("a".to_string(), 1, Duration::from_millis(10)).await;
        cache.set("a".to_string(), 2, Duration::from_secs(60)).await;

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(cache.get(&"a".to_string()).await, Some(2));
    }
}
