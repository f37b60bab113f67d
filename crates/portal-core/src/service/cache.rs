//! TTL cache for list/detail responses.
//!
//! Entries expire lazily on read; when the cache is full the single
//! oldest-INSERTED entry is evicted, not the least recently accessed one.
//! A hot entry does not outlive its slot.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

struct CacheEntry<T> {
    data: T,
    inserted_at: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) > self.ttl
    }
}

pub struct TtlCache<T> {
    entries: HashMap<String, CacheEntry<T>>,
    /// Keys in insertion order; front is evicted first.
    order: VecDeque<String>,
    max_size: usize,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    /// Fresh value for `key`, or None. An expired entry is evicted here.
    pub fn get(&mut self, key: &str) -> Option<T> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(Instant::now()),
            None => return None,
        };
        if expired {
            self.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.data.clone())
    }

    pub fn insert(&mut self, key: String, data: T, ttl: Duration) {
        if self.entries.contains_key(&key) {
            self.remove(&key);
        }
        while !self.entries.is_empty() && self.entries.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
        if self.max_size == 0 {
            return;
        }
        self.entries.insert(
            key.clone(),
            CacheEntry {
                data,
                inserted_at: Instant::now(),
                ttl,
            },
        );
        self.order.push_back(key);
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    /// Clear all keys (no prefix) or all keys starting with `prefix`.
    pub fn invalidate(&mut self, prefix: Option<&str>) {
        match prefix {
            None => {
                self.entries.clear();
                self.order.clear();
            }
            Some(prefix) => {
                self.entries.retain(|key, _| !key.starts_with(prefix));
                self.order.retain(|key| !key.starts_with(prefix));
            }
        }
    }

    /// Apply a new bound, evicting oldest-inserted entries if shrinking.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        while self.entries.len() > self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order, for diagnostics.
    pub fn keys(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_roundtrip_and_expiry() {
        let mut cache = TtlCache::new(10);
        cache.insert("k".to_string(), 1u32, Duration::from_millis(100));
        assert_eq!(cache.get("k"), Some(1));

        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evicts_oldest_inserted() {
        let mut cache = TtlCache::new(2);
        let ttl = Duration::from_secs(60);
        cache.insert("a".to_string(), 1u32, ttl);
        cache.insert("b".to_string(), 2, ttl);

        // Access "a" so LRU-by-access would keep it; insertion order must not.
        assert_eq!(cache.get("a"), Some(1));

        cache.insert("c".to_string(), 3, ttl);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_reinsert_moves_to_back() {
        let mut cache = TtlCache::new(2);
        let ttl = Duration::from_secs(60);
        cache.insert("a".to_string(), 1u32, ttl);
        cache.insert("b".to_string(), 2, ttl);
        cache.insert("a".to_string(), 10, ttl);

        cache.insert("c".to_string(), 3, ttl);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(10));
    }

    #[test]
    fn test_prefix_invalidation() {
        let mut cache = TtlCache::new(10);
        let ttl = Duration::from_secs(60);
        cache.insert("notifications_a".to_string(), 1u32, ttl);
        cache.insert("notifications_b".to_string(), 2, ttl);
        cache.insert("notification_detail_1".to_string(), 3, ttl);

        cache.invalidate(Some("notifications_"));
        assert_eq!(cache.get("notifications_a"), None);
        assert_eq!(cache.get("notification_detail_1"), Some(3));

        cache.invalidate(None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_shrink_evicts() {
        let mut cache = TtlCache::new(4);
        let ttl = Duration::from_secs(60);
        for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
            cache.insert(key.to_string(), i as u32, ttl);
        }
        cache.set_max_size(2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("d"), Some(3));
    }
}
