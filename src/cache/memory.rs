//! Bounded in-process cache tier.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime};

use serde_json::Value;

/// One cached value with its lifecycle timestamps.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

impl CacheEntry {
    pub fn new(value: Value, ttl: Duration) -> Self {
        let created_at = SystemTime::now();
        Self {
            value,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        now > self.expires_at
    }
}

/// Bounded mapping with insertion-order eviction.
///
/// Eviction is by insertion order, not last-access order: a hit does not
/// reorder the queue, only a (re-)insert does. This trades recency accuracy
/// for O(1) eviction without a separate access clock. On insert past
/// capacity, the oldest `(len - capacity)` entries are dropped.
#[derive(Debug)]
pub struct MemoryTier {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    capacity: usize,
}

impl MemoryTier {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Insert a value, moving an existing key to the back of the eviction
    /// queue and evicting the oldest entries past capacity.
    pub fn insert(&mut self, key: &str, entry: CacheEntry) {
        if self.entries.contains_key(key) {
            self.order.retain(|k| k != key);
        }
        self.order.push_back(key.to_string());
        self.entries.insert(key.to_string(), entry);

        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.order.retain(|k| k != key);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Resident keys with the given prefix (used for chunk accounting).
    #[must_use]
    pub fn keys_with_prefix(&self, prefix: &str) -> usize {
        self.entries.keys().filter(|k| k.starts_with(prefix)).count()
    }

    /// Approximate resident size in bytes (serialized value lengths).
    #[must_use]
    pub fn approximate_bytes(&self) -> usize {
        self.entries
            .values()
            .map(|e| serde_json::to_string(&e.value).map(|s| s.len()).unwrap_or(0))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(v: &str) -> CacheEntry {
        CacheEntry::new(json!(v), Duration::from_secs(60))
    }

    #[test]
    fn test_eviction_is_by_insertion_order() {
        let mut tier = MemoryTier::new(2);
        tier.insert("a", entry("1"));
        tier.insert("b", entry("2"));
        // reading "a" must not protect it from eviction
        assert!(tier.get("a").is_some());
        tier.insert("c", entry("3"));

        assert!(!tier.contains("a"));
        assert!(tier.contains("b"));
        assert!(tier.contains("c"));
        assert_eq!(tier.len(), 2);
    }

    #[test]
    fn test_reinsert_moves_key_to_back() {
        let mut tier = MemoryTier::new(2);
        tier.insert("a", entry("1"));
        tier.insert("b", entry("2"));
        tier.insert("a", entry("1b"));
        tier.insert("c", entry("3"));

        // "b" is now the oldest insertion and gets evicted
        assert!(tier.contains("a"));
        assert!(!tier.contains("b"));
        assert!(tier.contains("c"));
    }

    #[test]
    fn test_remove_clears_order_entry() {
        let mut tier = MemoryTier::new(2);
        tier.insert("a", entry("1"));
        tier.insert("b", entry("2"));
        tier.remove("a");
        tier.insert("c", entry("3"));
        tier.insert("d", entry("4"));

        // removal of "a" must not shield "b" by leaving a stale queue slot
        assert!(!tier.contains("b"));
        assert!(tier.contains("c"));
        assert!(tier.contains("d"));
    }

    #[test]
    fn test_entry_expiry() {
        let e = CacheEntry::new(json!("x"), Duration::from_secs(1));
        assert!(!e.is_expired(e.created_at));
        assert!(e.is_expired(e.created_at + Duration::from_secs(2)));
    }
}
