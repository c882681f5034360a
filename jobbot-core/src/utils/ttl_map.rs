use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Duration, Utc};

struct TtlEntry<V> {
    value: V,
    touched: DateTime<Utc>,
}

/// A keyed map with an explicit capacity and time-to-live.
///
/// Entries expire `ttl` after their last touch and are dropped on access;
/// inserting past capacity evicts the least recently touched entry first.
/// Backs the per-author feedback-thread directory and the outstanding
/// report tracker, both of which must stay bounded.
pub struct BoundedTtlMap<K, V> {
    entries: HashMap<K, TtlEntry<V>>,
    capacity: usize,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone, V> BoundedTtlMap<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Fetch a live entry, refreshing its touch time. Expired entries are
    /// removed and reported as absent.
    pub fn get(&mut self, key: &K, now: DateTime<Utc>) -> Option<&V> {
        let live = match self.entries.get(key) {
            Some(entry) => now - entry.touched < self.ttl,
            None => return None,
        };
        if live {
            let entry = self.entries.get_mut(key).unwrap();
            entry.touched = now;
            Some(&entry.value)
        } else {
            self.entries.remove(key);
            None
        }
    }

    pub fn get_mut(&mut self, key: &K, now: DateTime<Utc>) -> Option<&mut V> {
        let live = match self.entries.get(key) {
            Some(entry) => now - entry.touched < self.ttl,
            None => return None,
        };
        if live {
            let entry = self.entries.get_mut(key).unwrap();
            entry.touched = now;
            Some(&mut entry.value)
        } else {
            self.entries.remove(key);
            None
        }
    }

    pub fn insert(&mut self, key: K, value: V, now: DateTime<Utc>) {
        self.prune(now);
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.touched)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(key, TtlEntry { value, touched: now });
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|e| e.value)
    }

    /// True if any live key satisfies the predicate.
    pub fn any_key(&self, now: DateTime<Utc>, mut pred: impl FnMut(&K) -> bool) -> bool {
        self.entries
            .iter()
            .any(|(k, e)| now - e.touched < self.ttl && pred(k))
    }

    pub fn prune(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.entries.retain(|_, e| now - e.touched < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
