//! Bounded in-memory cache tier

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::entry::CacheEntry;

/// Default number of entries kept in memory
pub const DEFAULT_MEMORY_CAPACITY: usize = 256;

/// In-memory cache of JSON values keyed by string
///
/// When full, inserting a new key evicts the entry with the oldest timestamp.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry<Value>>>,
    capacity: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CAPACITY)
    }
}

impl MemoryCache {
    /// Creates a cache holding at most `capacity` entries (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<Value>>> {
        // A panic while holding the lock cannot leave a half-written entry behind.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns a copy of the entry under `key`, expired or not
    pub fn get(&self, key: &str) -> Option<CacheEntry<Value>> {
        self.lock().get(key).cloned()
    }

    /// Inserts or replaces the entry under `key`
    pub fn insert(&self, key: &str, entry: CacheEntry<Value>) {
        let mut entries = self.lock();
        if !entries.contains_key(key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.timestamp)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                tracing::trace!(key = %oldest, "Evicting oldest memory cache entry");
                entries.remove(&oldest);
            }
        }
        entries.insert(key.to_string(), entry);
    }

    /// Removes `key`, returning whether it was present
    pub fn remove(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Drops every entry
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of entries held
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no entries are held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries held
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
