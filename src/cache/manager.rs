//! Cache manager for persisting API responses to disk
//!
//! Provides a `CacheManager` that stores serializable data as JSON documents with
//! expiry timestamps, supporting graceful degradation when the API is unavailable.

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::entry::{CacheEntry, CachedData};
use crate::storage::{JsonStore, StorageError};

/// Manages reading and writing cached data to disk
///
/// The cache manager stores data in an XDG-compliant cache directory
/// (`~/.cache/shopfront/` on Linux). Each cache entry includes an expiry timestamp,
/// and expired entries are still returned (with `is_expired = true`) to support
/// graceful degradation.
#[derive(Debug, Clone)]
pub struct CacheManager {
    store: JsonStore,
}

impl CacheManager {
    /// Creates a new CacheManager using the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "shopfront")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self {
            store: JsonStore::new(cache_dir),
        }
    }

    /// Directory where cache files are stored
    pub fn dir(&self) -> &Path {
        self.store.dir()
    }

    /// Writes data to the cache with the given time-to-live
    ///
    /// # Arguments
    /// * `key` - Unique identifier for the cache entry (e.g., "product:tote-bag")
    /// * `data` - The data to cache
    /// * `ttl` - How long the cache entry should be considered fresh
    pub fn write<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) -> Result<(), StorageError> {
        self.write_entry(key, &CacheEntry::new(data, ttl))
    }

    /// Writes a pre-built entry, keeping its original timestamps
    pub fn write_entry<T: Serialize>(&self, key: &str, entry: &CacheEntry<T>) -> Result<(), StorageError> {
        self.store.write(key, entry)
    }

    /// Reads data from the cache
    ///
    /// Returns `None` if the cache entry doesn't exist or cannot be parsed.
    /// Returns `Some(CachedData)` with `is_expired = true` if the entry exists but has expired.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<CachedData<T>> {
        self.read_entry(key).map(CacheEntry::into_cached)
    }

    /// Reads the raw entry, keeping its original timestamps
    pub fn read_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        match self.store.read::<CacheEntry<T>>(key) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(key, error = %e, "Ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Removes a single entry, returning whether it existed
    pub fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.store.remove(key)
    }

    /// Removes every entry, returning how many were removed
    pub fn clear(&self) -> Result<usize, StorageError> {
        self.store.clear()
    }

    /// Number of entries currently on disk
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.store.keys()?.len())
    }

    /// Whether the cache directory holds no entries
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// Deletes expired and unreadable entries, returning how many were removed
    pub fn purge_expired(&self) -> Result<usize, StorageError> {
        let mut removed = 0;
        for key in self.store.keys()? {
            let keep = self
                .read_entry::<serde_json::Value>(&key)
                .is_some_and(|entry| !entry.is_expired());
            if !keep && self.store.remove(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
