//! Two-tier cache: bounded memory in front of the durable disk cache
//!
//! Reads check memory first, then disk. A fresh disk hit is promoted into memory
//! so the next read stays in-process. Writes go to both tiers.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::entry::{CacheEntry, CachedData};
use super::manager::CacheManager;
use super::memory::MemoryCache;
use crate::storage::StorageError;

/// Which tier answered a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Memory,
    Disk,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Fresh reads answered from memory
    pub memory_hits: u64,
    /// Fresh reads answered from disk
    pub disk_hits: u64,
    /// Reads that served expired data
    pub stale_hits: u64,
    /// Reads that found nothing usable
    pub misses: u64,
    /// Entries currently in memory
    pub memory_entries: usize,
    /// Entries currently on disk, if a disk tier is configured
    pub disk_entries: Option<usize>,
}

#[derive(Debug, Default)]
struct Counters {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
}

/// Memory + disk cache used by the catalog
#[derive(Debug)]
pub struct TieredCache {
    memory: MemoryCache,
    disk: Option<CacheManager>,
    counters: Counters,
}

impl TieredCache {
    /// Creates a cache with the given tiers; `disk = None` keeps everything in memory
    pub fn new(memory: MemoryCache, disk: Option<CacheManager>) -> Self {
        Self {
            memory,
            disk,
            counters: Counters::default(),
        }
    }

    /// Memory-only cache with default capacity
    pub fn memory_only() -> Self {
        Self::new(MemoryCache::default(), None)
    }

    /// The disk tier, if configured
    pub fn disk(&self) -> Option<&CacheManager> {
        self.disk.as_ref()
    }

    /// Returns unexpired data for `key`, or `None`
    pub fn get_fresh<T: DeserializeOwned>(&self, key: &str) -> Option<(CachedData<T>, CacheTier)> {
        if let Some(entry) = self.memory.get(key).filter(|e| !e.is_expired()) {
            if let Some(cached) = decode(key, entry) {
                self.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, "Memory cache hit");
                return Some((cached, CacheTier::Memory));
            }
            self.memory.remove(key);
        }

        if let Some(entry) = self.disk_entry(key).filter(|e| !e.is_expired()) {
            self.memory.insert(key, entry.clone());
            if let Some(cached) = decode(key, entry) {
                self.counters.disk_hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, "Disk cache hit, promoted to memory");
                return Some((cached, CacheTier::Disk));
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key, "Cache miss");
        None
    }

    /// Returns the newest data for `key` from either tier, expired or not
    ///
    /// Used for degraded operation when a live fetch has failed.
    pub fn get_any<T: DeserializeOwned>(&self, key: &str) -> Option<CachedData<T>> {
        let Some(cached) = self.newest_entry(key).and_then(|entry| decode(key, entry)) else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        if cached.is_expired {
            self.counters.stale_hits.fetch_add(1, Ordering::Relaxed);
        }
        Some(cached)
    }

    /// Stores `data` in both tiers with the given time-to-live
    ///
    /// The memory write always happens; a disk failure is returned to the caller.
    pub fn set<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) -> Result<(), StorageError> {
        let entry = CacheEntry::new(serde_json::to_value(data)?, ttl);
        self.memory.insert(key, entry.clone());
        if let Some(disk) = &self.disk {
            disk.write_entry(key, &entry)?;
        }
        Ok(())
    }

    /// Edits the data under `key` in place, keeping its timestamps
    ///
    /// `edit` returns whether it changed anything. The edited value replaces the
    /// entry in both tiers. Returns `Ok(false)` when there was nothing to edit.
    pub fn modify<T, F>(&self, key: &str, edit: F) -> Result<bool, StorageError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> bool,
    {
        let Some(entry) = self.newest_entry(key) else {
            return Ok(false);
        };
        let Ok(mut data) = serde_json::from_value::<T>(entry.data) else {
            return Ok(false);
        };
        if !edit(&mut data) {
            return Ok(false);
        }

        let entry = CacheEntry {
            data: serde_json::to_value(&data)?,
            timestamp: entry.timestamp,
            expires_at: entry.expires_at,
        };
        self.memory.insert(key, entry.clone());
        if let Some(disk) = &self.disk {
            disk.write_entry(key, &entry)?;
        }
        Ok(true)
    }

    /// Removes `key` from both tiers
    pub fn invalidate(&self, key: &str) {
        self.memory.remove(key);
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.remove(key) {
                tracing::warn!(key, error = %e, "Failed to remove disk cache entry");
            }
        }
    }

    /// Empties both tiers, returning how many disk entries were removed
    pub fn clear(&self) -> Result<usize, StorageError> {
        self.memory.clear();
        match &self.disk {
            Some(disk) => disk.clear(),
            None => Ok(0),
        }
    }

    /// Current counters and entry counts
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.counters.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.counters.disk_hits.load(Ordering::Relaxed),
            stale_hits: self.counters.stale_hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            memory_entries: self.memory.len(),
            disk_entries: self.disk.as_ref().and_then(|disk| disk.len().ok()),
        }
    }

    fn newest_entry(&self, key: &str) -> Option<CacheEntry<Value>> {
        match (self.memory.get(key), self.disk_entry(key)) {
            (Some(mem), Some(disk)) => Some(if disk.timestamp > mem.timestamp { disk } else { mem }),
            (mem, disk) => mem.or(disk),
        }
    }

    fn disk_entry(&self, key: &str) -> Option<CacheEntry<Value>> {
        self.disk.as_ref()?.read_entry(key)
    }
}

/// Decodes a stored JSON value into `T`, logging values of the wrong shape
fn decode<T: DeserializeOwned>(key: &str, entry: CacheEntry<Value>) -> Option<CachedData<T>> {
    let CacheEntry {
        data,
        timestamp,
        expires_at,
    } = entry;
    match serde_json::from_value(data) {
        Ok(data) => Some(CacheEntry { data, timestamp, expires_at }.into_cached()),
        Err(e) => {
            tracing::debug!(key, error = %e, "Cached value has unexpected shape");
            None
        }
    }
}
