//! Cache entry envelope shared by the memory and disk tiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wrapper stored for every cached value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached data
    pub data: T,
    /// When the data was cached
    pub timestamp: DateTime<Utc>,
    /// When the cache entry expires
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Wraps `data` with a timestamp of now and an expiry `ttl` later
    pub fn new(data: T, ttl: Duration) -> Self {
        Self::at(data, Utc::now(), ttl)
    }

    /// Wraps `data` as if it had been cached at `timestamp`
    pub fn at(data: T, timestamp: DateTime<Utc>, ttl: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| timestamp.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            data,
            timestamp,
            expires_at,
        }
    }

    /// Whether the entry is past its expiry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the entry is past its expiry right now
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Converts the entry into the caller-facing read result
    pub fn into_cached(self) -> CachedData<T> {
        let is_expired = self.is_expired();
        CachedData {
            data: self.data,
            cached_at: self.timestamp,
            expires_at: self.expires_at,
            is_expired,
        }
    }
}

/// Result of reading from cache, including metadata about cache freshness
#[derive(Debug, Clone)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// When the data was originally cached
    pub cached_at: DateTime<Utc>,
    /// When the data stops being fresh
    pub expires_at: DateTime<Utc>,
    /// Whether the cache entry has expired
    pub is_expired: bool,
}
