//! Cache module for storing API responses
//!
//! Entries carry `{data, timestamp, expires_at}` and live in two tiers: a bounded
//! in-memory map and JSON files on disk. Expired entries are still readable with an
//! `is_expired` flag, allowing stale data to be shown when the API is unavailable.

mod entry;
mod manager;
mod memory;
mod tiered;

pub use entry::{CacheEntry, CachedData};
pub use manager::CacheManager;
pub use memory::{MemoryCache, DEFAULT_MEMORY_CAPACITY};
pub use tiered::{CacheStats, CacheTier, TieredCache};
