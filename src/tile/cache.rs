//! In-memory tier of the tile cache.
//!
//! An LRU cache of rendered tiles bounded by total encoded size and entry
//! count, with an optional time-to-live measured from insertion.
//!
//! # Size-Based Eviction
//!
//! The cache tracks the total size of cached tiles in bytes and evicts
//! least-recently-used entries when the capacity is exceeded.
//!
//! # Expiry
//!
//! With a TTL configured, an entry older than the TTL is dropped on the next
//! lookup and reported as a miss.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::Mutex;

use super::image::TileImage;
use super::key::TileKey;

/// Default cache capacity: 100MB
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 100 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// A cached tile together with when it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub image: TileImage,
    pub inserted_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        ttl.is_some_and(|ttl| now.duration_since(self.inserted_at) >= ttl)
    }
}

struct Inner {
    entries: LruCache<TileKey, CacheEntry>,
    current_size: usize,
}

impl Inner {
    fn remove(&mut self, key: &TileKey) -> Option<CacheEntry> {
        let entry = self.entries.pop(key)?;
        self.current_size = self.current_size.saturating_sub(entry.image.len());
        Some(entry)
    }
}

/// LRU cache for rendered tiles with size-based capacity.
///
/// # Thread Safety
///
/// The cache is thread-safe and can be shared across async tasks via `Arc`.
pub struct TileCache {
    inner: Mutex<Inner>,

    /// Maximum total size in bytes
    max_size: usize,

    /// Entries older than this are treated as absent
    ttl: Option<Duration>,
}

impl TileCache {
    /// Create a new tile cache with default capacity (100MB) and no TTL.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TILE_CACHE_CAPACITY)
    }

    /// Create a new tile cache with the specified capacity in bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_limits(max_size, DEFAULT_MAX_ENTRIES, None)
    }

    /// Create a new tile cache with explicit limits.
    ///
    /// # Arguments
    ///
    /// * `max_size` - Maximum total size of cached tiles in bytes
    /// * `max_entries` - Maximum number of entries (treated as at least 1)
    /// * `ttl` - Optional lifetime of an entry from insertion
    pub fn with_limits(max_size: usize, max_entries: usize, ttl: Option<Duration>) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(max_entries),
                current_size: 0,
            }),
            max_size,
            ttl,
        }
    }

    /// Get a tile from the cache.
    ///
    /// Returns `None` for absent or expired entries. A hit marks the entry as
    /// recently used.
    pub async fn get(&self, key: &TileKey) -> Option<TileImage> {
        let mut inner = self.inner.lock().await;

        let expired = inner
            .entries
            .peek(key)
            .map(|entry| entry.is_expired(self.ttl, Instant::now()))?;

        if expired {
            inner.remove(key);
            return None;
        }

        inner.entries.get(key).map(|entry| entry.image.clone())
    }

    /// Check if a live tile is cached without updating LRU order.
    pub async fn contains(&self, key: &TileKey) -> bool {
        let inner = self.inner.lock().await;
        inner
            .entries
            .peek(key)
            .is_some_and(|entry| !entry.is_expired(self.ttl, Instant::now()))
    }

    /// Store a tile in the cache.
    ///
    /// If the cache is over capacity after insertion, least-recently-used
    /// entries are evicted until the cache is within capacity.
    ///
    /// If the tile already exists, it is replaced, its insertion time reset,
    /// and it is marked as recently used.
    pub async fn put(&self, key: TileKey, image: TileImage) {
        let image_size = image.len();
        let mut inner = self.inner.lock().await;

        inner.remove(&key);

        let entry = CacheEntry {
            image,
            inserted_at: Instant::now(),
        };

        // A full entry table evicts its LRU entry on push
        if let Some((_, evicted)) = inner.entries.push(key, entry) {
            inner.current_size = inner.current_size.saturating_sub(evicted.image.len());
        }
        inner.current_size += image_size;

        while inner.current_size > self.max_size {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => {
                    inner.current_size = inner.current_size.saturating_sub(evicted.image.len());
                }
                None => break,
            }
        }
    }

    /// Remove a tile from the cache.
    pub async fn remove(&self, key: &TileKey) -> Option<TileImage> {
        let mut inner = self.inner.lock().await;
        inner.remove(key).map(|entry| entry.image)
    }

    /// Clear all entries from the cache.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.current_size = 0;
    }

    /// Get the current number of cached tiles, including expired ones not yet dropped.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }

    /// Get the current total size of cached tiles in bytes.
    pub async fn size(&self) -> usize {
        self.inner.lock().await.current_size
    }

    /// Get the maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
