//! Two-tier tile store.
//!
//! Lookups go to the in-memory [`TileCache`] first, then to the optional
//! [`DiskCache`]. A disk hit is promoted into memory before returning.
//! Writes go to both tiers; a failed disk write is logged and counted but
//! never fails the call.

use std::sync::Arc;

use tracing::{debug, warn};

use super::cache::TileCache;
use super::disk::DiskCache;
use super::image::TileImage;
use super::key::TileKey;
use super::stats::PipelineStats;

/// Which tier satisfied a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Memory,
    Disk,
}

pub struct TileStore {
    memory: TileCache,
    disk: Option<DiskCache>,
    stats: Arc<PipelineStats>,
}

impl TileStore {
    /// A store backed by memory and, if given, a cache directory.
    pub fn new(memory: TileCache, disk: Option<DiskCache>, stats: Arc<PipelineStats>) -> Self {
        Self {
            memory,
            disk,
            stats,
        }
    }

    /// A memory-only store with default limits.
    pub fn in_memory() -> Self {
        Self::new(TileCache::new(), None, Arc::new(PipelineStats::new()))
    }

    /// Look a tile up, returning which tier held it.
    ///
    /// Disk read errors are treated as a miss.
    pub async fn lookup(&self, key: &TileKey) -> Option<(TileImage, CacheTier)> {
        if let Some(image) = self.memory.get(key).await {
            self.stats.record_memory_hit();
            return Some((image, CacheTier::Memory));
        }

        let disk = self.disk.as_ref()?;
        match disk.load(key).await {
            Ok(Some(image)) => {
                debug!(key = %key, "Promoting disk tile into memory");
                self.stats.record_disk_hit();
                self.memory.put(key.clone(), image.clone()).await;
                Some((image, CacheTier::Disk))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read cached tile from disk");
                self.stats.record_disk_read_failure();
                None
            }
        }
    }

    /// Look a tile up in either tier.
    pub async fn get(&self, key: &TileKey) -> Option<TileImage> {
        self.lookup(key).await.map(|(image, _)| image)
    }

    /// Store a tile in both tiers.
    pub async fn put(&self, key: TileKey, image: TileImage) {
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.store(&key, &image).await {
                warn!(
                    key = %key,
                    dir = %disk.root().display(),
                    error = %e,
                    "Failed to persist tile; keeping it in memory only"
                );
                self.stats.record_disk_write_failure();
            }
        }
        self.memory.put(key, image).await;
    }

    pub fn memory(&self) -> &TileCache {
        &self.memory
    }

    pub fn disk(&self) -> Option<&DiskCache> {
        self.disk.as_ref()
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }
}
