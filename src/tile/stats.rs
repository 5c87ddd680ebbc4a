//! Counters for the tile pipeline.
//!
//! Every failure the pipeline absorbs is counted here as well as logged.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::error::FetchError;

#[derive(Debug, Default)]
pub struct PipelineStats {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    misses: AtomicU64,
    remote_fetches: AtomicU64,
    fetch_timeouts: AtomicU64,
    fetch_unreachable: AtomicU64,
    fetch_bad_responses: AtomicU64,
    decode_failures: AtomicU64,
    procedural_tiles: AtomicU64,
    placeholder_tiles: AtomicU64,
    disk_read_failures: AtomicU64,
    disk_write_failures: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub misses: u64,
    pub remote_fetches: u64,
    pub fetch_timeouts: u64,
    pub fetch_unreachable: u64,
    pub fetch_bad_responses: u64,
    pub decode_failures: u64,
    pub procedural_tiles: u64,
    pub placeholder_tiles: u64,
    pub disk_read_failures: u64,
    pub disk_write_failures: u64,
}

#[inline]
fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_memory_hit(&self) {
        bump(&self.memory_hits);
    }

    pub fn record_disk_hit(&self) {
        bump(&self.disk_hits);
    }

    pub fn record_miss(&self) {
        bump(&self.misses);
    }

    pub fn record_remote_fetch(&self) {
        bump(&self.remote_fetches);
    }

    pub fn record_fetch_failure(&self, error: &FetchError) {
        match error {
            FetchError::Timeout => bump(&self.fetch_timeouts),
            FetchError::Unreachable(_) => bump(&self.fetch_unreachable),
            FetchError::BadResponse(_) => bump(&self.fetch_bad_responses),
        }
    }

    pub fn record_decode_failure(&self) {
        bump(&self.decode_failures);
    }

    pub fn record_procedural(&self) {
        bump(&self.procedural_tiles);
    }

    pub fn record_placeholder(&self) {
        bump(&self.placeholder_tiles);
    }

    pub fn record_disk_read_failure(&self) {
        bump(&self.disk_read_failures);
    }

    pub fn record_disk_write_failure(&self) {
        bump(&self.disk_write_failures);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            memory_hits: load(&self.memory_hits),
            disk_hits: load(&self.disk_hits),
            misses: load(&self.misses),
            remote_fetches: load(&self.remote_fetches),
            fetch_timeouts: load(&self.fetch_timeouts),
            fetch_unreachable: load(&self.fetch_unreachable),
            fetch_bad_responses: load(&self.fetch_bad_responses),
            decode_failures: load(&self.decode_failures),
            procedural_tiles: load(&self.procedural_tiles),
            placeholder_tiles: load(&self.placeholder_tiles),
            disk_read_failures: load(&self.disk_read_failures),
            disk_write_failures: load(&self.disk_write_failures),
        }
    }
}
