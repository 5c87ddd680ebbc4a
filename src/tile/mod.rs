//! Tile pipeline.
//!
//! Turns a [`TileRequest`] into a displayable [`TileImage`], serving it from
//! cache when possible.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       HTTP Handlers / Gallery           │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              TileService                │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  TileStore   │  │  ImageEnhancer  │  │
//! │  │  memory LRU  │  ├─────────────────┤  │
//! │  │  + disk      │  │  Procedural     │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │        TileFetcher (SkyView)            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileService`]: orchestrates lookup, fetch, enhancement and fallback
//! - [`TileStore`]: two-tier store over [`TileCache`] and [`DiskCache`]
//! - [`TileKey`]: rounding-normalized cache key and file stem
//! - [`ImageEnhancer`]: contrast stretch, gamma, background styling
//! - [`ProceduralGenerator`]: seeded starfield fallback
//! - [`blend_layers`]: equal-weight blend behind composites
//! - [`PipelineStats`]: counters for every absorbed failure
//!
//! # Example
//!
//! ```
//! use sky_streamer::coords::SkyCoordinate;
//! use sky_streamer::tile::{Provenance, Survey, TileCache, TileImage, TileKey, TileRequest};
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = TileCache::with_capacity(50 * 1024 * 1024);
//!
//!     let request = TileRequest::new(
//!         SkyCoordinate::new(10.685, 41.269),
//!         0.5,
//!         Survey::new("DSS2 Red"),
//!     );
//!     let key = TileKey::from_request(&request);
//!
//!     if cache.get(&key).await.is_none() {
//!         let tile = TileImage::jpeg(Bytes::from_static(&[0xFF, 0xD8, 0xFF]), Provenance::Remote);
//!         cache.put(key, tile).await;
//!     }
//! }
//! ```

mod cache;
mod composite;
mod disk;
mod enhance;
mod image;
mod key;
mod procedural;
mod request;
mod service;
mod stats;
mod store;

pub use cache::{CacheEntry, TileCache, DEFAULT_TILE_CACHE_CAPACITY};
pub use composite::{blend_layers, BLEND_ALPHA, DEFAULT_COMPOSITE_SURVEYS};
pub use disk::DiskCache;
pub use enhance::{
    clamp_quality, encode_jpeg, ImageEnhancer, BACKGROUND_BLUR_SIGMA, BACKGROUND_DARKEN,
    DEFAULT_BACKGROUND_QUALITY, DEFAULT_JPEG_QUALITY, GAMMA, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use self::image::{
    extension_for, sniff_content_type, Provenance, TileImage, MIME_JPEG, MIME_PNG, MIME_SVG,
};
pub use key::TileKey;
pub use procedural::{seed_for, ProceduralGenerator, DEFAULT_PROCEDURAL_QUALITY};
pub use request::{
    RenderFormat, Survey, TileRequest, DEFAULT_SURVEY, DEFAULT_TILE_SIZE, MAX_TILE_PIXELS,
    MIN_ANGULAR_SIZE,
};
pub use service::{
    CompositeResponse, PipelineConfig, TileResponse, TileService, ViewportTile, DEFAULT_CACHE_ENTRIES,
    DEFAULT_CACHE_TTL,
};
pub use stats::{PipelineStats, StatsSnapshot};
pub use store::{CacheTier, TileStore};
