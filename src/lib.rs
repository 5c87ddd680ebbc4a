//! # Sky Streamer
//!
//! A cached tile server for astronomical sky-survey imagery.
//!
//! Tiles are requested by sky position, angular size and survey name. Each
//! request is served from a two-tier cache (memory, then disk) or fetched
//! from a SkyView-compatible imaging service, contrast-enhanced and cached.
//! When the service times out or fails, a deterministic procedural starfield
//! is synthesized and cached in its place, so a client always gets an image.
//!
//! ## Features
//!
//! - **Single-flight fetching**: concurrent requests for one tile trigger one upstream fetch
//! - **Two-tier caching**: byte-bounded LRU memory tier over a persistent disk tier
//! - **Graceful degradation**: procedural starfields when the upstream service fails
//! - **Viewport grids**: 5x5 background grids derived from a center and zoom level
//! - **Galleries**: one object across optical, infrared, X-ray and radio surveys
//! - **Composites**: two surveys blended into one tile
//! - **Telescope views**: a narrow tile from the survey matching an instrument's band
//!
//! ## Architecture
//!
//! - [`coords`] - Sky coordinates, screen projection and viewport tiling
//! - [`fetch`] - Upstream imaging service client
//! - [`tile`] - Tile keys, caches, enhancement, procedural synthesis and the pipeline
//! - [`gallery`] - Survey catalog, flagship imagery and gallery assembly
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use sky_streamer::{create_router, PipelineConfig, RouterConfig, SkyViewFetcher, TileService};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let endpoint = url::Url::parse(sky_streamer::fetch::DEFAULT_SKYVIEW_URL).unwrap();
//!     let fetcher = SkyViewFetcher::new(endpoint, Duration::from_secs(30)).unwrap();
//!     let tiles = TileService::new(fetcher, &PipelineConfig::default());
//!     let router = create_router(tiles, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod coords;
pub mod error;
pub mod fetch;
pub mod gallery;
pub mod server;
pub mod tile;

// Re-export commonly used types
pub use config::Config;
pub use coords::{ScreenPoint, ScreenProjection, SkyCoordinate, TileFootprint, Viewport};
pub use error::{DecodeError, FetchError, TileError};
pub use fetch::{RawTile, SkyViewFetcher, TileFetcher};
pub use gallery::{
    Category, FlagshipTable, GalleryItem, GalleryService, GallerySource, SurveyCatalog,
};
pub use server::{create_router, create_router_with_state, AppState, RouterConfig};
pub use tile::{
    CompositeResponse, DiskCache, ImageEnhancer, PipelineConfig, PipelineStats, ProceduralGenerator, Provenance,
    RenderFormat, Survey, TileCache, TileImage, TileKey, TileRequest, TileResponse, TileService,
    TileStore,
};
