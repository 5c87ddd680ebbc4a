//! Tile service: the single entry point for rendering a tile.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          TileService                             │
//! │  render_tile()                                                   │
//! │   1. TileStore lookup (memory, then disk)                        │
//! │   2. Join or start the in-flight render for the key              │
//! │   3. Fetch ──ok──▶ enhance ─┐                                    │
//! │        └──err──▶ synthesize ┴──▶ store.put ──▶ wake waiters      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rendering never fails. Fetch and decode errors are logged, counted in
//! [`PipelineStats`], and replaced by a procedural tile.
//!
//! # Deduplication
//!
//! At most one render runs per [`TileKey`]. The first caller for a missing key
//! spawns the render as its own task and registers a watch channel in the
//! in-flight table; later callers subscribe to that channel instead of
//! fetching. Because the render is a detached task, it still completes and
//! populates the cache if every caller goes away.
//!
//! # Composites
//!
//! [`TileService::render_composite`] renders each layer as an ordinary tile,
//! so layers share the cache and deduplication above. Only the blend itself
//! is recomputed per call.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::coords::{SkyCoordinate, TileFootprint, Viewport, DEFAULT_BASE_RANGE, DEFAULT_MAX_ZOOM};
use crate::fetch::TileFetcher;

use super::cache::{TileCache, DEFAULT_TILE_CACHE_CAPACITY};
use super::composite::blend_layers;
use super::disk::DiskCache;
use super::enhance::{ImageEnhancer, DEFAULT_BACKGROUND_QUALITY, DEFAULT_JPEG_QUALITY};
use super::image::{Provenance, TileImage};
use super::key::TileKey;
use super::procedural::{ProceduralGenerator, DEFAULT_PROCEDURAL_QUALITY};
use super::request::{RenderFormat, Survey, TileRequest, DEFAULT_TILE_SIZE};
use super::stats::PipelineStats;
use super::store::TileStore;

/// Default memory-tier lifetime.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default memory-tier entry limit.
pub const DEFAULT_CACHE_ENTRIES: usize = 10_000;

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// Settings for building a [`TileService`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Persistent tier directory; `None` keeps tiles in memory only
    pub cache_dir: Option<PathBuf>,

    /// Memory tier capacity in bytes
    pub memory_capacity: usize,

    /// Memory tier entry limit
    pub max_entries: usize,

    /// Memory tier entry lifetime
    pub ttl: Option<Duration>,

    /// JPEG quality for standard tiles
    pub jpeg_quality: u8,

    /// JPEG quality for background tiles
    pub background_quality: u8,

    /// JPEG quality for procedural tiles
    pub procedural_quality: u8,

    /// Pixel edge of viewport tiles
    pub tile_size: u32,

    /// Visible RA half-width at zoom 1, in degrees
    pub base_range: f64,

    /// Zoom level beyond which scaling saturates
    pub max_zoom: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            memory_capacity: DEFAULT_TILE_CACHE_CAPACITY,
            max_entries: DEFAULT_CACHE_ENTRIES,
            ttl: Some(DEFAULT_CACHE_TTL),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            background_quality: DEFAULT_BACKGROUND_QUALITY,
            procedural_quality: DEFAULT_PROCEDURAL_QUALITY,
            tile_size: DEFAULT_TILE_SIZE,
            base_range: DEFAULT_BASE_RANGE,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }
}

// =============================================================================
// Tile Response
// =============================================================================

/// Response from the tile service.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// The rendered tile
    pub image: TileImage,

    /// Whether the tile was already cached when the request arrived
    pub cache_hit: bool,

    /// Key the tile is cached under
    pub key: TileKey,
}

/// A blend of several survey renders of one patch of sky.
#[derive(Debug, Clone)]
pub struct CompositeResponse {
    /// Blended JPEG, or a procedural tile when fewer than two layers rendered
    pub image: TileImage,

    /// Surveys whose pixels were blended, in blend order
    pub blended: Vec<Survey>,

    /// Every layer render, in request order
    pub layers: Vec<TileResponse>,
}

/// One tile of a rendered viewport.
#[derive(Debug, Clone)]
pub struct ViewportTile {
    pub footprint: TileFootprint,
    pub response: TileResponse,
}

// =============================================================================
// Tile Service
// =============================================================================

type InFlight = Mutex<HashMap<TileKey, watch::Receiver<Option<TileImage>>>>;

struct Pipeline<F> {
    fetcher: Arc<F>,
    store: Arc<TileStore>,
    enhancer: ImageEnhancer,
    generator: ProceduralGenerator,
    stats: Arc<PipelineStats>,
    in_flight: InFlight,
}

/// Renders tiles through the cache, fetch, enhance and fallback pipeline.
///
/// Cheap to clone; clones share the store and the in-flight table.
///
/// # Type Parameters
///
/// * `F` - The remote fetcher (e.g. [`SkyViewFetcher`](crate::fetch::SkyViewFetcher))
pub struct TileService<F> {
    pipeline: Arc<Pipeline<F>>,
    tile_size: u32,
    base_range: f64,
    max_zoom: u32,
}

impl<F> Clone for TileService<F> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            tile_size: self.tile_size,
            base_range: self.base_range,
            max_zoom: self.max_zoom,
        }
    }
}

impl<F: TileFetcher + 'static> TileService<F> {
    /// Build a service and its store from configuration.
    pub fn new(fetcher: F, config: &PipelineConfig) -> Self {
        let stats = Arc::new(PipelineStats::new());
        let memory = TileCache::with_limits(config.memory_capacity, config.max_entries, config.ttl);
        let disk = config.cache_dir.clone().map(DiskCache::new);
        let store = Arc::new(TileStore::new(memory, disk, stats));
        Self::with_store(Arc::new(fetcher), store, config)
    }

    /// Build a service over an existing store.
    ///
    /// Counters are shared with the store.
    pub fn with_store(fetcher: Arc<F>, store: Arc<TileStore>, config: &PipelineConfig) -> Self {
        let stats = Arc::clone(store.stats());
        Self {
            pipeline: Arc::new(Pipeline {
                fetcher,
                store,
                enhancer: ImageEnhancer::new(config.jpeg_quality, config.background_quality),
                generator: ProceduralGenerator::new(config.procedural_quality),
                stats,
                in_flight: Mutex::new(HashMap::new()),
            }),
            tile_size: config.tile_size.max(1),
            base_range: config.base_range,
            max_zoom: config.max_zoom.max(1),
        }
    }

    /// Render a tile. Never fails.
    ///
    /// Callers that join an in-flight render report `cache_hit: false`.
    pub async fn render_tile(&self, request: TileRequest) -> TileResponse {
        let key = TileKey::from_request(&request);

        if let Some(image) = self.pipeline.store.get(&key).await {
            debug!(key = %key, "Tile cache hit");
            return TileResponse {
                image,
                cache_hit: true,
                key,
            };
        }

        let mut rx = self.subscribe_or_start(&key, request);

        let image = match rx.wait_for(Option::is_some).await {
            Ok(image) => image.clone().unwrap_or_else(TileImage::placeholder),
            Err(_) => {
                error!(key = %key, "Tile render task ended without a result");
                self.pipeline.stats.record_placeholder();
                TileImage::placeholder()
            }
        };

        TileResponse {
            image,
            cache_hit: false,
            key,
        }
    }

    /// Render the 5x5 background grid around `center`.
    ///
    /// Tiles render concurrently; the result follows
    /// [`Viewport::tile_footprints`] order.
    pub async fn render_viewport(
        &self,
        center: SkyCoordinate,
        zoom: u32,
        survey: Survey,
    ) -> Vec<ViewportTile> {
        let viewport = Viewport::new(center, zoom, self.base_range, self.max_zoom);

        let handles: Vec<_> = viewport
            .tile_footprints()
            .into_iter()
            .map(|footprint| {
                let request = TileRequest::new(footprint.center, footprint.size, survey.clone())
                    .with_pixels(self.tile_size, self.tile_size)
                    .with_format(RenderFormat::Background);
                let service = self.clone();
                let handle = tokio::spawn(async move { service.render_tile(request).await });
                (footprint, handle)
            })
            .collect();

        let mut tiles = Vec::with_capacity(handles.len());
        for (footprint, handle) in handles {
            let response = match handle.await {
                Ok(response) => response,
                Err(e) => {
                    error!(error = %e, offset = ?footprint.offset, "Viewport tile task failed");
                    self.pipeline.stats.record_placeholder();
                    let request = TileRequest::new(footprint.center, footprint.size, survey.clone())
                        .with_format(RenderFormat::Background);
                    TileResponse {
                        image: TileImage::placeholder(),
                        cache_hit: false,
                        key: TileKey::from_request(&request),
                    }
                }
            };
            tiles.push(ViewportTile {
                footprint,
                response,
            });
        }
        tiles
    }

    /// Blend the first two surveys that render from real imagery.
    ///
    /// `base` supplies the center, footprint, pixel size and format; its
    /// survey is replaced by each entry of `surveys`. Layers render
    /// concurrently and are cached individually. With fewer than two usable
    /// layers, or if blending fails, the result is the procedural tile for
    /// `base`.
    pub async fn render_composite(&self, base: TileRequest, surveys: &[Survey]) -> CompositeResponse {
        let handles: Vec<_> = surveys
            .iter()
            .map(|survey| {
                let request = base.clone().with_survey(survey.clone());
                let service = self.clone();
                tokio::spawn(async move { service.render_tile(request).await })
            })
            .collect();

        let mut layers = Vec::with_capacity(handles.len());
        for (survey, handle) in surveys.iter().zip(handles) {
            match handle.await {
                Ok(response) => layers.push(response),
                Err(e) => error!(survey = %survey, error = %e, "Composite layer task failed"),
            }
        }

        let usable: Vec<&TileResponse> = layers
            .iter()
            .filter(|layer| layer.image.provenance() != Provenance::Procedural)
            .take(2)
            .collect();

        if let [first, second] = usable[..] {
            let blended = vec![first.key.survey().clone(), second.key.survey().clone()];
            if let Some(image) = self.pipeline.blend(first, second).await {
                debug!(surveys = ?blended, "Blended composite");
                return CompositeResponse {
                    image,
                    blended,
                    layers,
                };
            }
        } else {
            debug!(
                usable = usable.len(),
                requested = surveys.len(),
                "Too few survey layers for a composite; synthesizing"
            );
        }

        let image = self.pipeline.synthesize(base).await;
        CompositeResponse {
            image,
            blended: Vec::new(),
            layers,
        }
    }

    /// Join the in-flight render for `key`, or start one.
    fn subscribe_or_start(
        &self,
        key: &TileKey,
        request: TileRequest,
    ) -> watch::Receiver<Option<TileImage>> {
        let mut in_flight = self
            .pipeline
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(rx) = in_flight.get(key) {
            debug!(key = %key, "Joining in-flight tile render");
            return rx.clone();
        }

        let (tx, rx) = watch::channel(None);
        in_flight.insert(key.clone(), rx.clone());
        drop(in_flight);

        let pipeline = Arc::clone(&self.pipeline);
        let key = key.clone();
        tokio::spawn(async move {
            let _guard = InFlightGuard {
                table: &pipeline.in_flight,
                key: &key,
            };
            let image = pipeline.produce(&key, request).await;
            tx.send_replace(Some(image));
        });

        rx
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.pipeline.stats
    }

    pub fn store(&self) -> &Arc<TileStore> {
        &self.pipeline.store
    }

    pub fn fetcher(&self) -> &Arc<F> {
        &self.pipeline.fetcher
    }

    /// Number of keys currently being rendered.
    pub fn in_flight(&self) -> usize {
        self.pipeline
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn base_range(&self) -> f64 {
        self.base_range
    }

    pub fn max_zoom(&self) -> u32 {
        self.max_zoom
    }
}

/// Removes a key from the in-flight table when its render task ends,
/// including by panic.
struct InFlightGuard<'a> {
    table: &'a InFlight,
    key: &'a TileKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(self.key);
    }
}

impl<F: TileFetcher + 'static> Pipeline<F> {
    /// Produce and cache the tile for a missing key.
    async fn produce(&self, key: &TileKey, request: TileRequest) -> TileImage {
        // Another render may have finished between the caller's lookup and
        // this task registering itself.
        if let Some(image) = self.store.get(key).await {
            return image;
        }
        self.stats.record_miss();

        self.stats.record_remote_fetch();
        let image = match self.fetcher.fetch(&request).await {
            Ok(raw) => self.enhance(raw, request).await,
            Err(e) => {
                warn!(
                    survey = %request.survey,
                    ra = request.center.ra(),
                    dec = request.center.dec(),
                    kind = e.kind(),
                    error = %e,
                    fetcher = self.fetcher.name(),
                    "Tile fetch failed; synthesizing procedural tile"
                );
                self.stats.record_fetch_failure(&e);
                self.synthesize(request).await
            }
        };

        self.store.put(key.clone(), image.clone()).await;
        image
    }

    async fn enhance(&self, raw: crate::fetch::RawTile, request: TileRequest) -> TileImage {
        let enhancer = self.enhancer;
        let fallback = raw.clone();
        match tokio::task::spawn_blocking(move || enhancer.enhance(&raw, &request)).await {
            Ok(image) => {
                if image.provenance() == Provenance::Remote {
                    self.stats.record_decode_failure();
                }
                image
            }
            Err(e) => {
                error!(error = %e, "Enhancement task failed; serving fetched bytes");
                self.stats.record_decode_failure();
                TileImage::new(fallback.data, fallback.content_type.as_str(), Provenance::Remote)
            }
        }
    }

    /// Blend two layers, or `None` if either cannot be decoded.
    async fn blend(&self, first: &TileResponse, second: &TileResponse) -> Option<TileImage> {
        let quality = self.enhancer.quality_for(RenderFormat::Standard);
        let base = first.image.data().clone();
        let top = second.image.data().clone();

        match tokio::task::spawn_blocking(move || blend_layers(&base, &top, quality)).await {
            Ok(Ok(data)) => Some(TileImage::jpeg(data, Provenance::Enhanced)),
            Ok(Err(e)) => {
                warn!(error = %e, "Composite blend failed; synthesizing");
                self.stats.record_decode_failure();
                None
            }
            Err(e) => {
                error!(error = %e, "Composite blend task failed; synthesizing");
                self.stats.record_decode_failure();
                None
            }
        }
    }

    async fn synthesize(&self, request: TileRequest) -> TileImage {
        let generator = self.generator;
        let image = match tokio::task::spawn_blocking(move || generator.synthesize(&request)).await
        {
            Ok(image) => image,
            Err(e) => {
                error!(error = %e, "Synthesis task failed; serving placeholder");
                TileImage::placeholder()
            }
        };

        if image.is_placeholder() {
            self.stats.record_placeholder();
        } else {
            self.stats.record_procedural();
        }
        image
    }
}
