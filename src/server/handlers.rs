//! HTTP request handlers for the sky tile API.
//!
//! Thin adapters over [`TileService`] and [`GalleryService`]: they parse and
//! check query parameters, call one entry point, and shape the response.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check with pipeline counters
//! - `GET /tiles` - Serve one tile
//! - `GET /viewport` - Render the background grid around a center
//! - `GET /gallery/{object_name}` - Multi-survey gallery for an object
//! - `GET /composite` - Blend of two survey renders
//! - `GET /telescope/{telescope}` - Narrow view of a target through one telescope
//! - `GET /project` - Cartesian and screen coordinates for a sky position

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::coords::{
    effective_zoom, format_milli, view_half_width, Cartesian, ScreenPoint, ScreenProjection,
    SkyCoordinate,
};
use crate::error::TileError;
use crate::fetch::TileFetcher;
use crate::gallery::{Category, GalleryService, GallerySource, ObjectMetadata};
use crate::tile::{
    Provenance, RenderFormat, StatsSnapshot, Survey, TileRequest, TileResponse, TileService,
    DEFAULT_COMPOSITE_SURVEYS, MAX_TILE_PIXELS,
};

/// Angular size used when a tile request names none, in degrees.
pub const DEFAULT_ANGULAR_SIZE: f64 = 0.5;

const X_TILE_CACHE_HIT: &str = "x-tile-cache-hit";
const X_TILE_PROVENANCE: &str = "x-tile-provenance";
const X_TILE_KEY: &str = "x-tile-key";
const X_COMPOSITE_SURVEYS: &str = "x-composite-surveys";

/// Most surveys a composite request may name.
pub const MAX_COMPOSITE_LAYERS: usize = 8;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<F> {
    /// Tile pipeline
    pub tile_service: TileService<F>,

    /// Gallery builder over the same pipeline
    pub gallery: Arc<GalleryService<F>>,

    /// Cache-Control max-age for tile responses, in seconds
    pub cache_max_age: u32,
}

impl<F: TileFetcher + 'static> AppState<F> {
    /// Create state with the default gallery tables and a one hour max-age.
    pub fn new(tile_service: TileService<F>) -> Self {
        Self::with_cache_max_age(tile_service, 3600)
    }

    pub fn with_cache_max_age(tile_service: TileService<F>, cache_max_age: u32) -> Self {
        let gallery = Arc::new(GalleryService::with_defaults(tile_service.clone()));
        Self {
            tile_service,
            gallery,
            cache_max_age,
        }
    }

    /// Replace the gallery builder.
    pub fn with_gallery(mut self, gallery: GalleryService<F>) -> Self {
        self.gallery = Arc::new(gallery);
        self
    }
}

impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            tile_service: self.tile_service.clone(),
            gallery: Arc::clone(&self.gallery),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for tile requests.
#[derive(Debug, Deserialize)]
pub struct TileQueryParams {
    pub ra: f64,
    pub dec: f64,

    /// Edge length in degrees (default 0.5)
    #[serde(default)]
    pub size: Option<f64>,

    /// Survey name or wavelength alias (default "DSS2 Red")
    #[serde(default)]
    pub survey: Option<String>,

    #[serde(default)]
    pub width: Option<u32>,

    #[serde(default)]
    pub height: Option<u32>,

    #[serde(default)]
    pub format: Option<RenderFormat>,
}

/// Query parameters for composite requests.
#[derive(Debug, Deserialize)]
pub struct CompositeQueryParams {
    pub ra: f64,
    pub dec: f64,

    #[serde(default)]
    pub size: Option<f64>,

    /// Comma-separated survey names or aliases (default "optical,infrared")
    #[serde(default)]
    pub surveys: Option<String>,

    #[serde(default)]
    pub width: Option<u32>,

    #[serde(default)]
    pub height: Option<u32>,
}

/// Query parameters for telescope views.
#[derive(Debug, Deserialize)]
pub struct TelescopeQueryParams {
    pub ra: f64,
    pub dec: f64,
}

/// Query parameters for viewport requests.
#[derive(Debug, Deserialize)]
pub struct ViewportQueryParams {
    pub ra: f64,
    pub dec: f64,

    /// Zoom level (default 1)
    #[serde(default)]
    pub zoom: Option<u32>,

    #[serde(default)]
    pub survey: Option<String>,
}

/// Query parameters for gallery requests.
#[derive(Debug, Deserialize)]
pub struct GalleryQueryParams {
    pub ra: f64,
    pub dec: f64,
}

/// Query parameters for projection requests.
#[derive(Debug, Deserialize)]
pub struct ProjectQueryParams {
    pub ra: f64,
    pub dec: f64,

    /// View center; defaults to the projected point
    #[serde(default)]
    pub center_ra: Option<f64>,

    #[serde(default)]
    pub center_dec: Option<f64>,

    #[serde(default)]
    pub zoom: Option<u32>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "invalid_parameter")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub stats: StatsSnapshot,
    pub in_flight: usize,
}

/// One tile of a viewport response.
#[derive(Debug, Serialize)]
pub struct ViewportTileResponse {
    /// Grid offset from the center, in tiles (RA, Dec)
    pub offset: (i32, i32),
    pub ra: f64,
    pub dec: f64,
    pub size: f64,
    pub url: String,
    pub provenance: Provenance,
    pub cache_hit: bool,
}

/// Response from the viewport endpoint.
#[derive(Debug, Serialize)]
pub struct ViewportResponse {
    pub center: SkyCoordinate,
    pub zoom: u32,
    pub view_range: f64,
    pub tile_degree_size: f64,
    pub survey: String,
    pub tiles: Vec<ViewportTileResponse>,
}

/// One gallery entry as served over HTTP.
#[derive(Debug, Serialize)]
pub struct GalleryItemResponse {
    pub category: Category,
    pub survey: String,

    /// `/tiles` URL for survey thumbnails, external URL for flagship images
    pub image_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,

    pub wavelength: String,
    pub telescope: String,
    pub description: String,
    pub timestamp: String,
    pub coordinates: String,
    pub size: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Response from the gallery endpoint.
#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub object: ObjectMetadata,
    pub items: Vec<GalleryItemResponse>,
}

/// Response from the projection endpoint.
#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub coordinate: SkyCoordinate,
    pub center: SkyCoordinate,
    pub zoom: u32,
    pub view_range: f64,
    pub cartesian: Cartesian,
    pub screen: ScreenPoint,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert TileError to HTTP response.
///
/// Every TileError is a client error, logged at WARN.
impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            TileError::InvalidParameter { .. } => (StatusCode::BAD_REQUEST, "invalid_parameter"),
            TileError::EmptySurvey => (StatusCode::BAD_REQUEST, "invalid_survey"),
        };
        let message = self.to_string();

        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

fn query_error(rejection: QueryRejection) -> TileError {
    TileError::InvalidParameter {
        name: "query",
        message: rejection.body_text(),
    }
}

fn parse_survey(survey: Option<&str>) -> Result<Survey, TileError> {
    match survey {
        None => Ok(Survey::default()),
        Some(name) if name.trim().is_empty() => Err(TileError::EmptySurvey),
        Some(name) => Ok(Survey::resolve(name)),
    }
}

fn check_finite(name: &'static str, value: f64) -> Result<f64, TileError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TileError::InvalidParameter {
            name,
            message: "must be a finite number".to_string(),
        })
    }
}

fn check_pixels(name: &'static str, value: Option<u32>, default: u32) -> Result<u32, TileError> {
    match value {
        None => Ok(default),
        Some(0) => Err(TileError::InvalidParameter {
            name,
            message: "must be positive".to_string(),
        }),
        Some(v) if v > MAX_TILE_PIXELS => Err(TileError::InvalidParameter {
            name,
            message: format!("must be at most {}", MAX_TILE_PIXELS),
        }),
        Some(v) => Ok(v),
    }
}

fn check_angular_size(size: Option<f64>) -> Result<f64, TileError> {
    let size = size.unwrap_or(DEFAULT_ANGULAR_SIZE);
    if size.is_finite() && size > 0.0 {
        Ok(size)
    } else {
        Err(TileError::InvalidParameter {
            name: "size",
            message: "must be a positive number of degrees".to_string(),
        })
    }
}

impl TileQueryParams {
    /// Validate and convert into a tile request.
    pub fn into_request(self, default_pixels: u32) -> Result<TileRequest, TileError> {
        let ra = check_finite("ra", self.ra)?;
        let dec = check_finite("dec", self.dec)?;
        let size = check_angular_size(self.size)?;

        let survey = parse_survey(self.survey.as_deref())?;
        let width = check_pixels("width", self.width, default_pixels)?;
        let height = check_pixels("height", self.height, default_pixels)?;

        Ok(TileRequest::new(SkyCoordinate::new(ra, dec), size, survey)
            .with_pixels(width, height)
            .with_format(self.format.unwrap_or_default()))
    }
}

impl CompositeQueryParams {
    /// Validate into the base request and the layer surveys.
    pub fn into_layers(self, default_pixels: u32) -> Result<(TileRequest, Vec<Survey>), TileError> {
        let ra = check_finite("ra", self.ra)?;
        let dec = check_finite("dec", self.dec)?;
        let size = check_angular_size(self.size)?;
        let width = check_pixels("width", self.width, default_pixels)?;
        let height = check_pixels("height", self.height, default_pixels)?;

        let surveys = match self.surveys.as_deref() {
            None => DEFAULT_COMPOSITE_SURVEYS
                .iter()
                .map(|alias| Survey::resolve(alias))
                .collect(),
            Some(list) => list
                .split(',')
                .map(|name| parse_survey(Some(name)))
                .collect::<Result<Vec<_>, _>>()?,
        };
        if surveys.len() > MAX_COMPOSITE_LAYERS {
            return Err(TileError::InvalidParameter {
                name: "surveys",
                message: format!("at most {} surveys", MAX_COMPOSITE_LAYERS),
            });
        }

        let base = TileRequest::new(SkyCoordinate::new(ra, dec), size, Survey::default())
            .with_pixels(width, height);
        Ok((base, surveys))
    }
}

/// `/tiles` URL that reproduces `request`.
///
/// Coordinates are written at cache-key precision.
pub fn tile_url(request: &TileRequest) -> String {
    format!(
        "/tiles?ra={}&dec={}&size={}&survey={}&width={}&height={}&format={}",
        format_milli(request.center.ra_milli()),
        format_milli(request.center.dec_milli()),
        request.angular_size,
        urlencoding::encode(request.survey.name()),
        request.width,
        request.height,
        request.format
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /tiles?ra={ra}&dec={dec}&size={deg}&survey={name}&width={px}&height={px}&format={standard|background}`
///
/// # Response
///
/// The encoded tile with headers:
/// - `Content-Type`: the tile's MIME type
/// - `Cache-Control`: `public, max-age={cache_max_age}`
/// - `X-Tile-Cache-Hit`: `true` when served from cache
/// - `X-Tile-Provenance`: `remote`, `enhanced` or `procedural`
/// - `X-Tile-Key`: canonical cache key
///
/// A tile is always returned; only malformed parameters produce an error.
pub async fn tile_handler<F: TileFetcher + 'static>(
    State(state): State<AppState<F>>,
    query: Result<Query<TileQueryParams>, QueryRejection>,
) -> Result<Response, TileError> {
    let Query(params) = query.map_err(query_error)?;
    let request = params.into_request(state.tile_service.tile_size())?;

    let response = state.tile_service.render_tile(request).await;
    Ok(tile_body(response, state.cache_max_age))
}

/// Encode a rendered tile with its cache and provenance headers.
fn tile_body(response: TileResponse, cache_max_age: u32) -> Response {
    debug!(
        key = %response.key,
        cache_hit = response.cache_hit,
        provenance = %response.image.provenance(),
        "Serving tile"
    );

    let headers = [
        (header::CONTENT_TYPE, response.image.content_type().to_string()),
        (
            header::CACHE_CONTROL,
            format!("public, max-age={}", cache_max_age),
        ),
        (
            HeaderName::from_static(X_TILE_CACHE_HIT),
            response.cache_hit.to_string(),
        ),
        (
            HeaderName::from_static(X_TILE_PROVENANCE),
            response.image.provenance().to_string(),
        ),
        (HeaderName::from_static(X_TILE_KEY), response.key.canonical()),
    ];

    (headers, Body::from(response.image.data().clone())).into_response()
}

/// Handle composite requests.
///
/// # Endpoint
///
/// `GET /composite?ra={ra}&dec={dec}&size={deg}&surveys={a,b}&width={px}&height={px}`
///
/// Blends the first two surveys that render from real imagery. Responds with
/// a procedural tile when fewer than two do. `X-Composite-Surveys` lists the
/// blended surveys and is empty for a procedural response.
pub async fn composite_handler<F: TileFetcher + 'static>(
    State(state): State<AppState<F>>,
    query: Result<Query<CompositeQueryParams>, QueryRejection>,
) -> Result<Response, TileError> {
    let Query(params) = query.map_err(query_error)?;
    let (base, surveys) = params.into_layers(state.tile_service.tile_size())?;

    let composite = state.tile_service.render_composite(base, &surveys).await;
    let blended = composite
        .blended
        .iter()
        .map(Survey::name)
        .collect::<Vec<_>>()
        .join(",");
    debug!(
        blended = %blended,
        provenance = %composite.image.provenance(),
        "Serving composite"
    );

    let headers = [
        (header::CONTENT_TYPE, composite.image.content_type().to_string()),
        (
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache_max_age),
        ),
        (
            HeaderName::from_static(X_TILE_PROVENANCE),
            composite.image.provenance().to_string(),
        ),
        (HeaderName::from_static(X_COMPOSITE_SURVEYS), blended),
    ];

    Ok((headers, Body::from(composite.image.data().clone())).into_response())
}

/// Handle telescope view requests.
///
/// # Endpoint
///
/// `GET /telescope/{telescope}?ra={ra}&dec={dec}`
///
/// Served like `/tiles`, from the survey matching the telescope's band.
pub async fn telescope_handler<F: TileFetcher + 'static>(
    State(state): State<AppState<F>>,
    Path(telescope): Path<String>,
    query: Result<Query<TelescopeQueryParams>, QueryRejection>,
) -> Result<Response, TileError> {
    let Query(params) = query.map_err(query_error)?;
    let target = SkyCoordinate::new(check_finite("ra", params.ra)?, check_finite("dec", params.dec)?);

    let response = state.gallery.telescope_view(&telescope, target).await;
    Ok(tile_body(response, state.cache_max_age))
}

/// Handle viewport requests.
///
/// # Endpoint
///
/// `GET /viewport?ra={ra}&dec={dec}&zoom={level}&survey={name}`
///
/// Renders all 25 background tiles around the center (warming the cache)
/// and returns their footprints with `/tiles` URLs.
pub async fn viewport_handler<F: TileFetcher + 'static>(
    State(state): State<AppState<F>>,
    query: Result<Query<ViewportQueryParams>, QueryRejection>,
) -> Result<Json<ViewportResponse>, TileError> {
    let Query(params) = query.map_err(query_error)?;
    let center = SkyCoordinate::new(check_finite("ra", params.ra)?, check_finite("dec", params.dec)?);
    let survey = parse_survey(params.survey.as_deref())?;
    let service = &state.tile_service;
    let zoom = effective_zoom(params.zoom.unwrap_or(1), service.max_zoom());

    let tiles = service.render_viewport(center, zoom, survey.clone()).await;

    let view_range = view_half_width(service.base_range(), zoom, service.max_zoom());
    let tile_degree_size = tiles.first().map(|t| t.footprint.size).unwrap_or(view_range / 4.0);

    let tiles = tiles
        .into_iter()
        .map(|tile| {
            let request = TileRequest::new(tile.footprint.center, tile.footprint.size, survey.clone())
                .with_pixels(service.tile_size(), service.tile_size())
                .with_format(RenderFormat::Background);
            ViewportTileResponse {
                offset: tile.footprint.offset,
                ra: tile.footprint.center.ra(),
                dec: tile.footprint.center.dec(),
                size: tile.footprint.size,
                url: tile_url(&request),
                provenance: tile.response.image.provenance(),
                cache_hit: tile.response.cache_hit,
            }
        })
        .collect();

    Ok(Json(ViewportResponse {
        center,
        zoom,
        view_range,
        tile_degree_size,
        survey: survey.name().to_string(),
        tiles,
    }))
}

/// Handle gallery requests.
///
/// # Endpoint
///
/// `GET /gallery/{object_name}?ra={ra}&dec={dec}`
pub async fn gallery_handler<F: TileFetcher + 'static>(
    State(state): State<AppState<F>>,
    Path(object_name): Path<String>,
    query: Result<Query<GalleryQueryParams>, QueryRejection>,
) -> Result<Json<GalleryResponse>, TileError> {
    let Query(params) = query.map_err(query_error)?;
    let coord = SkyCoordinate::new(check_finite("ra", params.ra)?, check_finite("dec", params.dec)?);

    let items = state.gallery.build_gallery(&object_name, coord).await;

    let items = items
        .into_iter()
        .map(|item| {
            let (image_url, provenance) = match &item.source {
                GallerySource::Tile { request, image } => {
                    (tile_url(request), Some(image.provenance()))
                }
                GallerySource::External { url } => (url.clone(), None),
            };
            GalleryItemResponse {
                category: item.category,
                survey: item.survey,
                image_url,
                provenance,
                wavelength: item.wavelength,
                telescope: item.telescope,
                description: item.description,
                timestamp: item.timestamp,
                coordinates: item.coordinates,
                size: item.size,
                notes: item.notes,
            }
        })
        .collect();

    Ok(Json(GalleryResponse {
        object: state.gallery.metadata(&object_name, &coord),
        items,
    }))
}

/// Handle projection requests.
///
/// # Endpoint
///
/// `GET /project?ra={ra}&dec={dec}&center_ra={ra}&center_dec={dec}&zoom={level}`
pub async fn project_handler<F: TileFetcher + 'static>(
    State(state): State<AppState<F>>,
    query: Result<Query<ProjectQueryParams>, QueryRejection>,
) -> Result<Json<ProjectResponse>, TileError> {
    let Query(params) = query.map_err(query_error)?;
    let ra = check_finite("ra", params.ra)?;
    let dec = check_finite("dec", params.dec)?;
    let center_ra = check_finite("center_ra", params.center_ra.unwrap_or(ra))?;
    let center_dec = check_finite("center_dec", params.center_dec.unwrap_or(dec))?;

    let coordinate = SkyCoordinate::new(ra, dec);
    let center = SkyCoordinate::new(center_ra, center_dec);

    let service = &state.tile_service;
    let projection = ScreenProjection {
        base_range: service.base_range(),
        max_zoom: service.max_zoom(),
        ..ScreenProjection::default()
    };
    let zoom = effective_zoom(params.zoom.unwrap_or(1), projection.max_zoom);

    Ok(Json(ProjectResponse {
        coordinate,
        center,
        zoom,
        view_range: view_half_width(projection.base_range, zoom, projection.max_zoom),
        cartesian: coordinate.to_cartesian(),
        screen: projection.to_screen(&coordinate, &center, zoom),
    }))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "stats": { "memory_hits": 12, "fetch_timeouts": 1, ... },
///   "in_flight": 0
/// }
/// ```
pub async fn health_handler<F: TileFetcher + 'static>(
    State(state): State<AppState<F>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        stats: state.tile_service.stats().snapshot(),
        in_flight: state.tile_service.in_flight(),
    })
}
