//! Router configuration for Sky Streamer.
//!
//! # Route Structure
//!
//! ```text
//! /health                  - Health check and pipeline counters
//! /tiles                   - Single tile (query parameters)
//! /viewport                - 5x5 background grid around a center
//! /gallery/{object_name}   - Multi-survey gallery
//! /composite               - Blend of two survey renders
//! /telescope/{telescope}   - Telescope view of a target
//! /project                 - Coordinate projection helper
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sky_streamer::fetch::SkyViewFetcher;
//! use sky_streamer::server::{create_router, RouterConfig};
//! use sky_streamer::tile::{PipelineConfig, TileService};
//!
//! let fetcher = SkyViewFetcher::new(endpoint, timeout)?;
//! let tile_service = TileService::new(fetcher, &PipelineConfig::default());
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//! let router = create_router(tile_service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    composite_handler, gallery_handler, health_handler, project_handler, telescope_handler,
    tile_handler, viewport_handler, AppState,
};
use crate::fetch::TileFetcher;
use crate::tile::TileService;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age for tile responses, in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Any origin, one hour max-age, tracing on.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            enable_tracing: true,
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the router with the default gallery tables.
pub fn create_router<F>(tile_service: TileService<F>, config: RouterConfig) -> Router
where
    F: TileFetcher + 'static,
{
    let app_state = AppState::with_cache_max_age(tile_service, config.cache_max_age);
    create_router_with_state(app_state, &config)
}

/// Create the router over prepared state.
pub fn create_router_with_state<F>(app_state: AppState<F>, config: &RouterConfig) -> Router
where
    F: TileFetcher + 'static,
{
    let cors = build_cors_layer(config);

    let router = Router::new()
        .route("/health", get(health_handler::<F>))
        .route("/tiles", get(tile_handler::<F>))
        .route("/viewport", get(viewport_handler::<F>))
        .route("/gallery/{object_name}", get(gallery_handler::<F>))
        .route("/project", get(project_handler::<F>))
        .route("/composite", get(composite_handler::<F>))
        .route("/telescope/{telescope}", get(telescope_handler::<F>))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        // No origins allowed - this effectively disables CORS
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}
