//! HTTP server for the sky tile pipeline.
//!
//! - [`handlers`]: request handlers, response types and error mapping
//! - [`routes`]: router assembly with CORS and tracing layers

pub mod handlers;
pub mod routes;

pub use handlers::{
    composite_handler, gallery_handler, health_handler, project_handler, telescope_handler,
    tile_handler, tile_url, viewport_handler, AppState, CompositeQueryParams, ErrorResponse,
    GalleryItemResponse, GalleryQueryParams, GalleryResponse, HealthResponse, ProjectQueryParams,
    ProjectResponse, TelescopeQueryParams, TileQueryParams, ViewportQueryParams,
    ViewportResponse, ViewportTileResponse, DEFAULT_ANGULAR_SIZE, MAX_COMPOSITE_LAYERS,
};
pub use routes::{create_router, create_router_with_state, RouterConfig};
