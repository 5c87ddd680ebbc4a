//! Coordinate transforms shared by the tile pipeline and vector overlays.
//!
//! - [`SkyCoordinate`]: normalized (RA, Dec) pair with unit-sphere projection
//! - [`ScreenProjection`]: sky-to-pixel mapping for a center and zoom level
//! - [`Viewport`]: derives the grid of [`TileFootprint`]s needed to fill a view

mod sky;
mod viewport;

pub use sky::{
    clamp_dec, format_milli, round_milli, to_cartesian, wrap_ra, Cartesian, SkyCoordinate,
    MILLIDEGREES_PER_DEGREE,
};
pub use viewport::{
    effective_zoom, to_screen, view_half_width, ScreenPoint, ScreenProjection, TileFootprint,
    Viewport, DEFAULT_BASE_RANGE, DEFAULT_MAX_ZOOM,
};
