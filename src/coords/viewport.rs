//! Sky-to-screen projection and viewport tile grids.
//!
//! The visible angular half-width at zoom level `z` is
//! `base_range / 2^(z - 1)` in right ascension, and half that in declination.
//! Zoom is clamped to `[1, max_zoom]`: past the maximum the scale saturates,
//! panning stays unrestricted.

use serde::Serialize;

use super::sky::{clamp_dec, wrap_ra, SkyCoordinate};

/// Default visible range at zoom level 1, in degrees.
pub const DEFAULT_BASE_RANGE: f64 = 60.0;

/// Default maximum zoom level.
pub const DEFAULT_MAX_ZOOM: u32 = 4;

/// Number of tiles across one view range.
const TILES_PER_VIEW: f64 = 4.0;

/// Tile grid reaches this many tiles either side of the center.
const GRID_RADIUS: i32 = 2;

/// Clamp a zoom level into `[1, max_zoom]`.
#[inline]
pub fn effective_zoom(zoom: u32, max_zoom: u32) -> u32 {
    zoom.clamp(1, max_zoom.max(1))
}

/// Angular half-width of the view at the given zoom.
pub fn view_half_width(base_range: f64, zoom: u32, max_zoom: u32) -> f64 {
    let z = effective_zoom(zoom, max_zoom);
    base_range / f64::from(1u32 << (z - 1).min(30))
}

/// Signed RA difference folded into [-180, 180).
#[inline]
fn ra_delta(ra: f64, center_ra: f64) -> f64 {
    (ra - center_ra + 180.0).rem_euclid(360.0) - 180.0
}

/// A point in viewport pixel space. May lie outside the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// Maps sky coordinates onto a pixel viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenProjection {
    /// Visible RA range at zoom level 1, in degrees
    pub base_range: f64,

    /// Zoom level at which scaling saturates
    pub max_zoom: u32,

    /// Viewport width in pixels
    pub width: u32,

    /// Viewport height in pixels
    pub height: u32,
}

impl Default for ScreenProjection {
    fn default() -> Self {
        Self {
            base_range: DEFAULT_BASE_RANGE,
            max_zoom: DEFAULT_MAX_ZOOM,
            width: 800,
            height: 800,
        }
    }
}

impl ScreenProjection {
    /// Project `coord` into a viewport centered on `center` at `zoom`.
    ///
    /// RA increases to the right and Dec upwards; the center lands in the
    /// middle of the viewport.
    pub fn to_screen(&self, coord: &SkyCoordinate, center: &SkyCoordinate, zoom: u32) -> ScreenPoint {
        let half_ra = view_half_width(self.base_range, zoom, self.max_zoom);
        let half_dec = half_ra / 2.0;

        let half_w = f64::from(self.width) / 2.0;
        let half_h = f64::from(self.height) / 2.0;

        let d_ra = ra_delta(coord.ra(), center.ra());
        let d_dec = coord.dec() - center.dec();

        ScreenPoint {
            x: half_w + d_ra / half_ra * half_w,
            y: half_h - d_dec / half_dec * half_h,
        }
    }
}

/// Free-function form of [`ScreenProjection::to_screen`] with default settings.
pub fn to_screen(coord: &SkyCoordinate, center: &SkyCoordinate, zoom: u32) -> ScreenPoint {
    ScreenProjection::default().to_screen(coord, center, zoom)
}

/// One tile-sized patch of sky within a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileFootprint {
    /// Tile center, already wrapped and clamped
    pub center: SkyCoordinate,

    /// Edge length in degrees
    pub size: f64,

    /// Grid offset from the viewport center, in tiles
    pub offset: (i32, i32),
}

/// The visible region for a center and zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    center: SkyCoordinate,
    zoom: u32,
    view_range: f64,
}

impl Viewport {
    /// Create a viewport, clamping the zoom level.
    pub fn new(center: SkyCoordinate, zoom: u32, base_range: f64, max_zoom: u32) -> Self {
        Self {
            center,
            zoom: effective_zoom(zoom, max_zoom),
            view_range: view_half_width(base_range, zoom, max_zoom),
        }
    }

    /// Viewport with the default base range and maximum zoom.
    pub fn with_defaults(center: SkyCoordinate, zoom: u32) -> Self {
        Self::new(center, zoom, DEFAULT_BASE_RANGE, DEFAULT_MAX_ZOOM)
    }

    pub fn center(&self) -> SkyCoordinate {
        self.center
    }

    /// Zoom level after clamping.
    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    /// Visible RA half-width in degrees.
    pub fn view_range(&self) -> f64 {
        self.view_range
    }

    /// Edge length of one background tile in degrees.
    pub fn tile_degree_size(&self) -> f64 {
        self.view_range / TILES_PER_VIEW
    }

    /// Footprints of the 5x5 tile grid around the center.
    ///
    /// Ordered column by column (RA offset outer, Dec offset inner). Tiles
    /// past a pole clamp onto it, so several footprints may coincide there.
    pub fn tile_footprints(&self) -> Vec<TileFootprint> {
        let size = self.tile_degree_size();
        let mut tiles = Vec::with_capacity(((2 * GRID_RADIUS + 1) * (2 * GRID_RADIUS + 1)) as usize);

        for i in -GRID_RADIUS..=GRID_RADIUS {
            for j in -GRID_RADIUS..=GRID_RADIUS {
                let ra = wrap_ra(self.center.ra() + f64::from(i) * size);
                let dec = clamp_dec(self.center.dec() + f64::from(j) * size);
                tiles.push(TileFootprint {
                    center: SkyCoordinate::new(ra, dec),
                    size,
                    offset: (i, j),
                });
            }
        }

        tiles
    }
}
