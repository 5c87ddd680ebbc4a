//! Tile request parameters.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::coords::SkyCoordinate;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Largest pixel edge a tile may request.
pub const MAX_TILE_PIXELS: u32 = 4096;

/// Smallest angular size a tile may cover, in degrees.
///
/// Anything below rounds to zero at the fingerprint precision.
pub const MIN_ANGULAR_SIZE: f64 = 0.001;

/// Fallback survey when a request names none.
pub const DEFAULT_SURVEY: &str = "DSS2 Red";

/// Wavelength aliases accepted in place of a survey name.
const SURVEY_ALIASES: &[(&str, &str)] = &[
    ("optical", "DSS2 Red"),
    ("infrared", "2MASS-J"),
    ("radio", "NVSS"),
    ("xray", "RASS"),
    ("gamma", "Fermi 5"),
];

// =============================================================================
// Survey
// =============================================================================

/// A named survey on the imaging service (e.g. "DSS2 Red", "2MASS-J").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Survey(Arc<str>);

impl Survey {
    /// Create a survey from its service name, trimming whitespace.
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name.trim()))
    }

    /// Resolve a wavelength alias ("optical", "infrared", ...) or pass a
    /// survey name through unchanged.
    pub fn resolve(name_or_alias: &str) -> Self {
        let trimmed = name_or_alias.trim();
        SURVEY_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(trimmed))
            .map(|(_, survey)| Self::new(survey))
            .unwrap_or_else(|| Self::new(trimmed))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for Survey {
    fn default() -> Self {
        Self::new(DEFAULT_SURVEY)
    }
}

impl fmt::Display for Survey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Render Format
// =============================================================================

/// How a fetched tile is post-processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderFormat {
    /// Contrast stretch and gamma, for thumbnails and detail views
    #[default]
    Standard,

    /// Standard processing, then darkened and softened to sit behind overlays
    Background,
}

impl RenderFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderFormat::Standard => "standard",
            RenderFormat::Background => "background",
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tile Request
// =============================================================================

/// A request for one tile of sky.
///
/// Construction normalizes every field, so a request is always renderable:
/// the center is wrapped/clamped, the angular size is at least
/// [`MIN_ANGULAR_SIZE`], and pixel dimensions lie in `1..=MAX_TILE_PIXELS`.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    /// Tile center
    pub center: SkyCoordinate,

    /// Edge length of the covered patch, in degrees
    pub angular_size: f64,

    /// Output width in pixels; set through [`TileRequest::with_pixels`]
    pub(crate) width: u32,

    /// Output height in pixels
    pub(crate) height: u32,

    /// Source survey
    pub survey: Survey,

    /// Post-processing style
    pub format: RenderFormat,
}

impl TileRequest {
    /// Create a standard-format request at the default tile size.
    pub fn new(center: SkyCoordinate, angular_size: f64, survey: Survey) -> Self {
        Self {
            center,
            angular_size: normalize_angular_size(angular_size),
            width: DEFAULT_TILE_SIZE,
            height: DEFAULT_TILE_SIZE,
            survey,
            format: RenderFormat::Standard,
        }
    }

    /// Set the output pixel dimensions.
    pub fn with_pixels(mut self, width: u32, height: u32) -> Self {
        self.width = width.clamp(1, MAX_TILE_PIXELS);
        self.height = height.clamp(1, MAX_TILE_PIXELS);
        self
    }

    /// Replace the source survey.
    pub fn with_survey(mut self, survey: Survey) -> Self {
        self.survey = survey;
        self
    }

    /// Set the post-processing style.
    pub fn with_format(mut self, format: RenderFormat) -> Self {
        self.format = format;
        self
    }

    /// Output dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

fn normalize_angular_size(size: f64) -> f64 {
    if size.is_finite() && size > MIN_ANGULAR_SIZE {
        size
    } else if size.is_infinite() && size > 0.0 {
        360.0
    } else {
        MIN_ANGULAR_SIZE
    }
}
