//! Seeded starfield synthesis.
//!
//! Used whenever the imaging service cannot produce a tile. The generator
//! performs no I/O and is seeded purely from the rounded tile center, so the
//! same coordinate always yields byte-identical output across runs and
//! processes. Two racing fallbacks for one key therefore write the same bytes.
//!
//! Recipe, on a 256px reference tile:
//!
//! - `#0a0a0a` canvas
//! - 20..50 grey stars, brightness 30..120, radius mostly 1px
//! - 30% chance of one flat nebula disc in purple, orange or blue
//! - Gaussian blur (sigma 1.0), JPEG at a low quality
//!
//! Star count scales with pixel area for other tile sizes.

use image::{imageops, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::error;

use crate::coords::SkyCoordinate;
use crate::error::DecodeError;

use super::enhance::{clamp_quality, encode_jpeg};
use super::image::{Provenance, TileImage};
use super::request::{TileRequest, DEFAULT_TILE_SIZE};

/// JPEG quality for synthesized tiles.
pub const DEFAULT_PROCEDURAL_QUALITY: u8 = 70;

const BACKGROUND: Rgb<u8> = Rgb([10, 10, 10]);
const STAR_SIZES: [u32; 6] = [1, 1, 1, 2, 2, 3];
const NEBULA_CHANCE: f64 = 0.3;
const NEBULA_PALETTE: [Rgb<u8>; 3] = [Rgb([20, 10, 30]), Rgb([30, 20, 10]), Rgb([10, 20, 30])];
const BLUR_SIGMA: f32 = 1.0;

/// Derive the RNG seed from a tile center.
///
/// Rounded RA occupies the high bits and offset Dec the low 20, so distinct
/// rounded coordinates never share a seed.
pub fn seed_for(center: &SkyCoordinate) -> u64 {
    let ra = center.ra_milli() as u64;
    let dec = (center.dec_milli() + 90_000) as u64;
    (ra << 20) | dec
}

/// Procedural tile generator.
#[derive(Debug, Clone, Copy)]
pub struct ProceduralGenerator {
    quality: u8,
}

impl Default for ProceduralGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_PROCEDURAL_QUALITY)
    }
}

impl ProceduralGenerator {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: clamp_quality(quality),
        }
    }

    /// Synthesize a tile for a request. Never fails.
    ///
    /// Falls back to [`TileImage::placeholder`] if encoding fails.
    pub fn synthesize(&self, request: &TileRequest) -> TileImage {
        match self.try_synthesize(&request.center, request.dimensions()) {
            Ok(image) => image,
            Err(e) => {
                error!(
                    ra = request.center.ra(),
                    dec = request.center.dec(),
                    error = %e,
                    "Procedural synthesis failed; serving placeholder"
                );
                TileImage::placeholder()
            }
        }
    }

    /// Synthesize a tile, surfacing encode errors.
    ///
    /// A zero-sized canvas is an error rather than a panic.
    pub fn try_synthesize(
        &self,
        center: &SkyCoordinate,
        (width, height): (u32, u32),
    ) -> Result<TileImage, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::Encode(format!(
                "empty canvas {}x{}",
                width, height
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed_for(center));
        let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);

        let area_scale =
            (width as f64 * height as f64) / (DEFAULT_TILE_SIZE as f64 * DEFAULT_TILE_SIZE as f64);
        let base_count: u32 = rng.random_range(20..50);
        let star_count = ((base_count as f64 * area_scale).round() as u32).max(1);

        for _ in 0..star_count {
            let x = rng.random_range(0..width) as i64;
            let y = rng.random_range(0..height) as i64;
            let brightness: u8 = rng.random_range(30..120);
            let size = STAR_SIZES[rng.random_range(0..STAR_SIZES.len())];

            let color = Rgb([brightness, brightness, brightness]);
            fill_disc(&mut canvas, x, y, (size / 2) as i64, color);
        }

        if rng.random_bool(NEBULA_CHANCE) {
            let x = rng.random_range(0..width) as i64;
            let y = rng.random_range(0..height) as i64;
            let size: i64 = rng.random_range(20..60);
            let color = NEBULA_PALETTE[rng.random_range(0..NEBULA_PALETTE.len())];
            fill_disc(&mut canvas, x, y, size / 2, color);
        }

        let blurred = imageops::blur(&canvas, BLUR_SIGMA);
        let data = encode_jpeg(&blurred, self.quality)?;
        Ok(TileImage::jpeg(data, Provenance::Procedural))
    }
}

/// Fill a disc of `radius` pixels centered on `(cx, cy)`, clipped to the canvas.
fn fill_disc(canvas: &mut RgbImage, cx: i64, cy: i64, radius: i64, color: Rgb<u8>) {
    let (width, height) = (canvas.width() as i64, canvas.height() as i64);
    let limit = radius * radius + radius;

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > limit {
                continue;
            }
            let (x, y) = (cx + dx, cy + dy);
            if (0..width).contains(&x) && (0..height).contains(&y) {
                canvas.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}
