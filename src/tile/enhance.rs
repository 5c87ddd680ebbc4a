//! Post-processing for fetched tiles.
//!
//! Survey imagery arrives with wildly different dynamic ranges. Every tile is
//! decoded and pushed through the same deterministic pipeline before it is
//! cached:
//!
//! 1. Per-channel min-max contrast stretch
//! 2. Gamma correction (exponent 0.7) to lift faint signal
//! 3. Background format only: Lanczos resize to the requested pixel size,
//!    darken to 60% brightness, Gaussian blur (sigma 0.5)
//! 4. Re-encode as JPEG at the format's quality
//!
//! A payload that cannot be decoded or re-encoded is passed through untouched
//! with [`Provenance::Remote`].

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageReader, RgbImage};
use tracing::warn;

use crate::error::DecodeError;
use crate::fetch::RawTile;

use super::image::{Provenance, TileImage};
use super::request::{RenderFormat, TileRequest};

/// JPEG quality for standard tiles.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// JPEG quality for background tiles.
pub const DEFAULT_BACKGROUND_QUALITY: u8 = 75;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Gamma exponent applied after the contrast stretch.
pub const GAMMA: f32 = 0.7;

/// Brightness multiplier for background tiles.
pub const BACKGROUND_DARKEN: f32 = 0.6;

/// Blur sigma for background tiles.
pub const BACKGROUND_BLUR_SIGMA: f32 = 0.5;

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

/// Deterministic tile enhancer.
///
/// Stateless apart from its quality settings, so one instance is shared by
/// every blocking worker.
#[derive(Debug, Clone, Copy)]
pub struct ImageEnhancer {
    standard_quality: u8,
    background_quality: u8,
}

impl Default for ImageEnhancer {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY, DEFAULT_BACKGROUND_QUALITY)
    }
}

impl ImageEnhancer {
    pub fn new(standard_quality: u8, background_quality: u8) -> Self {
        Self {
            standard_quality: clamp_quality(standard_quality),
            background_quality: clamp_quality(background_quality),
        }
    }

    pub fn quality_for(&self, format: RenderFormat) -> u8 {
        match format {
            RenderFormat::Standard => self.standard_quality,
            RenderFormat::Background => self.background_quality,
        }
    }

    /// Enhance a fetched tile, degrading to the raw bytes on failure.
    pub fn enhance(&self, raw: &RawTile, request: &TileRequest) -> TileImage {
        match self.try_enhance(&raw.data, request.format, request.dimensions()) {
            Ok(data) => TileImage::jpeg(data, Provenance::Enhanced),
            Err(e) => {
                warn!(
                    survey = %request.survey,
                    ra = request.center.ra(),
                    dec = request.center.dec(),
                    error = %e,
                    "Enhancement failed; serving fetched bytes unmodified"
                );
                TileImage::new(raw.data.clone(), raw.content_type.as_str(), Provenance::Remote)
            }
        }
    }

    /// Run the pipeline, surfacing decode and encode errors.
    pub fn try_enhance(
        &self,
        source: &[u8],
        format: RenderFormat,
        (width, height): (u32, u32),
    ) -> Result<Bytes, DecodeError> {
        let decoded = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| DecodeError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| DecodeError::Decode(e.to_string()))?;

        let mut pixels = decoded.to_rgb8();
        stretch_and_gamma(&mut pixels, GAMMA);

        if format == RenderFormat::Background {
            if width == 0 || height == 0 {
                return Err(DecodeError::Encode(format!(
                    "empty canvas {}x{}",
                    width, height
                )));
            }
            pixels = imageops::resize(&pixels, width, height, FilterType::Lanczos3);
            darken(&mut pixels, BACKGROUND_DARKEN);
            pixels = imageops::blur(&pixels, BACKGROUND_BLUR_SIGMA);
        }

        encode_jpeg(&pixels, self.quality_for(format))
    }
}

/// Encode an RGB buffer as JPEG.
pub fn encode_jpeg(pixels: &RgbImage, quality: u8) -> Result<Bytes, DecodeError> {
    let mut output = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut output, clamp_quality(quality));
    encoder
        .encode(
            pixels.as_raw(),
            pixels.width(),
            pixels.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| DecodeError::Encode(e.to_string()))?;
    Ok(Bytes::from(output))
}

/// Stretch each channel to the full 0..=255 range, then apply `gamma`.
///
/// A flat channel (max == min) is left as is.
fn stretch_and_gamma(pixels: &mut RgbImage, gamma: f32) {
    let buf: &mut [u8] = pixels;
    for channel in 0..3 {
        let (lo, hi) = buf
            .iter()
            .skip(channel)
            .step_by(3)
            .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if hi <= lo {
            continue;
        }

        let range = (hi - lo) as f32;
        let mut lut = [0u8; 256];
        for (v, out) in lut.iter_mut().enumerate() {
            let normalized = ((v as f32 - lo as f32) / range).clamp(0.0, 1.0);
            *out = (normalized.powf(gamma) * 255.0) as u8;
        }

        for v in buf.iter_mut().skip(channel).step_by(3) {
            *v = lut[*v as usize];
        }
    }
}

fn darken(pixels: &mut RgbImage, factor: f32) {
    let buf: &mut [u8] = pixels;
    for v in buf.iter_mut() {
        *v = (*v as f32 * factor) as u8;
    }
}
