//! Two-survey composites.
//!
//! A composite overlays two rendered tiles of the same patch of sky at equal
//! weight. The second layer is resampled to the first layer's size when they
//! differ, and the result is re-encoded as JPEG.

use std::io::Cursor;

use bytes::Bytes;
use image::imageops::{self, FilterType};
use image::{ImageReader, RgbImage};

use crate::error::DecodeError;

use super::enhance::encode_jpeg;

/// Surveys blended when a composite names none.
pub const DEFAULT_COMPOSITE_SURVEYS: [&str; 2] = ["optical", "infrared"];

/// Weight of the second layer.
pub const BLEND_ALPHA: f32 = 0.5;

fn decode_rgb(data: &[u8]) -> Result<RgbImage, DecodeError> {
    let decoded = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| DecodeError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| DecodeError::Decode(e.to_string()))?;
    Ok(decoded.to_rgb8())
}

/// Mix `top` into `base` with weight `alpha`, in place.
///
/// Both buffers must have the same dimensions.
fn mix(base: &mut RgbImage, top: &RgbImage, alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    let base_buf: &mut [u8] = base;
    for (b, &t) in base_buf.iter_mut().zip(top.as_raw().iter()) {
        let value = *b as f32 * (1.0 - alpha) + t as f32 * alpha;
        *b = value.round().clamp(0.0, 255.0) as u8;
    }
}

/// Blend two encoded images into one JPEG.
pub fn blend_layers(base: &[u8], top: &[u8], quality: u8) -> Result<Bytes, DecodeError> {
    let mut base = decode_rgb(base)?;
    let mut top = decode_rgb(top)?;

    if base.dimensions() != top.dimensions() {
        top = imageops::resize(&top, base.width(), base.height(), FilterType::Triangle);
    }

    mix(&mut base, &top, BLEND_ALPHA);
    encode_jpeg(&base, quality)
}
