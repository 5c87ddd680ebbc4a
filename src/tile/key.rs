//! Cache keys for rendered tiles.
//!
//! A [`TileKey`] is built from the request fields rounded to three decimal
//! degrees, so near-identical pan/zoom requests share a cache entry:
//!
//! - Survey name
//! - Render format
//! - Center RA and Dec (millidegrees)
//! - Angular size (millidegrees)
//!
//! Pixel dimensions are not part of the key.
//!
//! The key doubles as the persistent-tier file stem through
//! [`TileKey::fingerprint`], a SHA-256 of the canonical string.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::coords::{format_milli, round_milli};

use super::request::{RenderFormat, Survey, TileRequest};

/// Cache key for a rendered tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    survey: Survey,
    format: RenderFormat,
    ra_milli: i64,
    dec_milli: i64,
    size_milli: i64,
}

impl TileKey {
    /// Derive the key for a request.
    pub fn from_request(request: &TileRequest) -> Self {
        Self {
            survey: request.survey.clone(),
            format: request.format,
            ra_milli: request.center.ra_milli(),
            dec_milli: request.center.dec_milli(),
            size_milli: round_milli(request.angular_size).max(1),
        }
    }

    pub fn survey(&self) -> &Survey {
        &self.survey
    }

    pub fn format(&self) -> RenderFormat {
        self.format
    }

    /// Rounded RA in degrees.
    pub fn ra(&self) -> f64 {
        self.ra_milli as f64 / 1000.0
    }

    /// Rounded Dec in degrees.
    pub fn dec(&self) -> f64 {
        self.dec_milli as f64 / 1000.0
    }

    /// Rounded angular size in degrees.
    pub fn size(&self) -> f64 {
        self.size_milli as f64 / 1000.0
    }

    /// Human-readable composite form, e.g. `DSS2 Red|standard|10.685|41.269|0.500`.
    pub fn canonical(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.survey,
            self.format,
            format_milli(self.ra_milli),
            format_milli(self.dec_milli),
            format_milli(self.size_milli)
        )
    }

    /// Hex SHA-256 of the canonical form, used as the on-disk file stem.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.canonical().as_bytes());
        hex::encode(digest)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}
