//! Equatorial sky coordinates.
//!
//! Every constructor normalizes its input: right ascension wraps modulo 360
//! and declination clamps to [-90, 90]. Non-finite values are treated as 0.
//! No operation in this module can fail.

use serde::Serialize;

/// Number of fixed-point steps per degree used for coordinate rounding.
///
/// Three decimal places (about 3.6 arcseconds) is the precision at which two
/// tile requests are considered the same.
pub const MILLIDEGREES_PER_DEGREE: f64 = 1000.0;

/// Full circle in millidegrees, used to wrap rounded right ascension.
const FULL_CIRCLE_MILLI: i64 = 360_000;

/// Wrap a right ascension into [0, 360).
#[inline]
pub fn wrap_ra(ra: f64) -> f64 {
    if !ra.is_finite() {
        return 0.0;
    }
    let wrapped = ra.rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Clamp a declination into [-90, 90].
#[inline]
pub fn clamp_dec(dec: f64) -> f64 {
    if !dec.is_finite() {
        return 0.0;
    }
    dec.clamp(-90.0, 90.0)
}

/// Round a value in degrees to integer millidegrees.
#[inline]
pub fn round_milli(degrees: f64) -> i64 {
    (degrees * MILLIDEGREES_PER_DEGREE).round() as i64
}

/// Format integer millidegrees as a fixed three-decimal string.
///
/// Working from integers keeps "-0.000" from ever appearing.
pub fn format_milli(milli: i64) -> String {
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.unsigned_abs();
    format!("{}{}.{:03}", sign, abs / 1000, abs % 1000)
}

/// An immutable (right ascension, declination) pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SkyCoordinate {
    ra: f64,
    dec: f64,
}

impl SkyCoordinate {
    /// Create a coordinate, wrapping RA and clamping Dec.
    pub fn new(ra: f64, dec: f64) -> Self {
        Self {
            ra: wrap_ra(ra),
            dec: clamp_dec(dec),
        }
    }

    /// Right ascension in degrees, always in [0, 360).
    pub fn ra(&self) -> f64 {
        self.ra
    }

    /// Declination in degrees, always in [-90, 90].
    pub fn dec(&self) -> f64 {
        self.dec
    }

    /// Shift by the given offsets, re-normalizing the result.
    pub fn offset(&self, d_ra: f64, d_dec: f64) -> Self {
        Self::new(self.ra + d_ra, self.dec + d_dec)
    }

    /// Right ascension rounded to millidegrees, wrapped into [0, 360000).
    pub fn ra_milli(&self) -> i64 {
        round_milli(self.ra).rem_euclid(FULL_CIRCLE_MILLI)
    }

    /// Declination rounded to millidegrees, in [-90000, 90000].
    pub fn dec_milli(&self) -> i64 {
        round_milli(self.dec)
    }

    /// This coordinate snapped to the three-decimal grid.
    pub fn rounded(&self) -> Self {
        Self::new(
            self.ra_milli() as f64 / MILLIDEGREES_PER_DEGREE,
            self.dec_milli() as f64 / MILLIDEGREES_PER_DEGREE,
        )
    }

    /// Project onto the unit sphere.
    pub fn to_cartesian(&self) -> Cartesian {
        let ra = self.ra.to_radians();
        let dec = self.dec.to_radians();
        Cartesian {
            x: dec.cos() * ra.cos(),
            y: dec.cos() * ra.sin(),
            z: dec.sin(),
        }
    }

    /// Right ascension as `HHh MMm SS.SSs`.
    pub fn ra_hms(&self) -> String {
        let (h, m, cs) = split_sexagesimal(self.ra / 15.0);
        format!("{:02}h {:02}m {:02}.{:02}s", h % 24, m, cs / 100, cs % 100)
    }

    /// Declination as `±DD° MM' SS.SS"`.
    pub fn dec_dms(&self) -> String {
        let sign = if self.dec >= 0.0 { '+' } else { '-' };
        let (d, m, cs) = split_sexagesimal(self.dec.abs());
        format!("{}{:02}° {:02}' {:02}.{:02}\"", sign, d, m, cs / 100, cs % 100)
    }
}

/// Split a non-negative value into whole units, minutes and hundredths of a
/// second. Rounds before splitting so 59.995s carries into the next minute.
fn split_sexagesimal(value: f64) -> (u64, u64, u64) {
    let total = (value * 360_000.0).round() as u64;
    let units = total / 360_000;
    let minutes = (total % 360_000) / 6_000;
    let centis = total % 6_000;
    (units, minutes, centis)
}

/// A point on the unit sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cartesian {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Cartesian {
    /// Euclidean length of the vector.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Free-function form of [`SkyCoordinate::to_cartesian`].
pub fn to_cartesian(coord: &SkyCoordinate) -> Cartesian {
    coord.to_cartesian()
}
