//! Simulated telescope views.
//!
//! A telescope view is a narrow tile of a target, drawn from the survey whose
//! band best matches the instrument. Unknown instruments get the optical
//! survey.

use crate::coords::SkyCoordinate;
use crate::tile::{Survey, TileRequest};

/// Angular size of a telescope view, in degrees.
pub const TELESCOPE_VIEW_SIZE: f64 = 0.3;

/// Pixel edge of a telescope view.
pub const TELESCOPE_VIEW_PIXELS: u32 = 300;

/// Band used for instruments missing from the table.
pub const DEFAULT_TELESCOPE_BAND: &str = "optical";

/// Full name, short names, wavelength alias.
const TELESCOPE_BANDS: &[(&str, &[&str], &str)] = &[
    ("Hubble Space Telescope", &["Hubble", "HST"], "optical"),
    ("James Webb Space Telescope", &["JWST", "Webb"], "infrared"),
    ("Chandra X-ray Observatory", &["Chandra"], "xray"),
    ("Spitzer Space Telescope", &["Spitzer"], "infrared"),
    ("Fermi Gamma-ray Space Telescope", &["Fermi"], "gamma"),
];

/// Wavelength alias for a telescope, matched case-insensitively on the full
/// or short name.
pub fn telescope_band(telescope: &str) -> &'static str {
    let name = telescope.trim();
    TELESCOPE_BANDS
        .iter()
        .find(|(full, short, _)| {
            full.eq_ignore_ascii_case(name) || short.iter().any(|s| s.eq_ignore_ascii_case(name))
        })
        .map(|&(_, _, band)| band)
        .unwrap_or(DEFAULT_TELESCOPE_BAND)
}

/// Survey a telescope view is drawn from.
pub fn telescope_survey(telescope: &str) -> Survey {
    Survey::resolve(telescope_band(telescope))
}

/// Tile request for a telescope's view of `target`.
pub fn telescope_request(telescope: &str, target: SkyCoordinate) -> TileRequest {
    TileRequest::new(target, TELESCOPE_VIEW_SIZE, telescope_survey(telescope))
        .with_pixels(TELESCOPE_VIEW_PIXELS, TELESCOPE_VIEW_PIXELS)
}

/// Full names of every known telescope.
pub fn known_telescopes() -> impl Iterator<Item = &'static str> {
    TELESCOPE_BANDS.iter().map(|&(full, _, _)| full)
}
