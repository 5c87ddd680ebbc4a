//! Static gallery tables: the survey catalog and flagship imagery.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tile::Survey;

/// Gallery grouping, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Optical,
    Infrared,
    Xray,
    Radio,
    SpaceTelescope,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Optical => "optical",
            Category::Infrared => "infrared",
            Category::Xray => "xray",
            Category::Radio => "radio",
            Category::SpaceTelescope => "space_telescope",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Survey Catalog
// =============================================================================

/// One survey shown in the gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveySpec {
    pub category: Category,
    pub survey: Survey,
    pub wavelength: String,
    pub telescope: String,
    pub description: String,
}

impl SurveySpec {
    pub fn new(
        category: Category,
        survey: &str,
        wavelength: &str,
        telescope: &str,
        description: &str,
    ) -> Self {
        Self {
            category,
            survey: Survey::new(survey),
            wavelength: wavelength.to_string(),
            telescope: telescope.to_string(),
            description: description.to_string(),
        }
    }
}

const DEFAULT_SURVEYS: &[(Category, &str, &str, &str, &str)] = &[
    (Category::Optical, "DSS2 Red", "650nm", "Palomar/UK Schmidt", "Red optical light"),
    (Category::Optical, "DSS2 Blue", "450nm", "Palomar/UK Schmidt", "Blue optical light"),
    (Category::Optical, "SDSS DR7", "550nm", "Sloan Digital Sky Survey", "Digital sky survey"),
    (Category::Infrared, "2MASS-J", "1.25μm", "2MASS", "Near-infrared J-band"),
    (Category::Infrared, "2MASS-H", "1.65μm", "2MASS", "Near-infrared H-band"),
    (Category::Infrared, "2MASS-K", "2.17μm", "2MASS", "Near-infrared K-band"),
    (Category::Infrared, "WISE 3.4", "3.4μm", "WISE", "Mid-infrared W1"),
    (Category::Infrared, "WISE 4.6", "4.6μm", "WISE", "Mid-infrared W2"),
    (Category::Xray, "RASS", "0.1-2.4keV", "ROSAT", "Soft X-ray all-sky survey"),
    (Category::Radio, "NVSS", "20cm", "VLA", "Radio continuum survey"),
    (Category::Radio, "FIRST", "20cm", "VLA", "High-resolution radio survey"),
];

/// Ordered list of gallery surveys.
///
/// Declaration order is display order within a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyCatalog {
    entries: Vec<SurveySpec>,
}

impl SurveyCatalog {
    pub fn new(entries: Vec<SurveySpec>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SurveySpec] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one category, in declaration order.
    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &SurveySpec> {
        self.entries.iter().filter(move |e| e.category == category)
    }
}

impl Default for SurveyCatalog {
    fn default() -> Self {
        Self::new(
            DEFAULT_SURVEYS
                .iter()
                .map(|&(category, survey, wavelength, telescope, description)| {
                    SurveySpec::new(category, survey, wavelength, telescope, description)
                })
                .collect(),
        )
    }
}

// =============================================================================
// Flagship Imagery
// =============================================================================

/// A curated space-telescope image for a named object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagshipImage {
    /// Exact object name this image belongs to
    pub object_name: String,

    /// Source label, e.g. "Hubble Space Telescope"
    pub source: String,

    pub url: String,
    pub wavelength: String,
    pub telescope: String,
    pub description: String,

    /// Publication date, `YYYY-MM-DD`
    pub date: String,

    /// Resolution label shown in place of coordinates
    pub resolution: String,

    /// Filters or instrument used
    pub notes: String,
}

struct Mission {
    source: &'static str,
    wavelength: &'static str,
    telescope: &'static str,
    resolution: &'static str,
    notes_label: &'static str,
}

const HUBBLE: Mission = Mission {
    source: "Hubble Space Telescope",
    wavelength: "Visible",
    telescope: "HST",
    resolution: "High resolution",
    notes_label: "Filters",
};

const JWST: Mission = Mission {
    source: "James Webb Space Telescope",
    wavelength: "Infrared",
    telescope: "JWST",
    resolution: "Ultra high resolution",
    notes_label: "Instrument",
};

// (mission, object, url, description, date, filters or instrument)
const DEFAULT_FLAGSHIPS: &[(&Mission, &str, &str, &str, &str, &str)] = &[
    (
        &HUBBLE,
        "Orion Nebula",
        "https://hubblesite.org/files/live/sites/hubble/files/home/hubble-30th-anniversary/images/hubble_30th_orion_nebula.jpg",
        "Hubble visible light composite",
        "2020-04-24",
        "F658N, F502N, F475W",
    ),
    (
        &HUBBLE,
        "Crab Nebula",
        "https://hubblesite.org/files/live/sites/hubble/files/home/science/astronomy/stars-and-nebulas/_images/crab-nebula-mosaic.jpg",
        "Hubble optical mosaic",
        "2019-07-04",
        "F555W, F814W",
    ),
    (
        &HUBBLE,
        "Andromeda Galaxy",
        "https://hubblesite.org/files/live/sites/hubble/files/home/science/astronomy/galaxies/_images/andromeda-galaxy-m31.jpg",
        "Hubble high-resolution view",
        "2015-01-05",
        "F475W, F814W, F160W",
    ),
    (
        &JWST,
        "Orion Nebula",
        "https://webbtelescope.org/files/live/sites/webb/files/home/webb-science/early-release-observations/_images/orion-nebula-nircam.jpg",
        "JWST near-infrared view",
        "2022-09-12",
        "NIRCam",
    ),
    (
        &JWST,
        "Crab Nebula",
        "https://webbtelescope.org/files/live/sites/webb/files/home/webb-science/_images/crab-nebula-miri.jpg",
        "JWST mid-infrared view",
        "2023-07-10",
        "MIRI",
    ),
];

/// Read-only lookup of flagship images by exact object name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagshipTable {
    entries: Vec<FlagshipImage>,
}

impl FlagshipTable {
    pub fn new(entries: Vec<FlagshipImage>) -> Self {
        Self { entries }
    }

    /// A table with no entries.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Images for `object_name`, in table order. Matching is exact.
    pub fn lookup<'a>(&'a self, object_name: &'a str) -> impl Iterator<Item = &'a FlagshipImage> {
        self.entries
            .iter()
            .filter(move |e| e.object_name == object_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FlagshipTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_FLAGSHIPS
                .iter()
                .map(|&(mission, object, url, description, date, notes)| FlagshipImage {
                    object_name: object.to_string(),
                    source: mission.source.to_string(),
                    url: url.to_string(),
                    wavelength: mission.wavelength.to_string(),
                    telescope: mission.telescope.to_string(),
                    description: description.to_string(),
                    date: date.to_string(),
                    resolution: mission.resolution.to_string(),
                    notes: format!("{}: {}", mission.notes_label, notes),
                })
                .collect(),
        )
    }
}
