//! Multi-wavelength image galleries.
//!
//! A gallery shows one object through every survey in a [`SurveyCatalog`],
//! rendered through the shared tile pipeline, plus any curated
//! [`FlagshipTable`] images for the object's exact name. Single telescope
//! views of a target go through the same pipeline.

mod catalog;
mod service;
mod telescope;

pub use catalog::{Category, FlagshipImage, FlagshipTable, SurveyCatalog, SurveySpec};
pub use service::{
    GalleryItem, GalleryService, GallerySource, ObjectMetadata, THUMBNAIL_PIXELS, THUMBNAIL_SIZE,
};
pub use telescope::{
    known_telescopes, telescope_band, telescope_request, telescope_survey,
    DEFAULT_TELESCOPE_BAND, TELESCOPE_VIEW_PIXELS, TELESCOPE_VIEW_SIZE,
};
