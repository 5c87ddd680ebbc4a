//! Multi-survey gallery builder.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::coords::SkyCoordinate;
use crate::fetch::TileFetcher;
use crate::tile::{Provenance, TileImage, TileRequest, TileResponse, TileService};

use super::catalog::{Category, FlagshipTable, SurveyCatalog};
use super::telescope::telescope_request;

/// Angular size of gallery thumbnails, in degrees.
pub const THUMBNAIL_SIZE: f64 = 0.5;

/// Pixel edge of gallery thumbnails.
pub const THUMBNAIL_PIXELS: u32 = 400;

/// Where a gallery item's image lives.
#[derive(Debug, Clone)]
pub enum GallerySource {
    /// Rendered through the tile pipeline
    Tile {
        request: TileRequest,
        image: TileImage,
    },

    /// Hosted elsewhere; never fetched or cached here
    External { url: String },
}

/// One image in a gallery.
#[derive(Debug, Clone)]
pub struct GalleryItem {
    pub category: Category,
    pub survey: String,
    pub source: GallerySource,
    pub wavelength: String,
    pub telescope: String,
    pub description: String,

    /// RFC 3339 render time for survey tiles, publication date for flagships
    pub timestamp: String,

    /// Position label, e.g. `RA: 83.822°, Dec: -5.391°`
    pub coordinates: String,

    /// Footprint label, e.g. `0.5° × 0.5°`
    pub size: String,

    /// Filters or instrument, for flagship images
    pub notes: Option<String>,
}

/// Descriptive metadata for a gallery subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectMetadata {
    pub object_name: String,
    pub ra: f64,
    pub dec: f64,
    pub ra_hms: String,
    pub dec_dms: String,
    pub coordinate_system: &'static str,
    pub data_sources: Vec<&'static str>,
    pub last_updated: String,
}

impl ObjectMetadata {
    pub fn new(object_name: &str, coord: &SkyCoordinate) -> Self {
        Self {
            object_name: object_name.to_string(),
            ra: coord.ra(),
            dec: coord.dec(),
            ra_hms: coord.ra_hms(),
            dec_dms: coord.dec_dms(),
            coordinate_system: "J2000.0",
            data_sources: vec!["NASA SkyView", "Hubble Archive", "JWST Archive"],
            last_updated: now_rfc3339(),
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Builds galleries by fanning one object out over every catalog survey.
pub struct GalleryService<F> {
    tiles: TileService<F>,
    catalog: Arc<SurveyCatalog>,
    flagships: Arc<FlagshipTable>,
}

impl<F: TileFetcher + 'static> GalleryService<F> {
    pub fn new(tiles: TileService<F>, catalog: SurveyCatalog, flagships: FlagshipTable) -> Self {
        Self {
            tiles,
            catalog: Arc::new(catalog),
            flagships: Arc::new(flagships),
        }
    }

    /// Gallery over the built-in survey catalog and flagship table.
    pub fn with_defaults(tiles: TileService<F>) -> Self {
        Self::new(tiles, SurveyCatalog::default(), FlagshipTable::default())
    }

    pub fn catalog(&self) -> &SurveyCatalog {
        &self.catalog
    }

    pub fn flagships(&self) -> &FlagshipTable {
        &self.flagships
    }

    /// Build the gallery for an object.
    ///
    /// Survey thumbnails render concurrently. A survey whose tile could not
    /// be fetched (procedural result) is left out. Items are grouped by
    /// category, in catalog order within a category, followed by any
    /// flagship images matching `object_name` exactly.
    pub async fn build_gallery(&self, object_name: &str, coord: SkyCoordinate) -> Vec<GalleryItem> {
        let handles: Vec<_> = self
            .catalog
            .entries()
            .iter()
            .map(|spec| {
                let request = TileRequest::new(coord, THUMBNAIL_SIZE, spec.survey.clone())
                    .with_pixels(THUMBNAIL_PIXELS, THUMBNAIL_PIXELS);
                let tiles = self.tiles.clone();
                tokio::spawn(async move {
                    let response = tiles.render_tile(request.clone()).await;
                    (request, response.image)
                })
            })
            .collect();

        let timestamp = now_rfc3339();
        let coordinates = format!("RA: {:.3}°, Dec: {:.3}°", coord.ra(), coord.dec());
        let size = format!("{}° × {}°", THUMBNAIL_SIZE, THUMBNAIL_SIZE);

        let mut items = Vec::with_capacity(handles.len());
        for (spec, handle) in self.catalog.entries().iter().zip(handles) {
            let (request, image) = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(survey = %spec.survey, error = %e, "Gallery thumbnail task failed");
                    continue;
                }
            };

            if image.provenance() == Provenance::Procedural {
                debug!(
                    survey = %spec.survey,
                    object = object_name,
                    "Survey unavailable at this position; omitting from gallery"
                );
                continue;
            }

            items.push(GalleryItem {
                category: spec.category,
                survey: spec.survey.name().to_string(),
                source: GallerySource::Tile { request, image },
                wavelength: spec.wavelength.clone(),
                telescope: spec.telescope.clone(),
                description: spec.description.clone(),
                timestamp: timestamp.clone(),
                coordinates: coordinates.clone(),
                size: size.clone(),
                notes: None,
            });
        }

        // Stable: keeps catalog order within each category
        items.sort_by_key(|item| item.category);

        items.extend(self.flagships.lookup(object_name).map(|flagship| GalleryItem {
            category: Category::SpaceTelescope,
            survey: flagship.source.clone(),
            source: GallerySource::External {
                url: flagship.url.clone(),
            },
            wavelength: flagship.wavelength.clone(),
            telescope: flagship.telescope.clone(),
            description: flagship.description.clone(),
            timestamp: flagship.date.clone(),
            coordinates: flagship.resolution.clone(),
            size: "Variable FOV".to_string(),
            notes: Some(flagship.notes.clone()),
        }));

        items
    }

    /// Render how `telescope` would see `target`.
    ///
    /// Unknown telescopes fall back to the optical survey.
    pub async fn telescope_view(&self, telescope: &str, target: SkyCoordinate) -> TileResponse {
        let request = telescope_request(telescope, target);
        debug!(telescope, survey = %request.survey, "Rendering telescope view");
        self.tiles.render_tile(request).await
    }

    /// Metadata block for an object.
    pub fn metadata(&self, object_name: &str, coord: &SkyCoordinate) -> ObjectMetadata {
        ObjectMetadata::new(object_name, coord)
    }

    pub fn tiles(&self) -> &TileService<F> {
        &self.tiles
    }
}
