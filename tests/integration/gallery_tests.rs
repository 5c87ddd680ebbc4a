//! Gallery integration tests.
//!
//! Tests verify:
//! - One thumbnail per available survey, grouped by category
//! - Surveys that cannot be fetched are omitted
//! - Flagship imagery is appended for exact object names only

use sky_streamer::coords::SkyCoordinate;
use sky_streamer::gallery::{
    Category, FlagshipTable, GalleryService, GallerySource, SurveyCatalog, THUMBNAIL_PIXELS,
};
use sky_streamer::tile::{Provenance, TileService};

use super::test_utils::{memory_only_config, MockFetcher, SurveyFilterFetcher};

fn orion() -> SkyCoordinate {
    SkyCoordinate::new(83.822, -5.391)
}

#[tokio::test]
async fn test_orion_gallery_includes_space_telescope_items() {
    let fetcher = MockFetcher::serving_images();
    let tiles = TileService::new(fetcher.clone(), &memory_only_config());
    let gallery = GalleryService::with_defaults(tiles);

    let items = gallery.build_gallery("Orion Nebula", orion()).await;

    let catalog = SurveyCatalog::default();
    assert_eq!(items.len(), catalog.len() + 2);
    assert_eq!(fetcher.fetch_count(), catalog.len());

    let flagships: Vec<_> = items
        .iter()
        .filter(|item| item.category == Category::SpaceTelescope)
        .collect();
    assert_eq!(flagships.len(), 2);
    assert_eq!(flagships[0].telescope, "HST");
    assert_eq!(flagships[1].telescope, "JWST");
    assert_eq!(flagships[0].size, "Variable FOV");
    assert!(matches!(flagships[0].source, GallerySource::External { .. }));
}

#[tokio::test]
async fn test_gallery_items_grouped_by_category() {
    let tiles = TileService::new(MockFetcher::serving_images(), &memory_only_config());
    let gallery = GalleryService::with_defaults(tiles);

    let items = gallery.build_gallery("Crab Nebula", SkyCoordinate::new(83.633, 22.014)).await;

    let categories: Vec<_> = items.iter().map(|item| item.category).collect();
    let mut sorted = categories.clone();
    sorted.sort();
    assert_eq!(categories, sorted);

    assert_eq!(items[0].survey, "DSS2 Red");
    assert_eq!(items[0].coordinates, "RA: 83.633°, Dec: 22.014°");
    assert_eq!(items[0].size, "0.5° × 0.5°");
}

#[tokio::test]
async fn test_gallery_thumbnails_are_rendered_tiles() {
    let fetcher = MockFetcher::serving_images();
    let tiles = TileService::new(fetcher.clone(), &memory_only_config());
    let gallery = GalleryService::with_defaults(tiles);

    let items = gallery.build_gallery("M31", SkyCoordinate::new(10.685, 41.269)).await;

    for item in &items {
        match &item.source {
            GallerySource::Tile { request, image } => {
                assert_eq!(request.dimensions(), (THUMBNAIL_PIXELS, THUMBNAIL_PIXELS));
                assert_eq!(image.provenance(), Provenance::Enhanced);
            }
            GallerySource::External { .. } => panic!("M31 has no flagship entries"),
        }
    }

    // Thumbnails land in the shared tile cache
    let again = gallery.build_gallery("M31", SkyCoordinate::new(10.685, 41.269)).await;
    assert_eq!(again.len(), items.len());
    assert_eq!(fetcher.fetch_count(), SurveyCatalog::default().len());
}

#[tokio::test]
async fn test_unavailable_surveys_are_omitted() {
    let fetcher = SurveyFilterFetcher::new(vec!["RASS", "FIRST"]);
    let tiles = TileService::new(fetcher.clone(), &memory_only_config());
    let gallery = GalleryService::new(tiles, SurveyCatalog::default(), FlagshipTable::empty());

    let items = gallery.build_gallery("Orion Nebula", orion()).await;

    assert_eq!(items.len(), SurveyCatalog::default().len() - 2);
    assert!(items.iter().all(|item| item.survey != "RASS" && item.survey != "FIRST"));
    assert!(items.iter().all(|item| item.category != Category::Xray));
    assert_eq!(fetcher.fetch_count(), SurveyCatalog::default().len());
}

#[tokio::test]
async fn test_flagship_lookup_is_exact() {
    let tiles = TileService::new(MockFetcher::timing_out(), &memory_only_config());
    let gallery = GalleryService::with_defaults(tiles);

    // Every survey fails, so only flagship items remain
    let exact = gallery.build_gallery("Orion Nebula", orion()).await;
    assert_eq!(exact.len(), 2);

    let lowercase = gallery.build_gallery("orion nebula", orion()).await;
    assert!(lowercase.is_empty());
}
