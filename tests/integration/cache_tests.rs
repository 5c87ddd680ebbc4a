//! Pipeline and cache integration tests.
//!
//! Tests verify:
//! - Concurrent identical requests trigger exactly one fetch
//! - Failed fetches degrade to cached procedural tiles
//! - Near-identical requests share a cache entry
//! - The disk tier survives a service restart

use std::sync::Arc;
use std::time::Duration;

use sky_streamer::coords::SkyCoordinate;
use sky_streamer::error::FetchError;
use sky_streamer::tile::{
    CacheTier, Provenance, RenderFormat, Survey, TileKey, TileRequest, TileService,
};

use super::test_utils::{
    disk_config, is_valid_jpeg, jpeg_dimensions, memory_only_config, MockFetcher, TestDir,
};

fn dss2_request(ra: f64, dec: f64) -> TileRequest {
    TileRequest::new(SkyCoordinate::new(ra, dec), 0.5, Survey::new("DSS2 Red"))
        .with_pixels(128, 128)
}

// =============================================================================
// Single-Flight Fetching
// =============================================================================

#[tokio::test]
async fn test_concurrent_identical_requests_fetch_once() {
    let fetcher = MockFetcher::serving_images().with_delay(Duration::from_millis(100));
    let service = TileService::new(fetcher.clone(), &memory_only_config());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.render_tile(dss2_request(10.685, 41.269)).await })
        })
        .collect();

    let mut bodies = Vec::new();
    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(response.image.provenance(), Provenance::Enhanced);
        bodies.push(response.image.data().clone());
    }

    assert_eq!(fetcher.fetch_count(), 1);
    assert!(bodies.windows(2).all(|w| w[0] == w[1]));

    // The render task clears its in-flight entry just after waking waiters
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(service.in_flight(), 0);
}

#[tokio::test]
async fn test_distinct_tiles_fetch_independently() {
    let fetcher = MockFetcher::serving_images().with_delay(Duration::from_millis(20));
    let service = TileService::new(fetcher.clone(), &memory_only_config());

    let a = service.render_tile(dss2_request(10.0, 10.0));
    let b = service.render_tile(dss2_request(20.0, 10.0));
    let (a, b) = tokio::join!(a, b);

    assert_ne!(a.key, b.key);
    assert_eq!(fetcher.fetch_count(), 2);
}

#[tokio::test]
async fn test_abandoned_request_still_populates_cache() {
    let fetcher = MockFetcher::serving_images().with_delay(Duration::from_millis(50));
    let service = TileService::new(fetcher.clone(), &memory_only_config());
    let request = dss2_request(150.0, 2.0);
    let key = TileKey::from_request(&request);

    let abandoned = tokio::time::timeout(
        Duration::from_millis(5),
        service.render_tile(request.clone()),
    )
    .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(service.store().memory().contains(&key).await);

    let response = service.render_tile(request).await;
    assert!(response.cache_hit);
    assert_eq!(fetcher.fetch_count(), 1);
}

// =============================================================================
// Caching
// =============================================================================

#[tokio::test]
async fn test_dss2_red_scenario() {
    let fetcher = MockFetcher::serving_images();
    let service = TileService::new(fetcher.clone(), &memory_only_config());

    let first = service.render_tile(dss2_request(10.685, 41.269)).await;
    assert!(!first.cache_hit);
    assert_eq!(first.image.content_type(), "image/jpeg");
    assert!(is_valid_jpeg(first.image.data()));
    assert_eq!(jpeg_dimensions(first.image.data()), (128, 128));
    assert_eq!(first.key.canonical(), "DSS2 Red|standard|10.685|41.269|0.500");

    let second = service.render_tile(dss2_request(10.685, 41.269)).await;
    assert!(second.cache_hit);
    assert_eq!(second.image.data(), first.image.data());
    assert_eq!(fetcher.fetch_count(), 1);

    let requested = fetcher.requests();
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].survey.name(), "DSS2 Red");

    let stats = service.stats().snapshot();
    assert_eq!(stats.remote_fetches, 1);
    assert_eq!(stats.misses, 1);
    assert!(stats.memory_hits >= 1);
}

#[tokio::test]
async fn test_rounding_shares_cache_entry() {
    let fetcher = MockFetcher::serving_images();
    let service = TileService::new(fetcher.clone(), &memory_only_config());

    service.render_tile(dss2_request(10.6851, 41.2689)).await;
    let response = service.render_tile(dss2_request(10.6849, 41.2691)).await;

    assert!(response.cache_hit);
    assert_eq!(fetcher.fetch_count(), 1);
}

#[tokio::test]
async fn test_out_of_range_coordinates_normalize() {
    let fetcher = MockFetcher::serving_images();
    let service = TileService::new(fetcher.clone(), &memory_only_config());

    let pole = service.render_tile(dss2_request(10.0, 90.0)).await;
    let beyond = service.render_tile(dss2_request(370.0, 95.0)).await;

    assert_eq!(pole.key, beyond.key);
    assert!(beyond.cache_hit);
    assert_eq!(fetcher.fetch_count(), 1);
}

#[tokio::test]
async fn test_pixel_size_is_not_part_of_key() {
    let fetcher = MockFetcher::serving_images();
    let service = TileService::new(fetcher.clone(), &memory_only_config());

    service.render_tile(dss2_request(30.0, 30.0)).await;
    let larger = service
        .render_tile(dss2_request(30.0, 30.0).with_pixels(512, 512))
        .await;

    assert!(larger.cache_hit);
    assert_eq!(fetcher.fetch_count(), 1);
}

#[tokio::test]
async fn test_format_is_part_of_key() {
    let fetcher = MockFetcher::serving_images();
    let service = TileService::new(fetcher.clone(), &memory_only_config());

    let standard = service.render_tile(dss2_request(40.0, 0.0)).await;
    let background = service
        .render_tile(dss2_request(40.0, 0.0).with_format(RenderFormat::Background))
        .await;

    assert_ne!(standard.key, background.key);
    assert!(!background.cache_hit);
    assert_eq!(fetcher.fetch_count(), 2);
}

// =============================================================================
// Degradation
// =============================================================================

#[tokio::test]
async fn test_timeout_yields_cached_procedural_tile() {
    let fetcher = MockFetcher::timing_out();
    let service = TileService::new(fetcher.clone(), &memory_only_config());

    let first = service.render_tile(dss2_request(83.822, -5.391)).await;
    assert_eq!(first.image.provenance(), Provenance::Procedural);
    assert!(is_valid_jpeg(first.image.data()));
    assert_eq!(jpeg_dimensions(first.image.data()), (128, 128));

    let second = service.render_tile(dss2_request(83.822, -5.391)).await;
    assert!(second.cache_hit);
    assert_eq!(second.image.data(), first.image.data());
    assert_eq!(fetcher.fetch_count(), 1);

    let stats = service.stats().snapshot();
    assert_eq!(stats.fetch_timeouts, 1);
    assert_eq!(stats.procedural_tiles, 1);
}

#[tokio::test]
async fn test_procedural_tiles_are_deterministic_across_services() {
    let a = TileService::new(MockFetcher::timing_out(), &memory_only_config());
    let b = TileService::new(
        MockFetcher::failing(FetchError::Unreachable("refused".into())),
        &memory_only_config(),
    );

    let tile_a = a.render_tile(dss2_request(200.0, -30.0)).await;
    let tile_b = b.render_tile(dss2_request(200.0, -30.0)).await;

    assert_eq!(tile_a.image.data(), tile_b.image.data());
}

#[tokio::test]
async fn test_failure_kinds_are_counted() {
    let unreachable = TileService::new(
        MockFetcher::failing(FetchError::Unreachable("dns".into())),
        &memory_only_config(),
    );
    unreachable.render_tile(dss2_request(1.0, 1.0)).await;
    assert_eq!(unreachable.stats().snapshot().fetch_unreachable, 1);

    let bad = TileService::new(
        MockFetcher::failing(FetchError::BadResponse("status 500".into())),
        &memory_only_config(),
    );
    bad.render_tile(dss2_request(1.0, 1.0)).await;
    assert_eq!(bad.stats().snapshot().fetch_bad_responses, 1);
}

#[tokio::test]
async fn test_undecodable_payload_served_as_fetched() {
    let payload = bytes::Bytes::from_static(b"\xFF\xD8 definitely not a full jpeg");
    let fetcher = MockFetcher::new(super::test_utils::MockBehavior::Raw(
        payload.clone(),
        "image/jpeg",
    ));
    let service = TileService::new(fetcher, &memory_only_config());

    let response = service.render_tile(dss2_request(5.0, 5.0)).await;
    assert_eq!(response.image.provenance(), Provenance::Remote);
    assert_eq!(response.image.data(), &payload);
    assert_eq!(service.stats().snapshot().decode_failures, 1);
}

// =============================================================================
// Disk Tier
// =============================================================================

#[tokio::test]
async fn test_disk_tier_survives_restart() {
    let dir = TestDir::new("restart");
    let request = dss2_request(56.75, 24.12);
    let key = TileKey::from_request(&request);

    let first_fetcher = MockFetcher::serving_images();
    let first = TileService::new(first_fetcher.clone(), &disk_config(dir.path()));
    let original = first.render_tile(request.clone()).await;
    assert_eq!(first_fetcher.fetch_count(), 1);

    let data_file = dir.path().join(format!("{}.jpg", key.fingerprint()));
    assert!(data_file.exists());

    // A new service over the same directory starts with a cold memory tier
    let second_fetcher = MockFetcher::timing_out();
    let second = TileService::new(second_fetcher.clone(), &disk_config(dir.path()));

    let (image, tier) = second.store().lookup(&key).await.unwrap();
    assert_eq!(tier, CacheTier::Disk);
    assert_eq!(image.data(), original.image.data());
    assert_eq!(image.provenance(), Provenance::Enhanced);

    let response = second.render_tile(request).await;
    assert!(response.cache_hit);
    assert_eq!(second_fetcher.fetch_count(), 0);
    assert_eq!(second.stats().snapshot().disk_hits, 1);
}

#[tokio::test]
async fn test_unwritable_disk_tier_still_serves() {
    let dir = TestDir::new("unwritable");
    std::fs::write(dir.path(), b"a file where the cache dir should be").unwrap();

    let fetcher = MockFetcher::serving_images();
    let service = TileService::new(fetcher.clone(), &disk_config(dir.path()));

    let first = service.render_tile(dss2_request(12.0, 12.0)).await;
    assert_eq!(first.image.provenance(), Provenance::Enhanced);

    let second = service.render_tile(dss2_request(12.0, 12.0)).await;
    assert!(second.cache_hit);
    assert_eq!(fetcher.fetch_count(), 1);
    assert_eq!(service.stats().snapshot().disk_write_failures, 1);

    std::fs::remove_file(dir.path()).unwrap();
}

// =============================================================================
// Viewport
// =============================================================================

#[tokio::test]
async fn test_viewport_renders_background_grid() {
    let fetcher = MockFetcher::serving_images();
    let service = TileService::new(fetcher.clone(), &memory_only_config());

    let tiles = service
        .render_viewport(SkyCoordinate::new(83.822, -5.391), 1, Survey::default())
        .await;

    assert_eq!(tiles.len(), 25);
    assert_eq!(tiles[0].footprint.offset, (-2, -2));
    assert_eq!(tiles[24].footprint.offset, (2, 2));
    assert!(tiles
        .iter()
        .all(|t| t.response.key.format() == RenderFormat::Background));
    assert_eq!(fetcher.fetch_count(), 25);
    assert!(fetcher.requests().iter().all(|r| r.dimensions() == (64, 64)));

    // Second pass is fully cached
    let again = service
        .render_viewport(SkyCoordinate::new(83.822, -5.391), 1, Survey::default())
        .await;
    assert!(again.iter().all(|t| t.response.cache_hit));
    assert_eq!(fetcher.fetch_count(), 25);
}

#[tokio::test]
async fn test_shared_store_between_services() {
    let fetcher = Arc::new(MockFetcher::serving_images());
    let config = memory_only_config();
    let a = TileService::new(MockFetcher::serving_images(), &config);
    let b = TileService::with_store(Arc::clone(&fetcher), Arc::clone(a.store()), &config);

    a.render_tile(dss2_request(3.0, 3.0)).await;
    let response = b.render_tile(dss2_request(3.0, 3.0)).await;

    assert!(response.cache_hit);
    assert_eq!(fetcher.fetch_count(), 0);
}
