//! API integration tests for tile retrieval and error handling.
//!
//! Tests verify:
//! - Tile retrieval with cache and provenance headers
//! - Viewport, gallery, composite, telescope, projection and health endpoints
//! - Error cases (missing, malformed and out-of-range parameters)

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use sky_streamer::tile::TileService;
use sky_streamer::{create_router, RouterConfig};

use super::test_utils::{is_valid_jpeg, jpeg_dimensions, memory_only_config, MockFetcher};

fn router_with(fetcher: MockFetcher) -> Router {
    let tile_service = TileService::new(fetcher, &memory_only_config());
    create_router(tile_service, RouterConfig::new().with_tracing(false))
}

async fn get(router: &Router, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Tile Retrieval
// =============================================================================

#[tokio::test]
async fn test_tile_retrieval_success() {
    let fetcher = MockFetcher::serving_images();
    let router = router_with(fetcher.clone());

    let uri = "/tiles?ra=10.685&dec=41.269&size=0.5&survey=DSS2%20Red&width=96&height=96";
    let response = get(&router, uri).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");
    assert_eq!(response.headers()["cache-control"], "public, max-age=3600");
    assert_eq!(response.headers()["x-tile-cache-hit"], "false");
    assert_eq!(response.headers()["x-tile-provenance"], "enhanced");
    assert_eq!(
        response.headers()["x-tile-key"],
        "DSS2 Red|standard|10.685|41.269|0.500"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_jpeg(&body));
    assert_eq!(jpeg_dimensions(&body), (96, 96));

    let response = get(&router, uri).await;
    assert_eq!(response.headers()["x-tile-cache-hit"], "true");
    assert_eq!(fetcher.fetch_count(), 1);
}

#[tokio::test]
async fn test_tile_defaults() {
    let fetcher = MockFetcher::serving_images();
    let router = router_with(fetcher.clone());

    let response = get(&router, "/tiles?ra=83.822&dec=-5.391").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["x-tile-key"],
        "DSS2 Red|standard|83.822|-5.391|0.500"
    );

    let requested = &fetcher.requests()[0];
    assert_eq!(requested.dimensions(), (64, 64));
}

#[tokio::test]
async fn test_tile_wavelength_alias() {
    let fetcher = MockFetcher::serving_images();
    let router = router_with(fetcher.clone());

    let response = get(&router, "/tiles?ra=83.822&dec=-5.391&survey=infrared").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fetcher.requests()[0].survey.name(), "2MASS-J");
}

#[tokio::test]
async fn test_tile_served_when_upstream_times_out() {
    let router = router_with(MockFetcher::timing_out());

    let response = get(&router, "/tiles?ra=83.822&dec=-5.391&format=background").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");
    assert_eq!(response.headers()["x-tile-provenance"], "procedural");
    assert!(response.headers()["x-tile-key"]
        .to_str()
        .unwrap()
        .contains("|background|"));
}

// =============================================================================
// Parameter Errors
// =============================================================================

#[tokio::test]
async fn test_missing_coordinates() {
    let router = router_with(MockFetcher::serving_images());

    let response = get(&router, "/tiles?ra=10.0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_parameter");
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_malformed_number() {
    let router = router_with(MockFetcher::serving_images());
    let response = get(&router, "/tiles?ra=north&dec=10").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_size_and_pixels() {
    let fetcher = MockFetcher::serving_images();
    let router = router_with(fetcher.clone());

    for uri in [
        "/tiles?ra=10&dec=10&size=0",
        "/tiles?ra=10&dec=10&size=-1",
        "/tiles?ra=10&dec=10&width=0",
        "/tiles?ra=10&dec=10&height=100000",
    ] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
    assert_eq!(fetcher.fetch_count(), 0);
}

#[tokio::test]
async fn test_empty_survey() {
    let router = router_with(MockFetcher::serving_images());

    let response = get(&router, "/tiles?ra=10&dec=10&survey=%20").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_survey");
}

#[tokio::test]
async fn test_unknown_format() {
    let router = router_with(MockFetcher::serving_images());
    let response = get(&router, "/tiles?ra=10&dec=10&format=thumbnail").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Other Endpoints
// =============================================================================

#[tokio::test]
async fn test_viewport_endpoint() {
    let fetcher = MockFetcher::serving_images();
    let router = router_with(fetcher.clone());

    let response = get(&router, "/viewport?ra=83.822&dec=-5.391&zoom=2").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["zoom"], 2);
    assert_eq!(json["view_range"], 30.0);
    assert_eq!(json["survey"], "DSS2 Red");

    let tiles = json["tiles"].as_array().unwrap();
    assert_eq!(tiles.len(), 25);
    assert!(tiles[0]["url"]
        .as_str()
        .unwrap()
        .starts_with("/tiles?ra="));
    assert!(tiles[0]["url"].as_str().unwrap().ends_with("format=background"));
    assert_eq!(fetcher.fetch_count(), 25);
}

#[tokio::test]
async fn test_gallery_endpoint() {
    let router = router_with(MockFetcher::serving_images());

    let response = get(&router, "/gallery/Orion%20Nebula?ra=83.822&dec=-5.391").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["object"]["object_name"], "Orion Nebula");
    assert_eq!(json["object"]["coordinate_system"], "J2000.0");

    let items = json["items"].as_array().unwrap();
    assert_eq!(items[0]["category"], "optical");
    assert!(items[0]["image_url"].as_str().unwrap().starts_with("/tiles?"));

    let last = items.last().unwrap();
    assert_eq!(last["category"], "space_telescope");
    assert!(last["image_url"].as_str().unwrap().starts_with("https://"));
    assert!(last.get("provenance").is_none());
}

#[tokio::test]
async fn test_composite_endpoint() {
    let fetcher = MockFetcher::serving_images();
    let router = router_with(fetcher.clone());

    let response = get(&router, "/composite?ra=83.822&dec=-5.391&width=120&height=120").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");
    assert_eq!(response.headers()["x-tile-provenance"], "enhanced");
    assert_eq!(response.headers()["x-composite-surveys"], "DSS2 Red,2MASS-J");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_jpeg(&body));
    assert_eq!(jpeg_dimensions(&body), (120, 120));
    assert_eq!(fetcher.fetch_count(), 2);
}

#[tokio::test]
async fn test_composite_endpoint_falls_back() {
    let router = router_with(MockFetcher::timing_out());

    let response = get(&router, "/composite?ra=83.822&dec=-5.391&surveys=radio,xray").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-tile-provenance"], "procedural");
    assert_eq!(response.headers()["x-composite-surveys"], "");
}

#[tokio::test]
async fn test_composite_endpoint_rejects_empty_survey() {
    let router = router_with(MockFetcher::serving_images());
    let response = get(&router, "/composite?ra=1&dec=1&surveys=optical,,infrared").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_survey");
}

#[tokio::test]
async fn test_telescope_endpoint() {
    let fetcher = MockFetcher::serving_images();
    let router = router_with(fetcher.clone());

    let response = get(&router, "/telescope/Fermi%20Gamma-ray%20Space%20Telescope?ra=83.822&dec=-5.391").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-tile-provenance"], "enhanced");
    assert_eq!(
        response.headers()["x-tile-key"],
        "Fermi 5|standard|83.822|-5.391|0.300"
    );

    let response = get(&router, "/telescope/Fermi?ra=83.822&dec=-5.391").await;
    assert_eq!(response.headers()["x-tile-cache-hit"], "true");
    assert_eq!(fetcher.fetch_count(), 1);

    let response = get(&router, "/telescope/Hubble?ra=north&dec=1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_project_endpoint() {
    let router = router_with(MockFetcher::serving_images());

    let response = get(&router, "/project?ra=83.822&dec=-5.391").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["zoom"], 1);
    assert!(json["cartesian"]["x"].is_number());
    assert!(json["screen"]["x"].is_number());
}

#[tokio::test]
async fn test_health_endpoint() {
    let router = router_with(MockFetcher::timing_out());
    get(&router, "/tiles?ra=1&dec=1").await;

    let response = get(&router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["stats"]["fetch_timeouts"], 1);
    assert_eq!(json["stats"]["procedural_tiles"], 1);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_unknown_route() {
    let router = router_with(MockFetcher::serving_images());
    let response = get(&router, "/tiles/1/2/3.jpg").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
