//! SkyView client tests against an in-process HTTP server.
//!
//! Tests verify:
//! - Query parameters sent for a tile request
//! - Error classification (status, content type, empty body, timeout, refused)
//! - End-to-end fallback when the service misbehaves

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use url::Url;

use sky_streamer::coords::SkyCoordinate;
use sky_streamer::error::FetchError;
use sky_streamer::fetch::{SkyViewFetcher, TileFetcher};
use sky_streamer::tile::{Provenance, Survey, TileRequest, TileService};

use super::test_utils::{create_survey_jpeg, memory_only_config};

type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

/// How the fake service answers `/query`.
#[derive(Clone, Copy)]
enum Upstream {
    Jpeg,
    NotFound,
    Html,
    Empty,
    Slow,
}

async fn query_handler(
    State((mode, seen)): State<(Upstream, Seen)>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    seen.lock().unwrap().push(params);
    match mode {
        Upstream::Jpeg => (
            [(header::CONTENT_TYPE, "image/jpeg")],
            create_survey_jpeg(32, 32),
        )
            .into_response(),
        Upstream::NotFound => (StatusCode::NOT_FOUND, "no such survey").into_response(),
        Upstream::Html => (
            [(header::CONTENT_TYPE, "text/html")],
            "<html>error page</html>",
        )
            .into_response(),
        Upstream::Empty => ([(header::CONTENT_TYPE, "image/jpeg")], Vec::<u8>::new()).into_response(),
        Upstream::Slow => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            ([(header::CONTENT_TYPE, "image/jpeg")], create_survey_jpeg(8, 8)).into_response()
        }
    }
}

/// Start a fake service and return its query endpoint.
async fn spawn_upstream(mode: Upstream) -> (Url, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/query", get(query_handler))
        .with_state((mode, Arc::clone(&seen)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let url = Url::parse(&format!("http://{}/query", addr)).unwrap();
    (url, seen)
}

fn request() -> TileRequest {
    TileRequest::new(
        SkyCoordinate::new(10.6847, 41.2687),
        0.5,
        Survey::new("DSS2 Red"),
    )
    .with_pixels(32, 32)
}

fn fetcher(url: Url, timeout: Duration) -> SkyViewFetcher {
    SkyViewFetcher::new(url, timeout).unwrap()
}

// =============================================================================
// Success
// =============================================================================

#[tokio::test]
async fn test_fetch_sends_skyview_query() {
    let (url, seen) = spawn_upstream(Upstream::Jpeg).await;
    let fetcher = fetcher(url, Duration::from_secs(5));

    let raw = fetcher.fetch(&request()).await.unwrap();
    assert_eq!(raw.content_type, "image/jpeg");
    assert!(!raw.data.is_empty());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let params = &seen[0];
    assert_eq!(params["Position"], "10.685,41.269");
    assert_eq!(params["Survey"], "DSS2 Red");
    assert_eq!(params["Pixels"], "32,32");
    assert_eq!(params["Size"], "0.500,0.500");
    assert_eq!(params["Return"], "JPEG");
}

// =============================================================================
// Error Classification
// =============================================================================

#[tokio::test]
async fn test_non_success_status_is_bad_response() {
    let (url, _) = spawn_upstream(Upstream::NotFound).await;
    let err = fetcher(url, Duration::from_secs(5))
        .fetch(&request())
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::BadResponse("status 404".to_string()));
}

#[tokio::test]
async fn test_non_image_content_type_is_bad_response() {
    let (url, _) = spawn_upstream(Upstream::Html).await;
    let err = fetcher(url, Duration::from_secs(5))
        .fetch(&request())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "bad_response");
    assert!(err.to_string().contains("text/html"));
}

#[tokio::test]
async fn test_empty_body_is_bad_response() {
    let (url, _) = spawn_upstream(Upstream::Empty).await;
    let err = fetcher(url, Duration::from_secs(5))
        .fetch(&request())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "bad_response");
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let (url, _) = spawn_upstream(Upstream::Slow).await;
    let err = fetcher(url, Duration::from_millis(200))
        .fetch(&request())
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::Timeout);
}

#[tokio::test]
async fn test_refused_connection_is_unreachable() {
    // Grab a free port, then close it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("http://{}/query", addr)).unwrap();
    let err = fetcher(url, Duration::from_secs(5))
        .fetch(&request())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "unreachable");
}

// =============================================================================
// End to End
// =============================================================================

#[tokio::test]
async fn test_service_enhances_real_responses() {
    let (url, seen) = spawn_upstream(Upstream::Jpeg).await;
    let service = TileService::new(fetcher(url, Duration::from_secs(5)), &memory_only_config());

    let first = service.render_tile(request()).await;
    assert_eq!(first.image.provenance(), Provenance::Enhanced);

    let second = service.render_tile(request()).await;
    assert!(second.cache_hit);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_service_falls_back_on_timeout() {
    let (url, _) = spawn_upstream(Upstream::Slow).await;
    let service = TileService::new(
        fetcher(url, Duration::from_millis(200)),
        &memory_only_config(),
    );

    let response = service.render_tile(request()).await;
    assert_eq!(response.image.provenance(), Provenance::Procedural);
    assert_eq!(service.stats().snapshot().fetch_timeouts, 1);
}
