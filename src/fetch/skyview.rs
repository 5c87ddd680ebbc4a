//! NASA SkyView client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::coords::format_milli;
use crate::error::FetchError;
use crate::tile::{TileKey, TileRequest};

use super::{RawTile, TileFetcher};

/// Public SkyView query endpoint.
pub const DEFAULT_SKYVIEW_URL: &str = "https://skyview.gsfc.nasa.gov/current/cgi/runquery.pl";

/// Client-side timeout for a single tile request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches tiles from a SkyView-compatible endpoint.
#[derive(Debug, Clone)]
pub struct SkyViewFetcher {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl SkyViewFetcher {
    /// Create a fetcher with its own HTTP client.
    pub fn new(endpoint: Url, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sky-streamer/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query string for a request.
    ///
    /// Position and size use the same three-decimal rounding as the cache
    /// key, so every request in one equivalence class asks for the same image.
    pub fn query_params(request: &TileRequest) -> Vec<(&'static str, String)> {
        let key = TileKey::from_request(request);
        let ra = format_milli(request.center.ra_milli());
        let dec = format_milli(request.center.dec_milli());
        let size = format!("{:.3}", key.size());

        vec![
            ("Position", format!("{},{}", ra, dec)),
            ("Survey", request.survey.name().to_string()),
            ("Pixels", format!("{},{}", request.width, request.height)),
            ("Size", format!("{},{}", size, size)),
            ("Return", "JPEG".to_string()),
            ("Scaling", "Log".to_string()),
            ("Sampler", "LI".to_string()),
        ]
    }
}

fn map_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Unreachable(err.to_string())
    }
}

#[async_trait]
impl TileFetcher for SkyViewFetcher {
    async fn fetch(&self, request: &TileRequest) -> Result<RawTile, FetchError> {
        info!(
            survey = %request.survey,
            ra = request.center.ra(),
            dec = request.center.dec(),
            size = request.angular_size,
            "Requesting SkyView tile"
        );

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&Self::query_params(request))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadResponse(format!("status {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.to_ascii_lowercase().starts_with("image/") {
            return Err(FetchError::BadResponse(format!(
                "non-image content type '{}'",
                content_type
            )));
        }

        let data = response.bytes().await.map_err(map_transport_error)?;
        if data.is_empty() {
            return Err(FetchError::BadResponse("empty body".to_string()));
        }

        debug!(bytes = data.len(), content_type = %content_type, "SkyView tile received");

        Ok(RawTile { data, content_type })
    }

    fn name(&self) -> &str {
        "skyview"
    }
}
