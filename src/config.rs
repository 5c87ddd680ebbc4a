//! Configuration management for Sky Streamer.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `SKY_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use sky_streamer::config::Config;
//!
//! let config = Config::parse();
//! config.validate()?;
//! let pipeline = config.pipeline_config();
//! ```
//!
//! # Environment Variables
//!
//! - `SKY_HOST` - Server bind address (default: 0.0.0.0)
//! - `SKY_PORT` - Server port (default: 3000)
//! - `SKY_SKYVIEW_URL` - Imaging service query endpoint
//! - `SKY_FETCH_TIMEOUT` - Per-request timeout in seconds (default: 30)
//! - `SKY_CACHE_DIR` - Persistent tile cache directory (default: data/tiles)
//! - `SKY_NO_DISK_CACHE` - Keep tiles in memory only (default: false)
//! - `SKY_CACHE_TILES` - Memory tier capacity in bytes (default: 100MB)
//! - `SKY_CACHE_TTL` - Memory tier entry lifetime in seconds, 0 disables (default: 3600)
//! - `SKY_TILE_SIZE` - Viewport tile edge in pixels (default: 256)
//! - `SKY_JPEG_QUALITY` - Standard tile JPEG quality (default: 85)
//! - `SKY_BACKGROUND_QUALITY` - Background tile JPEG quality (default: 75)
//! - `SKY_PROCEDURAL_QUALITY` - Procedural tile JPEG quality (default: 70)
//! - `SKY_MAX_ZOOM` - Zoom level where scaling saturates (default: 4)
//! - `SKY_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `SKY_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::coords::{DEFAULT_BASE_RANGE, DEFAULT_MAX_ZOOM};
use crate::fetch::DEFAULT_SKYVIEW_URL;
use crate::tile::{
    PipelineConfig, DEFAULT_BACKGROUND_QUALITY, DEFAULT_CACHE_ENTRIES, DEFAULT_JPEG_QUALITY,
    DEFAULT_PROCEDURAL_QUALITY, DEFAULT_TILE_CACHE_CAPACITY, DEFAULT_TILE_SIZE,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default fetch timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default persistent cache directory.
pub const DEFAULT_CACHE_DIR: &str = "data/tiles";

/// Default memory tier TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

const MAX_FETCH_TIMEOUT_SECS: u64 = 300;
const MIN_TILE_SIZE: u32 = 16;
const MAX_TILE_SIZE: u32 = 2048;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Sky Streamer - A cached sky-survey tile server.
///
/// Serves sky imagery from NASA SkyView through a two-tier cache, enhancing
/// fetched tiles and synthesizing starfields when the service is unavailable.
#[derive(Parser, Debug, Clone)]
#[command(name = "sky-streamer")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "SKY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "SKY_PORT")]
    pub port: u16,

    // =========================================================================
    // Imaging Service Configuration
    // =========================================================================
    /// SkyView-compatible query endpoint.
    #[arg(long, default_value = DEFAULT_SKYVIEW_URL, env = "SKY_SKYVIEW_URL")]
    pub skyview_url: String,

    /// Timeout for a single tile fetch, in seconds.
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS, env = "SKY_FETCH_TIMEOUT")]
    pub fetch_timeout: u64,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Directory for the persistent tile cache. Created on first write.
    #[arg(long, default_value = DEFAULT_CACHE_DIR, env = "SKY_CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Keep tiles in memory only.
    #[arg(long, default_value_t = false, env = "SKY_NO_DISK_CACHE")]
    pub no_disk_cache: bool,

    /// Memory tier capacity in bytes.
    #[arg(long, default_value_t = DEFAULT_TILE_CACHE_CAPACITY, env = "SKY_CACHE_TILES")]
    pub cache_tiles: usize,

    /// Memory tier entry lifetime in seconds (0 = no expiry).
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL_SECS, env = "SKY_CACHE_TTL")]
    pub cache_ttl: u64,

    // =========================================================================
    // Tile Configuration
    // =========================================================================
    /// Viewport tile edge in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "SKY_TILE_SIZE")]
    pub tile_size: u32,

    /// JPEG quality for standard tiles (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "SKY_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// JPEG quality for background tiles (1-100).
    #[arg(long, default_value_t = DEFAULT_BACKGROUND_QUALITY, env = "SKY_BACKGROUND_QUALITY")]
    pub background_quality: u8,

    /// JPEG quality for procedural tiles (1-100).
    #[arg(long, default_value_t = DEFAULT_PROCEDURAL_QUALITY, env = "SKY_PROCEDURAL_QUALITY")]
    pub procedural_quality: u8,

    /// Zoom level at which visual scaling saturates.
    #[arg(long, default_value_t = DEFAULT_MAX_ZOOM, env = "SKY_MAX_ZOOM")]
    pub max_zoom: u32,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "SKY_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "SKY_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

fn check_quality(name: &str, quality: u8) -> Result<(), String> {
    if quality == 0 || quality > 100 {
        return Err(format!("{} must be between 1 and 100", name));
    }
    Ok(())
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        let url = Url::parse(&self.skyview_url)
            .map_err(|e| format!("skyview_url '{}' is not a valid URL: {}", self.skyview_url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("skyview_url must use http or https, got '{}'", url.scheme()));
        }

        if self.fetch_timeout == 0 || self.fetch_timeout > MAX_FETCH_TIMEOUT_SECS {
            return Err(format!(
                "fetch_timeout must be between 1 and {} seconds",
                MAX_FETCH_TIMEOUT_SECS
            ));
        }

        if self.cache_tiles == 0 {
            return Err("cache_tiles must be greater than 0".to_string());
        }

        if !(MIN_TILE_SIZE..=MAX_TILE_SIZE).contains(&self.tile_size) {
            return Err(format!(
                "tile_size must be between {} and {} pixels",
                MIN_TILE_SIZE, MAX_TILE_SIZE
            ));
        }

        check_quality("jpeg_quality", self.jpeg_quality)?;
        check_quality("background_quality", self.background_quality)?;
        check_quality("procedural_quality", self.procedural_quality)?;

        if self.max_zoom == 0 {
            return Err("max_zoom must be at least 1".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parsed imaging service endpoint (call validate() first).
    pub fn skyview_endpoint(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.skyview_url)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    /// Settings for the tile pipeline.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            cache_dir: (!self.no_disk_cache).then(|| self.cache_dir.clone()),
            memory_capacity: self.cache_tiles,
            max_entries: DEFAULT_CACHE_ENTRIES,
            ttl: (self.cache_ttl > 0).then(|| Duration::from_secs(self.cache_ttl)),
            jpeg_quality: self.jpeg_quality,
            background_quality: self.background_quality,
            procedural_quality: self.procedural_quality,
            tile_size: self.tile_size,
            base_range: DEFAULT_BASE_RANGE,
            max_zoom: self.max_zoom,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
