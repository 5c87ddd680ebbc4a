//! Sky Streamer - A cached sky-survey tile server.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sky_streamer::{
    config::Config,
    fetch::SkyViewFetcher,
    server::{create_router, RouterConfig},
    tile::TileService,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    let pipeline = config.pipeline_config();

    info!("Configuration:");
    info!("  SkyView endpoint: {}", config.skyview_url);
    info!("  Fetch timeout: {}s", config.fetch_timeout);
    match pipeline.cache_dir {
        Some(ref dir) => info!("  Disk cache: {}", dir.display()),
        None => warn!("  Disk cache: DISABLED - tiles are lost on restart"),
    }
    match pipeline.ttl {
        Some(ttl) => info!(
            "  Memory cache: {}MB, {}s TTL",
            config.cache_tiles / (1024 * 1024),
            ttl.as_secs()
        ),
        None => info!(
            "  Memory cache: {}MB, no expiry",
            config.cache_tiles / (1024 * 1024)
        ),
    }
    info!(
        "  JPEG quality: {} standard, {} background, {} procedural",
        config.jpeg_quality, config.background_quality, config.procedural_quality
    );

    let endpoint = match config.skyview_endpoint() {
        Ok(url) => url,
        Err(e) => {
            error!("Invalid SkyView endpoint: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let fetcher = match SkyViewFetcher::new(endpoint, config.fetch_timeout()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let tile_service = TileService::new(fetcher, &pipeline);
    let router = create_router(tile_service, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!(
        "    curl 'http://{}/tiles?ra=83.822&dec=-5.391&size=0.5' -o orion.jpg",
        addr
    );
    info!("    curl 'http://{}/viewport?ra=83.822&dec=-5.391&zoom=1'", addr);
    info!(
        "    curl 'http://{}/gallery/Orion%20Nebula?ra=83.822&dec=-5.391'",
        addr
    );
    info!(
        "    curl 'http://{}/composite?ra=83.822&dec=-5.391' -o orion-composite.jpg",
        addr
    );
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("███████╗██╗  ██╗██╗   ██╗");
    info!("██╔════╝██║ ██╔╝╚██╗ ██╔╝");
    info!("███████╗█████╔╝  ╚████╔╝ ");
    info!("╚════██║██╔═██╗   ╚██╔╝  ");
    info!("███████║██║  ██╗   ██║   ");
    info!("╚══════╝╚═╝  ╚═╝   ╚═╝   ");
    info!("");
    info!("███████╗████████╗██████╗ ███████╗ █████╗ ███╗   ███╗███████╗██████╗ ");
    info!("██╔════╝╚══██╔══╝██╔══██╗██╔════╝██╔══██╗████╗ ████║██╔════╝██╔══██╗");
    info!("███████╗   ██║   ██████╔╝█████╗  ███████║██╔████╔██║█████╗  ██████╔╝");
    info!("╚════██║   ██║   ██╔══██╗██╔══╝  ██╔══██║██║╚██╔╝██║██╔══╝  ██╔══██╗");
    info!("███████║   ██║   ██║  ██║███████╗██║  ██║██║ ╚═╝ ██║███████╗██║  ██║");
    info!("╚══════╝   ╚═╝   ╚═╝  ╚═╝╚══════╝╚═╝  ╚═╝╚═╝     ╚═╝╚══════╝╚═╝  ╚═╝");
    info!("");
    info!("                        v{}", version);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "sky_streamer=debug,tower_http=debug"
    } else {
        "sky_streamer=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}
