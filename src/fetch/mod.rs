//! Remote tile retrieval.
//!
//! [`TileFetcher`] is the seam between the tile pipeline and the outside
//! world. [`SkyViewFetcher`] talks to the NASA SkyView query endpoint; tests
//! substitute in-process mocks.

mod skyview;

pub use skyview::{SkyViewFetcher, DEFAULT_FETCH_TIMEOUT, DEFAULT_SKYVIEW_URL};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;
use crate::tile::TileRequest;

/// Undecoded payload returned by a fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTile {
    pub data: Bytes,

    /// Content type declared by the remote service
    pub content_type: String,
}

/// Source of raw tile imagery.
///
/// A fetcher performs exactly one outbound attempt per call. Retries, if any,
/// belong to the caller.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch(&self, request: &TileRequest) -> Result<RawTile, FetchError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
