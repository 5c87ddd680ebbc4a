//! Rendered tile payloads.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// JPEG content type.
pub const MIME_JPEG: &str = "image/jpeg";

/// PNG content type.
pub const MIME_PNG: &str = "image/png";

/// SVG content type, used only by the static placeholder.
pub const MIME_SVG: &str = "image/svg+xml";

/// Last-resort tile: a flat near-black square.
const PLACEHOLDER_SVG: &[u8] = b"<svg width=\"256\" height=\"256\" xmlns=\"http://www.w3.org/2000/svg\"><rect width=\"100%\" height=\"100%\" fill=\"#0a0a0a\"/></svg>";

/// Where a tile's pixels came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Bytes exactly as served by the imaging service
    Remote,

    /// Imaging service bytes after post-processing
    Enhanced,

    /// Synthesized locally without the imaging service
    Procedural,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Remote => "remote",
            Provenance::Enhanced => "enhanced",
            Provenance::Procedural => "procedural",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remote" => Ok(Provenance::Remote),
            "enhanced" => Ok(Provenance::Enhanced),
            "procedural" => Ok(Provenance::Procedural),
            other => Err(format!("unknown provenance '{}'", other)),
        }
    }
}

/// An encoded tile image.
///
/// Immutable once built. Cloning is cheap: the byte buffer is reference
/// counted and shared between the cache tiers and every caller holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileImage {
    data: Bytes,
    content_type: Arc<str>,
    provenance: Provenance,
}

impl TileImage {
    pub fn new(data: Bytes, content_type: impl Into<Arc<str>>, provenance: Provenance) -> Self {
        Self {
            data,
            content_type: content_type.into(),
            provenance,
        }
    }

    /// A JPEG tile.
    pub fn jpeg(data: Bytes, provenance: Provenance) -> Self {
        Self::new(data, MIME_JPEG, provenance)
    }

    /// The fixed placeholder returned when even synthesis fails.
    pub fn placeholder() -> Self {
        Self::new(
            Bytes::from_static(PLACEHOLDER_SVG),
            MIME_SVG,
            Provenance::Procedural,
        )
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Encoded size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether this is the static placeholder rather than a raster.
    pub fn is_placeholder(&self) -> bool {
        self.data.as_ref() == PLACEHOLDER_SVG
    }
}

/// Infer a content type from leading magic bytes.
pub fn sniff_content_type(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(MIME_JPEG)
    } else if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some(MIME_PNG)
    } else if data.starts_with(b"GIF8") {
        Some("image/gif")
    } else if data.starts_with(b"<svg") || data.starts_with(b"<?xml") {
        Some(MIME_SVG)
    } else {
        None
    }
}

/// File extension for a content type, used for persistent-tier filenames.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        MIME_JPEG => "jpg",
        MIME_PNG => "png",
        MIME_SVG => "svg",
        "image/gif" => "gif",
        _ => "bin",
    }
}
