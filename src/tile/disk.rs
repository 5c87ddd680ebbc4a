//! Persistent tier of the tile cache.
//!
//! One file per tile under the cache directory, named by the key's
//! fingerprint, plus a small JSON sidecar carrying the content type and
//! provenance:
//!
//! ```text
//! data/tiles/
//!   3f5a…e1.jpg    encoded tile bytes
//!   3f5a…e1.json   {"content_type":"image/jpeg","provenance":"enhanced"}
//! ```
//!
//! Without a sidecar the tile is assumed to be a `.jpg` and its type is
//! sniffed from the bytes. Writes go to a temporary file first and are
//! renamed into place, so a reader never sees a partial tile. The directory
//! is created on first write.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::image::{extension_for, sniff_content_type, Provenance, TileImage, MIME_JPEG};
use super::key::TileKey;

#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
    provenance: Provenance,
}

/// File-backed tile storage.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Use `root` as the cache directory. Nothing is touched until first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sidecar_path(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{}.json", stem))
    }

    fn data_path(&self, stem: &str, content_type: &str) -> PathBuf {
        self.root.join(format!("{}.{}", stem, extension_for(content_type)))
    }

    /// Read a tile back from disk.
    ///
    /// Returns `Ok(None)` when no file exists for the key.
    pub async fn load(&self, key: &TileKey) -> io::Result<Option<TileImage>> {
        let stem = key.fingerprint();

        let sidecar = match tokio::fs::read(self.sidecar_path(&stem)).await {
            Ok(raw) => match serde_json::from_slice::<Sidecar>(&raw) {
                Ok(sidecar) => Some(sidecar),
                Err(e) => {
                    warn!(key = %key, error = %e, "Ignoring unreadable tile sidecar");
                    None
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };

        let (path, declared) = match &sidecar {
            Some(s) => (self.data_path(&stem, &s.content_type), Some(s)),
            None => (self.data_path(&stem, MIME_JPEG), None),
        };

        let data = match tokio::fs::read(&path).await {
            Ok(data) => Bytes::from(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        if data.is_empty() {
            debug!(path = %path.display(), "Skipping empty tile file");
            return Ok(None);
        }

        let image = match declared {
            Some(s) => TileImage::new(data, s.content_type.as_str(), s.provenance),
            None => {
                let content_type = sniff_content_type(&data).unwrap_or(MIME_JPEG);
                TileImage::new(data, content_type, Provenance::Remote)
            }
        };

        Ok(Some(image))
    }

    /// Write a tile to disk, replacing any existing file for the key.
    pub async fn store(&self, key: &TileKey, image: &TileImage) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;

        let stem = key.fingerprint();
        let data_path = self.data_path(&stem, image.content_type());
        write_atomic(&data_path, image.data()).await?;

        let sidecar = Sidecar {
            content_type: image.content_type().to_string(),
            provenance: image.provenance(),
        };
        let json = serde_json::to_vec(&sidecar).map_err(io::Error::other)?;
        write_atomic(&self.sidecar_path(&stem), &json).await?;

        Ok(())
    }

    /// Delete the files for a key, if present.
    pub async fn remove(&self, key: &TileKey) -> io::Result<()> {
        let stem = key.fingerprint();
        let sidecar = self.sidecar_path(&stem);

        let content_type = match tokio::fs::read(&sidecar).await {
            Ok(raw) => serde_json::from_slice::<Sidecar>(&raw)
                .map(|s| s.content_type)
                .unwrap_or_else(|_| MIME_JPEG.to_string()),
            Err(_) => MIME_JPEG.to_string(),
        };

        for path in [self.data_path(&stem, &content_type), sidecar] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(
        ".tmp-{}-{}",
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}
