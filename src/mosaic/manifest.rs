//! Manifest-described mosaics.
//!
//! A manifest is a JSON document that lists the tiles of a mosaic with their
//! pixel offsets and the storage key of each tile image:
//!
//! ```json
//! {
//!   "channels": 3,
//!   "tiles": [
//!     { "index": 0, "x": 0,   "y": 0, "width": 256, "height": 256, "path": "tiles/0.png" },
//!     { "index": 1, "x": 256, "y": 0, "width": 256, "height": 256, "path": "tiles/1.png" }
//!   ]
//! }
//! ```
//!
//! Tile paths are resolved relative to the manifest's own folder. Tile images
//! may be PNG, JPEG or TIFF; 8-bit samples keep their values when widened to
//! the 16-bit canvas type.

use std::collections::HashMap;

use async_trait::async_trait;
use ndarray::Array3;
use serde::Deserialize;
use tracing::debug;

use crate::error::{IoError, MosaicError, TileReadError, TileReadErrorKind};
use crate::io::TileStore;

use super::container::{MosaicContainer, Pixel};
use super::types::BoundingBox;

// =============================================================================
// Manifest Document
// =============================================================================

#[derive(Debug, Deserialize)]
struct ManifestDocument {
    channels: Option<usize>,
    tiles: Option<Vec<ManifestTile>>,
}

/// One tile entry of a manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestTile {
    /// Container index; defaults to the entry's position
    pub index: Option<usize>,
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
    /// Storage key relative to the manifest's folder
    pub path: String,
}

// =============================================================================
// Manifest Mosaic
// =============================================================================

/// Channel counts a tile image can be decoded to (gray, RGB, RGBA).
const SUPPORTED_CHANNELS: [usize; 3] = [1, 3, 4];

/// A mosaic described by a JSON manifest in a [`TileStore`].
pub struct ManifestMosaic<S: TileStore> {
    store: S,
    channels: usize,
    /// Tiles in manifest order
    tiles: Vec<(usize, BoundingBox, String)>,
    /// Container index to position in `tiles`
    positions: HashMap<usize, usize>,
    identifier: String,
}

impl<S: TileStore> ManifestMosaic<S> {
    /// Open a mosaic by reading and validating its manifest.
    ///
    /// # Errors
    ///
    /// - [`MosaicError::Io`] if the manifest cannot be fetched
    /// - [`MosaicError::ContainerFormat`] if it is not valid JSON, lacks the
    ///   `channels` or `tiles` field, declares a channel count tiles cannot
    ///   be decoded to, or repeats a tile index
    pub async fn open(store: S, manifest_key: &str) -> Result<Self, MosaicError> {
        let identifier = store.identifier(manifest_key);
        let raw = store.get(manifest_key).await?;

        let document: ManifestDocument =
            serde_json::from_slice(&raw).map_err(|e| MosaicError::ContainerFormat {
                reason: format!("{}: invalid manifest: {}", identifier, e),
            })?;

        let channels = document.channels.ok_or_else(|| MosaicError::ContainerFormat {
            reason: format!("{}: missing channel dimension", identifier),
        })?;
        if !SUPPORTED_CHANNELS.contains(&channels) {
            return Err(MosaicError::ContainerFormat {
                reason: format!(
                    "{}: unsupported channel count {} (expected one of {:?})",
                    identifier, channels, SUPPORTED_CHANNELS
                ),
            });
        }

        let entries = document.tiles.ok_or_else(|| MosaicError::ContainerFormat {
            reason: format!("{}: missing mosaic dimension", identifier),
        })?;

        let base = match manifest_key.rsplit_once('/') {
            Some((folder, _)) => format!("{}/", folder),
            None => String::new(),
        };

        let mut tiles = Vec::with_capacity(entries.len());
        let mut positions = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.into_iter().enumerate() {
            let index = entry.index.unwrap_or(position);
            if positions.insert(index, position).is_some() {
                return Err(MosaicError::ContainerFormat {
                    reason: format!("{}: duplicate tile index {}", identifier, index),
                });
            }
            let bbox = BoundingBox::new(entry.x, entry.y, entry.width, entry.height);
            tiles.push((index, bbox, format!("{}{}", base, entry.path)));
        }

        debug!(
            "Opened manifest {} ({} tiles, {} channels)",
            identifier,
            tiles.len(),
            channels
        );

        Ok(Self {
            store,
            channels,
            tiles,
            positions,
            identifier,
        })
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn entry(&self, index: usize) -> Option<&(usize, BoundingBox, String)> {
        self.positions.get(&index).map(|&p| &self.tiles[p])
    }
}

#[async_trait]
impl<S: TileStore> MosaicContainer for ManifestMosaic<S> {
    fn tile_indices(&self) -> Result<Vec<usize>, MosaicError> {
        Ok(self.tiles.iter().map(|(index, _, _)| *index).collect())
    }

    fn tile_bbox(&self, index: usize) -> Result<BoundingBox, MosaicError> {
        self.entry(index)
            .map(|(_, bbox, _)| *bbox)
            .ok_or_else(|| MosaicError::ContainerFormat {
                reason: format!("{}: no tile with index {}", self.identifier, index),
            })
    }

    fn channels(&self) -> usize {
        self.channels
    }

    async fn read_tile(&self, index: usize) -> Result<Array3<Pixel>, TileReadError> {
        let (_, _, key) = self
            .entry(index)
            .ok_or_else(|| TileReadError::new(index, TileReadErrorKind::MissingTile))?;

        let data = self.store.get(key).await.map_err(|e| {
            let detail = match e {
                IoError::NotFound(id) => format!("{} not found", id),
                other => other.to_string(),
            };
            TileReadError::new(index, TileReadErrorKind::Io(detail))
        })?;

        decode_channel_first(&data, self.channels)
            .map_err(|message| TileReadError::new(index, TileReadErrorKind::Decode(message)))
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// Tile Decoding
// =============================================================================

/// Decode an encoded tile image into a channel-first `(channels, h, w)` array.
///
/// 8-bit images are widened without rescaling, so a sample of 200 stays 200.
fn decode_channel_first(data: &[u8], channels: usize) -> Result<Array3<Pixel>, String> {
    let img = image::load_from_memory(data).map_err(|e| e.to_string())?;
    let (width, height) = (img.width() as usize, img.height() as usize);

    let color = img.color();
    let eight_bit = color.bytes_per_pixel() == color.channel_count();

    let samples: Vec<Pixel> = match (channels, eight_bit) {
        (1, true) => widen(img.to_luma8().into_raw()),
        (1, false) => img.to_luma16().into_raw(),
        (3, true) => widen(img.to_rgb8().into_raw()),
        (3, false) => img.to_rgb16().into_raw(),
        (4, true) => widen(img.to_rgba8().into_raw()),
        (4, false) => img.to_rgba16().into_raw(),
        (n, _) => return Err(format!("unsupported channel count {}", n)),
    };

    let interleaved =
        Array3::from_shape_vec((height, width, channels), samples).map_err(|e| e.to_string())?;

    Ok(interleaved.permuted_axes([2, 0, 1]))
}

fn widen(samples: Vec<u8>) -> Vec<Pixel> {
    samples.into_iter().map(Pixel::from).collect()
}
