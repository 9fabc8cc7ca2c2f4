//! In-memory mosaic backend.
//!
//! Holds every tile's pixels in memory. Useful for mosaics produced by other
//! pipeline stages and for exercising the assembler without storage.

use async_trait::async_trait;
use ndarray::Array3;

use crate::error::{MosaicError, TileReadError, TileReadErrorKind};

use super::container::{MosaicContainer, Pixel};
use super::types::BoundingBox;

#[derive(Debug, Clone)]
struct MemoryTile {
    bbox: BoundingBox,
    /// Channel-first pixels returned as-is
    pixels: Array3<Pixel>,
}

/// A mosaic whose tiles live in memory.
///
/// # Example
///
/// ```
/// use wsi_mosaic::mosaic::{BoundingBox, InMemoryMosaic, MosaicContainer};
///
/// let mosaic = InMemoryMosaic::builder(3)
///     .tile(BoundingBox::new(0, 0, 256, 256))
///     .tile_fn(BoundingBox::new(256, 0, 256, 256), |x, y, c| (x + y) as u16 + c as u16)
///     .build();
///
/// assert_eq!(mosaic.channels(), 3);
/// assert_eq!(mosaic.tile_indices().unwrap(), vec![0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryMosaic {
    channels: usize,
    tiles: Vec<MemoryTile>,
    identifier: String,
}

impl InMemoryMosaic {
    /// Start building a mosaic whose tiles carry `channels` channels.
    pub fn builder(channels: usize) -> InMemoryMosaicBuilder {
        InMemoryMosaicBuilder {
            mosaic: InMemoryMosaic {
                channels,
                tiles: Vec::new(),
                identifier: "memory://mosaic".to_string(),
            },
        }
    }

    /// Number of tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the mosaic has no tiles.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    fn tile(&self, index: usize) -> Option<&MemoryTile> {
        self.tiles.get(index)
    }
}

/// Builder for [`InMemoryMosaic`].
///
/// Tiles receive consecutive indices in insertion order.
#[derive(Debug, Clone)]
pub struct InMemoryMosaicBuilder {
    mosaic: InMemoryMosaic,
}

impl InMemoryMosaicBuilder {
    /// Add a zero-filled tile.
    pub fn tile(self, bbox: BoundingBox) -> Self {
        let pixels = Array3::zeros((self.mosaic.channels, bbox.h as usize, bbox.w as usize));
        self.tile_pixels(bbox, pixels)
    }

    /// Add a tile whose value at mosaic position `(x, y)`, channel `c` is
    /// `f(x, y, c)`.
    pub fn tile_fn<F>(self, bbox: BoundingBox, f: F) -> Self
    where
        F: Fn(i64, i64, usize) -> Pixel,
    {
        let shape = (self.mosaic.channels, bbox.h as usize, bbox.w as usize);
        let pixels = Array3::from_shape_fn(shape, |(c, row, col)| {
            f(bbox.x + col as i64, bbox.y + row as i64, c)
        });
        self.tile_pixels(bbox, pixels)
    }

    /// Add a tile with explicit channel-first pixels.
    ///
    /// The shape is not checked here; mismatches surface as read failures
    /// during assembly.
    pub fn tile_pixels(mut self, bbox: BoundingBox, pixels: Array3<Pixel>) -> Self {
        self.mosaic.tiles.push(MemoryTile { bbox, pixels });
        self
    }

    /// Set the identifier used in log messages.
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.mosaic.identifier = identifier.into();
        self
    }

    pub fn build(self) -> InMemoryMosaic {
        self.mosaic
    }
}

#[async_trait]
impl MosaicContainer for InMemoryMosaic {
    fn tile_indices(&self) -> Result<Vec<usize>, MosaicError> {
        Ok((0..self.tiles.len()).collect())
    }

    fn tile_bbox(&self, index: usize) -> Result<BoundingBox, MosaicError> {
        self.tile(index)
            .map(|t| t.bbox)
            .ok_or_else(|| MosaicError::ContainerFormat {
                reason: format!("tile index {} out of range", index),
            })
    }

    fn channels(&self) -> usize {
        self.channels
    }

    async fn read_tile(&self, index: usize) -> Result<Array3<Pixel>, TileReadError> {
        self.tile(index)
            .map(|tile| tile.pixels.clone())
            .ok_or_else(|| TileReadError::new(index, TileReadErrorKind::MissingTile))
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
