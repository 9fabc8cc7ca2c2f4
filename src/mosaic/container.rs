//! MosaicContainer trait for format-agnostic tile access.
//!
//! This module defines the capability the reconstruction pipeline consumes
//! from a mosaic container. The native container formats themselves are not
//! implemented here; each backend adapts one storage layout to this trait
//! and is chosen when the container is constructed:
//!
//! - [`crate::mosaic::InMemoryMosaic`] for tiles already held in memory
//! - [`crate::mosaic::ManifestMosaic`] for a JSON manifest plus encoded tile
//!   images in a [`crate::io::TileStore`]
//!
//! Closing a container is dropping it.

use async_trait::async_trait;
use ndarray::Array3;

use crate::error::{MosaicError, TileReadError};

use super::types::BoundingBox;

/// Element type of reconstructed canvases.
pub type Pixel = u16;

/// Format-agnostic interface for reading tiles from a mosaic container.
///
/// Implementations must be shareable across tasks: the assembler holds the
/// container in an `Arc` and reads tiles from several tasks at once.
#[async_trait]
pub trait MosaicContainer: Send + Sync {
    /// Get the container's tile indices in native order.
    ///
    /// The order is typically acquisition order and carries no spatial
    /// meaning. Returns [`MosaicError::ContainerFormat`] when the container
    /// has no mosaic dimension.
    fn tile_indices(&self) -> Result<Vec<usize>, MosaicError>;

    /// Get the pixel bounding box of a tile.
    fn tile_bbox(&self, index: usize) -> Result<BoundingBox, MosaicError>;

    /// Number of channels every tile carries.
    fn channels(&self) -> usize;

    /// Read the pixels of one tile.
    ///
    /// The returned array is channel-first: `(channels, height, width)`.
    ///
    /// # Errors
    ///
    /// Returns a [`TileReadError`] for this index if the read or decode
    /// fails. Callers treat this as a per-tile failure.
    async fn read_tile(&self, index: usize) -> Result<Array3<Pixel>, TileReadError>;

    /// Human-readable identifier for logging.
    fn identifier(&self) -> &str;
}
