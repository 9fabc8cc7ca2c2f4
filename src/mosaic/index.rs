//! Tile discovery.

use tracing::debug;

use crate::error::MosaicError;

use super::container::MosaicContainer;
use super::types::TileRecord;

/// List every tile of a container with its bounding box.
///
/// The result keeps the container's native order. When `limit` is set only
/// the first `limit` tiles in that order are returned, which is useful for
/// quick runs on a corner of a large slide.
///
/// # Errors
///
/// - [`MosaicError::ContainerFormat`] if the container has no mosaic
///   dimension, reports an empty bounding box, or reports one whose far edge
///   does not fit in `i64`
/// - any error the container raises while resolving a bounding box
pub fn list_tiles<C>(container: &C, limit: Option<usize>) -> Result<Vec<TileRecord>, MosaicError>
where
    C: MosaicContainer + ?Sized,
{
    let mut indices = container.tile_indices()?;
    if let Some(limit) = limit {
        indices.truncate(limit);
    }

    let mut tiles = Vec::with_capacity(indices.len());
    for index in indices {
        let bbox = container.tile_bbox(index)?;
        if !bbox.is_valid() {
            return Err(MosaicError::ContainerFormat {
                reason: format!(
                    "tile {} has an empty bounding box ({}x{})",
                    index, bbox.w, bbox.h
                ),
            });
        }
        if bbox.x.checked_add(i64::from(bbox.w)).is_none()
            || bbox.y.checked_add(i64::from(bbox.h)).is_none()
        {
            return Err(MosaicError::ContainerFormat {
                reason: format!(
                    "tile {} at ({}, {}) extends past the coordinate range",
                    index, bbox.x, bbox.y
                ),
            });
        }
        tiles.push(TileRecord::new(index, bbox));
    }

    debug!(
        "Indexed {} tile(s) from {}",
        tiles.len(),
        container.identifier()
    );

    Ok(tiles)
}
