//! Canvas planning.
//!
//! Computes the smallest canvas that holds every tile, and the offset that
//! moves tile coordinates into it. Overlapping tiles are not rejected: the
//! tile written last wins. [`find_overlaps`] reports such pairs so callers can
//! decide whether the mosaic is trustworthy.

use serde::Serialize;

use crate::error::MosaicError;

use super::types::{BoundingBox, Rect, TileRecord};

// =============================================================================
// Canvas Plan
// =============================================================================

/// Placement of a mosaic on its output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CanvasPlan {
    /// Top-left corner of the mosaic in container coordinates: `(x0, y0)`
    pub origin: (i64, i64),

    /// Canvas width in pixels
    pub width: usize,

    /// Canvas height in pixels
    pub height: usize,
}

impl CanvasPlan {
    /// Translate a container bounding box into canvas coordinates.
    ///
    /// Boxes of tiles the plan was built from always land inside the canvas.
    pub fn place(&self, bbox: &BoundingBox) -> Rect {
        Rect::new(
            (bbox.x - self.origin.0) as usize,
            (bbox.y - self.origin.1) as usize,
            bbox.w as usize,
            bbox.h as usize,
        )
    }

    /// Canvas size as `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Number of pixels per channel.
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// Compute the canvas plan for a set of tiles.
///
/// Single pass over the four box extremes.
///
/// # Errors
///
/// Returns [`MosaicError::EmptyTileSet`] if `tiles` is empty.
pub fn plan(tiles: &[TileRecord]) -> Result<CanvasPlan, MosaicError> {
    let first = tiles.first().ok_or(MosaicError::EmptyTileSet)?;

    let mut min_x = first.bbox.x;
    let mut min_y = first.bbox.y;
    let mut max_x = first.bbox.right();
    let mut max_y = first.bbox.bottom();

    for tile in &tiles[1..] {
        min_x = min_x.min(tile.bbox.x);
        min_y = min_y.min(tile.bbox.y);
        max_x = max_x.max(tile.bbox.right());
        max_y = max_y.max(tile.bbox.bottom());
    }

    Ok(CanvasPlan {
        origin: (min_x, min_y),
        width: max_x.abs_diff(min_x) as usize,
        height: max_y.abs_diff(min_y) as usize,
    })
}

// =============================================================================
// Overlap Detection
// =============================================================================

/// A pair of tiles whose bounding boxes share pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileOverlap {
    /// Container index of the first tile
    pub first: usize,

    /// Container index of the second tile
    pub second: usize,
}

/// Find every pair of overlapping tiles.
///
/// Sweeps boxes sorted by left edge, so mosaics laid out on a grid cost close
/// to `O(n log n)`. Pairs are reported with `first < second`, sorted.
pub fn find_overlaps(tiles: &[TileRecord]) -> Vec<TileOverlap> {
    let mut sorted: Vec<&TileRecord> = tiles.iter().collect();
    sorted.sort_by_key(|t| t.bbox.x);

    let mut overlaps = Vec::new();
    for (i, a) in sorted.iter().enumerate() {
        for b in &sorted[i + 1..] {
            if b.bbox.x >= a.bbox.right() {
                break;
            }
            if a.bbox.intersects(&b.bbox) {
                overlaps.push(TileOverlap {
                    first: a.index.min(b.index),
                    second: a.index.max(b.index),
                });
            }
        }
    }

    overlaps.sort_by_key(|o| (o.first, o.second));
    overlaps
}
