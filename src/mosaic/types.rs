//! Geometry types shared by the mosaic index, planner and assembler.

use serde::{Deserialize, Serialize};

// =============================================================================
// Bounding Box
// =============================================================================

/// Pixel-space rectangle of one source tile, as reported by the container.
///
/// Offsets are signed because some acquisition software records stage
/// positions left of or above the first tile. Only the placement relative to
/// the canvas origin is guaranteed to be non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge in mosaic pixels
    pub x: i64,

    /// Top edge in mosaic pixels
    pub y: i64,

    /// Width in pixels (always > 0)
    pub w: u32,

    /// Height in pixels (always > 0)
    pub h: u32,
}

impl BoundingBox {
    pub fn new(x: i64, y: i64, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> i64 {
        self.x + self.w as i64
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> i64 {
        self.y + self.h as i64
    }

    /// Whether the box has a non-zero area.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.w > 0 && self.h > 0
    }

    /// Whether two boxes share at least one pixel.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

// =============================================================================
// Tile Record
// =============================================================================

/// One source tile of a mosaic.
///
/// `index` is the container's own tile index. It is stable and used for
/// ordering and error reporting, never for spatial inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRecord {
    pub index: usize,
    pub bbox: BoundingBox,
}

impl TileRecord {
    pub fn new(index: usize, bbox: BoundingBox) -> Self {
        Self { index, bbox }
    }
}

// =============================================================================
// Canvas Rectangle
// =============================================================================

/// Destination rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> usize {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    /// Whether the rectangle lies entirely inside a `width x height` canvas.
    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        self.right() <= width && self.bottom() <= height
    }
}
