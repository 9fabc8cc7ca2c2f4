//! Row-major partition of a canvas into transform batches.

use std::fmt;

use serde::Serialize;

/// Half-open rectangular region of a canvas handled as one transform batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BatchDescriptor {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl BatchDescriptor {
    pub fn new(row_start: usize, row_end: usize, col_start: usize, col_end: usize) -> Self {
        Self {
            row_start,
            row_end,
            col_start,
            col_end,
        }
    }

    pub fn height(&self) -> usize {
        self.row_end - self.row_start
    }

    pub fn width(&self) -> usize {
        self.col_end - self.col_start
    }

    /// Number of pixels in the region.
    pub fn area(&self) -> usize {
        self.height() * self.width()
    }
}

impl fmt::Display for BatchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows {}..{}, cols {}..{}",
            self.row_start, self.row_end, self.col_start, self.col_end
        )
    }
}

/// Partition a `height x width` canvas into square batches of edge
/// `tile_size`.
///
/// Batches are returned row-major; the last row and column are clipped to
/// the canvas, so the descriptors cover every pixel exactly once. An empty
/// canvas yields no batches. `tile_size` must be positive.
pub fn batch_grid(height: usize, width: usize, tile_size: usize) -> Vec<BatchDescriptor> {
    debug_assert!(tile_size > 0);

    let rows = height.div_ceil(tile_size);
    let cols = width.div_ceil(tile_size);
    let mut batches = Vec::with_capacity(rows * cols);

    for row_start in (0..height).step_by(tile_size) {
        let row_end = (row_start + tile_size).min(height);
        for col_start in (0..width).step_by(tile_size) {
            let col_end = (col_start + tile_size).min(width);
            batches.push(BatchDescriptor::new(row_start, row_end, col_start, col_end));
        }
    }

    batches
}
