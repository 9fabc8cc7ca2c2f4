//! Sliding windows over the first two axes of an array.
//!
//! Window starts along an axis are `0, step, 2 * step, ...` with
//! `step = tile_size - overlap`. A further start is produced only while the
//! previous window ended before the edge, and every window is clipped to the
//! array. With `overlap = 0` the windows therefore cover the array exactly.

use std::fmt;

use ndarray::{ArrayView, ArrayView2, Axis, Dimension, Slice};
use serde::Serialize;

use crate::error::WindowError;

/// Half-open window `[x0, x1) x [y0, y1)` in array coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WindowDescriptor {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl WindowDescriptor {
    pub fn new(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> usize {
        self.x1 - self.x0
    }

    pub fn height(&self) -> usize {
        self.y1 - self.y0
    }
}

impl fmt::Display for WindowDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})..({}, {})", self.x0, self.y0, self.x1, self.y1)
    }
}

// =============================================================================
// Window Grid
// =============================================================================

/// Window layout for a `height x width` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGrid {
    height: usize,
    width: usize,
    tile_size: usize,
    overlap: usize,
}

impl WindowGrid {
    /// # Errors
    ///
    /// [`WindowError::ZeroTileSize`] for `tile_size == 0` and
    /// [`WindowError::OverlapTooLarge`] unless `overlap < tile_size`.
    pub fn new(
        height: usize,
        width: usize,
        tile_size: usize,
        overlap: usize,
    ) -> Result<Self, WindowError> {
        if tile_size == 0 {
            return Err(WindowError::ZeroTileSize);
        }
        if overlap >= tile_size {
            return Err(WindowError::OverlapTooLarge { tile_size, overlap });
        }

        Ok(Self {
            height,
            width,
            tile_size,
            overlap,
        })
    }

    /// Distance between consecutive window starts.
    pub fn step(&self) -> usize {
        self.tile_size - self.overlap
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Array shape as `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Number of windows the grid yields.
    pub fn len(&self) -> usize {
        self.axis_count(self.height) * self.axis_count(self.width)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the windows row-major. Each call starts from the first window.
    pub fn iter(&self) -> WindowIter {
        WindowIter {
            grid: *self,
            x: 0,
            y: 0,
            done: self.height == 0 || self.width == 0,
        }
    }

    fn axis_count(&self, dim: usize) -> usize {
        if dim == 0 {
            0
        } else if dim <= self.tile_size {
            1
        } else {
            (dim - self.tile_size).div_ceil(self.step()) + 1
        }
    }
}

impl IntoIterator for &WindowGrid {
    type Item = WindowDescriptor;
    type IntoIter = WindowIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the windows of a [`WindowGrid`].
#[derive(Debug, Clone)]
pub struct WindowIter {
    grid: WindowGrid,
    x: usize,
    y: usize,
    done: bool,
}

impl Iterator for WindowIter {
    type Item = WindowDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let WindowGrid {
            height,
            width,
            tile_size,
            ..
        } = self.grid;
        let window = WindowDescriptor::new(
            self.x,
            self.y,
            (self.x + tile_size).min(width),
            (self.y + tile_size).min(height),
        );

        if self.x + tile_size < width {
            self.x += self.grid.step();
        } else if self.y + tile_size < height {
            self.x = 0;
            self.y += self.grid.step();
        } else {
            self.done = true;
        }

        Some(window)
    }
}

// =============================================================================
// Array Windows
// =============================================================================

/// Windows over `array` paired with views of each window.
///
/// The array must have at least two axes; windows slice the first two
/// (rows, columns) and keep any further axes whole.
///
/// ```
/// use ndarray::Array3;
/// use wsi_mosaic::window::windows;
///
/// let canvas = Array3::<u16>::zeros((50, 50, 3));
/// let starts: Vec<usize> = windows(canvas.view(), 20, 5)
///     .unwrap()
///     .filter(|(w, _)| w.y0 == 0)
///     .map(|(w, _)| w.x0)
///     .collect();
/// assert_eq!(starts, vec![0, 15, 30]);
/// ```
pub fn windows<A, D>(
    array: ArrayView<'_, A, D>,
    tile_size: usize,
    overlap: usize,
) -> Result<Windows<'_, A, D>, WindowError>
where
    D: Dimension,
{
    let (height, width) = spatial_shape(&array)?;
    let grid = WindowGrid::new(height, width, tile_size, overlap)?;
    Ok(Windows {
        array,
        iter: grid.iter(),
    })
}

/// Like [`windows`], also yielding the co-located view of a 2-D mask.
///
/// # Errors
///
/// [`WindowError::MaskShapeMismatch`] unless the mask shape equals the
/// array's first two axes.
pub fn masked_windows<'a, A, M, D>(
    array: ArrayView<'a, A, D>,
    mask: ArrayView2<'a, M>,
    tile_size: usize,
    overlap: usize,
) -> Result<MaskedWindows<'a, A, M, D>, WindowError>
where
    D: Dimension,
{
    let shape = spatial_shape(&array)?;
    if mask.dim() != shape {
        return Err(WindowError::MaskShapeMismatch {
            array: shape,
            mask: mask.dim(),
        });
    }

    Ok(MaskedWindows {
        windows: windows(array, tile_size, overlap)?,
        mask,
    })
}

fn spatial_shape<A, D: Dimension>(
    array: &ArrayView<'_, A, D>,
) -> Result<(usize, usize), WindowError> {
    match array.shape() {
        [height, width, ..] => Ok((*height, *width)),
        _ => Err(WindowError::TooFewAxes { ndim: array.ndim() }),
    }
}

fn window_view<'a, A, D: Dimension>(
    array: &ArrayView<'a, A, D>,
    window: &WindowDescriptor,
) -> ArrayView<'a, A, D> {
    array
        .clone()
        .slice_axis_move(Axis(0), Slice::from(window.y0..window.y1))
        .slice_axis_move(Axis(1), Slice::from(window.x0..window.x1))
}

/// Iterator returned by [`windows`].
pub struct Windows<'a, A, D: Dimension> {
    array: ArrayView<'a, A, D>,
    iter: WindowIter,
}

impl<A, D: Dimension> Windows<'_, A, D> {
    /// The grid being iterated.
    pub fn grid(&self) -> &WindowGrid {
        &self.iter.grid
    }
}

impl<A, D: Dimension> Clone for Windows<'_, A, D> {
    fn clone(&self) -> Self {
        Self {
            array: self.array.clone(),
            iter: self.iter.clone(),
        }
    }
}

impl<'a, A, D: Dimension> Iterator for Windows<'a, A, D> {
    type Item = (WindowDescriptor, ArrayView<'a, A, D>);

    fn next(&mut self) -> Option<Self::Item> {
        let window = self.iter.next()?;
        Some((window, window_view(&self.array, &window)))
    }
}

/// Iterator returned by [`masked_windows`].
pub struct MaskedWindows<'a, A, M, D: Dimension> {
    windows: Windows<'a, A, D>,
    mask: ArrayView2<'a, M>,
}

impl<A, M, D: Dimension> Clone for MaskedWindows<'_, A, M, D> {
    fn clone(&self) -> Self {
        Self {
            windows: self.windows.clone(),
            mask: self.mask.clone(),
        }
    }
}

impl<'a, A, M, D: Dimension> Iterator for MaskedWindows<'a, A, M, D> {
    type Item = (WindowDescriptor, ArrayView<'a, A, D>, ArrayView2<'a, M>);

    fn next(&mut self) -> Option<Self::Item> {
        let (window, view) = self.windows.next()?;
        let mask = window_view(&self.mask, &window);
        Some((window, view, mask))
    }
}
