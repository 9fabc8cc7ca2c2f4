//! Tiled resampling of large channel-last arrays.
//!
//! The output is produced window by window. Each output window is mapped
//! back to the source region it covers and resampled independently with a
//! triangle filter, so memory stays bounded by one window. Pixels near window
//! edges may differ slightly from a whole-image resample.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3};
use tracing::debug;

use crate::error::WindowError;

use super::iter::{WindowDescriptor, WindowGrid};

/// Resample `src` of shape `(H, W, C)` to `(out_height, out_width, C)`.
///
/// # Errors
///
/// [`WindowError::EmptyArray`] when `src` has no pixels, plus the
/// [`WindowGrid::new`] errors for `tile_size`.
pub fn resize_tiled(
    src: ArrayView3<'_, u16>,
    out_height: usize,
    out_width: usize,
    tile_size: usize,
) -> Result<Array3<u16>, WindowError> {
    let (height, width, channels) = src.dim();
    let grid = WindowGrid::new(out_height, out_width, tile_size, 0)?;
    if height == 0 || width == 0 {
        return Err(WindowError::EmptyArray);
    }

    debug!(
        "Resizing {}x{} to {}x{} in {} window(s)",
        width,
        height,
        out_width,
        out_height,
        grid.len()
    );

    let mut output = Array3::<u16>::zeros((out_height, out_width, channels));
    for window in &grid {
        let (y0, y1) = source_span(window.y0, window.y1, height, out_height);
        let (x0, x1) = source_span(window.x0, window.x1, width, out_width);
        let region = src.slice(s![y0..y1, x0..x1, ..]);

        for c in 0..channels {
            let resized = resize_plane(region.slice(s![.., .., c]), &window);
            output
                .slice_mut(s![window.y0..window.y1, window.x0..window.x1, c])
                .assign(&resized);
        }
    }

    Ok(output)
}

/// Source span covering output span `[start, end)` along one axis.
fn source_span(start: usize, end: usize, src_len: usize, out_len: usize) -> (usize, usize) {
    let scale = src_len as f64 / out_len as f64;
    let lo = ((start as f64 * scale).floor() as usize).min(src_len - 1);
    let hi = ((end as f64 * scale).ceil() as usize).clamp(lo + 1, src_len);
    (lo, hi)
}

fn resize_plane(
    plane: ArrayView2<'_, u16>,
    window: &WindowDescriptor,
) -> Array2<u16> {
    let (h, w) = plane.dim();
    let buffer: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_fn(w as u32, h as u32, |x, y| {
        Luma([plane[[y as usize, x as usize]]])
    });

    let resized = imageops::resize(
        &buffer,
        window.width() as u32,
        window.height() as u32,
        FilterType::Triangle,
    );

    Array2::from_shape_fn((window.height(), window.width()), |(y, x)| {
        resized.get_pixel(x as u32, y as u32)[0]
    })
}
