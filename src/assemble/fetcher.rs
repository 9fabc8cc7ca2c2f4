//! Tile fetching.
//!
//! A fetch is the unit of concurrent work during reconstruction: read one
//! tile through the container, bring it into the canvas layout, and pair it
//! with its destination rectangle. Fetches never touch the canvas; they
//! return a [`TileBuffer`] value and the assembler does the writing.

use ndarray::Array3;

use crate::error::{TileReadError, TileReadErrorKind};
use crate::mosaic::{CanvasPlan, MosaicContainer, Pixel, Rect, TileRecord};

/// Pixels of one tile, ready to be written into the canvas.
#[derive(Debug, Clone)]
pub struct TileBuffer {
    /// Container index of the tile
    pub index: usize,

    /// Destination in canvas coordinates
    pub rect: Rect,

    /// Channel-last pixels of shape `(rect.height, rect.width, channels)`
    pub pixels: Array3<Pixel>,
}

/// Read one tile and place it on the canvas.
///
/// # Errors
///
/// Returns a [`TileReadError`] for `record.index` when the container read
/// fails or the returned buffer does not match the tile's bounding box and
/// the container's channel count.
pub async fn fetch<C>(
    container: &C,
    record: &TileRecord,
    plan: &CanvasPlan,
) -> Result<TileBuffer, TileReadError>
where
    C: MosaicContainer + ?Sized,
{
    let raw = container.read_tile(record.index).await?;
    reshape(record, plan, container.channels(), raw)
}

/// Convert a channel-first tile read into a [`TileBuffer`].
///
/// This is the CPU-bound half of a fetch. It validates the shape, permutes
/// `(channels, h, w)` into `(h, w, channels)` with a standard memory layout
/// and translates the bounding box by the plan origin.
pub fn reshape(
    record: &TileRecord,
    plan: &CanvasPlan,
    channels: usize,
    raw: Array3<Pixel>,
) -> Result<TileBuffer, TileReadError> {
    let expected = (channels, record.bbox.h as usize, record.bbox.w as usize);
    if raw.dim() != expected {
        return Err(TileReadError::new(
            record.index,
            TileReadErrorKind::ShapeMismatch {
                expected,
                actual: raw.dim(),
            },
        ));
    }

    let pixels = raw
        .permuted_axes([1, 2, 0])
        .as_standard_layout()
        .into_owned();

    Ok(TileBuffer {
        index: record.index,
        rect: plan.place(&record.bbox),
        pixels,
    })
}
