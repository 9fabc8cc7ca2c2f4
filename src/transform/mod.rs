//! Batched pixel transforms over a reconstructed canvas.
//!
//! A canvas is split into a row-major grid of [`BatchDescriptor`]s and an
//! opaque [`TileTransform`] is applied to each batch, either sequentially or
//! on a rayon worker pool. Results are merged back by a single writer.

mod engine;
mod grid;

pub use engine::{
    tile_fn, BatchTransformEngine, BoxError, FnTransform, TileTransform, TransformConfig,
    TransformOutput,
};
pub use grid::{batch_grid, BatchDescriptor};
