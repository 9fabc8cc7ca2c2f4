//! # WSI Mosaic
//!
//! Reconstruction and batched processing of tiled mosaic microscopy images.
//!
//! Mosaic containers store a gigapixel image as many rectangular tiles, each
//! with its own offset. This library stitches those tiles into a single
//! canvas with concurrent fetches, applies per-pixel transforms across the
//! canvas on a worker pool, and runs windowed passes (resizing, region
//! statistics) over the result.
//!
//! ## Features
//!
//! - **Concurrent assembly**: Sequential, async task, or blocking-pool fetch modes
//! - **Failure isolation**: Unreadable tiles and failing batches are reported, not fatal
//! - **Bounded memory**: Transform batches are materialised one super-batch at a time
//! - **Pluggable storage**: Local directories or S3-compatible object storage
//!
//! ## Architecture
//!
//! - [`mosaic`] - Container trait, tile index and canvas planner
//! - [`assemble`] - Tile fetcher and mosaic assembler
//! - [`transform`] - Batch grid and parallel transform engine
//! - [`window`] - Sliding windows, tiled resize and region statistics
//! - [`io`] - Byte stores for manifest-backed containers
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use wsi_mosaic::{
//!     AssembleConfig, BatchTransformEngine, BoundingBox, InMemoryMosaic, MosaicAssembler,
//!     TransformConfig, tile_fn,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let mosaic = InMemoryMosaic::builder(3)
//!         .tile_fn(BoundingBox::new(0, 0, 256, 256), |x, y, _| (x + y) as u16)
//!         .tile_fn(BoundingBox::new(256, 0, 256, 256), |x, y, _| (x + y) as u16)
//!         .build();
//!
//!     let assembly = MosaicAssembler::new(AssembleConfig::default())
//!         .assemble(Arc::new(mosaic))
//!         .await
//!         .unwrap();
//!
//!     let engine = BatchTransformEngine::new(TransformConfig::new(128, 2, 4));
//!     let output = engine
//!         .transform(
//!             assembly.canvas,
//!             tile_fn(|tile: ndarray::ArrayView3<'_, u16>| Ok(tile.mapv(|v| v / 2))),
//!         )
//!         .unwrap();
//!
//!     assert_eq!(output.canvas.dim(), (256, 512, 3));
//! }
//! ```

pub mod assemble;
pub mod config;
pub mod error;
pub mod io;
pub mod mosaic;
pub mod progress;
pub mod transform;
pub mod window;

// Re-export commonly used types
pub use assemble::{AssembleConfig, Assembly, AssemblyReport, MosaicAssembler, TileBuffer};
pub use config::{ConcurrencyMode, Config, ConfigError};
pub use error::{
    IoError, MosaicError, TileReadError, TileReadErrorKind, TransformError, TransformErrorKind,
    TransformSetupError, WindowError,
};
pub use io::{create_s3_client, LocalTileStore, S3TileStore, TileStore};
pub use mosaic::{
    find_overlaps, list_tiles, plan, BoundingBox, CanvasPlan, InMemoryMosaic, ManifestMosaic,
    MosaicContainer, Pixel, Rect, TileOverlap, TileRecord,
};
pub use progress::Progress;
pub use transform::{
    batch_grid, tile_fn, BatchDescriptor, BatchTransformEngine, BoxError, TileTransform,
    TransformConfig, TransformOutput,
};
pub use window::{
    masked_windows, region_statistics, resize_tiled, summarize, windows, RegionStats,
    RegionSummary, WindowDescriptor, WindowGrid,
};
