//! Mosaic reconstruction.
//!
//! [`MosaicAssembler`] lists a container's tiles, plans the canvas and
//! fetches every tile under the configured [`ConcurrencyMode`], writing each
//! into one owned canvas as it arrives.
//!
//! [`ConcurrencyMode`]: crate::config::ConcurrencyMode

mod assembler;
mod fetcher;

pub use assembler::{AssembleConfig, Assembly, AssemblyReport, MosaicAssembler};
pub use fetcher::{fetch, reshape, TileBuffer};
