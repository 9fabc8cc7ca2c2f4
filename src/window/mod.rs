//! Windowed passes over large arrays.
//!
//! [`WindowGrid`] lays out overlapping, edge-clipped windows over the first
//! two axes of an array. [`windows`] and [`masked_windows`] pair each window
//! with views into the data, and the resize and statistics passes are built
//! on top of them.

mod iter;
mod resize;
mod stats;

pub use iter::{
    masked_windows, windows, MaskedWindows, WindowDescriptor, WindowGrid, WindowIter, Windows,
};
pub use resize::resize_tiled;
pub use stats::{region_statistics, summarize, RegionStats, RegionSummary};
