//! Mosaic container abstraction.
//!
//! This module provides a unified interface for tiled mosaic images
//! regardless of where their tiles are stored, plus the tile index and
//! canvas planner that sit on top of it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            MosaicAssembler              │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │   list_tiles    │    │       plan          │
//! │  (TileIndex)    │    │  (CanvasPlanner)    │
//! └────────┬────────┘    └─────────────────────┘
//!          │
//!          ▼
//! ┌─────────────────────────────────────────┐
//! │        MosaicContainer Trait            │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │ InMemoryMosaic  │    │  ManifestMosaic     │
//! │                 │    │  (JSON + TileStore) │
//! └─────────────────┘    └─────────────────────┘
//! ```

mod container;
mod index;
mod manifest;
mod memory;
mod planner;
mod types;

pub use container::{MosaicContainer, Pixel};
pub use index::list_tiles;
pub use manifest::{ManifestMosaic, ManifestTile};
pub use memory::{InMemoryMosaic, InMemoryMosaicBuilder};
pub use planner::{find_overlaps, plan, CanvasPlan, TileOverlap};
pub use types::{BoundingBox, Rect, TileRecord};
