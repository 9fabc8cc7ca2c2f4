//! Mosaic assembler for reconstructing a full canvas from tiles.
//!
//! The assembler orchestrates tile reconstruction:
//! - Tile discovery and canvas planning
//! - Concurrent tile fetches under a configurable concurrency mode
//! - Writing fetched tiles into a single owned canvas
//! - Collecting per-tile failures
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       MosaicAssembler                        │
//! │  1. list_tiles        3. allocate zeroed canvas              │
//! │  2. plan              4. spawn fetches (≤ workers in flight) │
//! │                       5. merge results as they complete      │
//! └──────────────┬───────────────────────────────┬───────────────┘
//!                │ spawn                         ▲ (index, Result<TileBuffer>)
//!                ▼                               │
//!        ┌──────────────┐  ┌──────────────┐  ┌──────────────┐
//!        │ fetch task 0 │  │ fetch task 1 │  │ fetch task N │
//!        └──────────────┘  └──────────────┘  └──────────────┘
//! ```
//!
//! Fetch tasks return values; only the orchestrating loop writes into the
//! canvas, so writes never race even when tiles overlap. Overlapping tiles
//! resolve to whichever fetch completes last.

use std::collections::HashSet;
use std::sync::Arc;

use ndarray::{s, Array3};
use serde::Serialize;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::{default_workers, ConcurrencyMode};
use crate::error::{MosaicError, TileReadError, TileReadErrorKind};
use crate::mosaic::{
    find_overlaps, list_tiles, plan, CanvasPlan, MosaicContainer, Pixel, TileOverlap, TileRecord,
};
use crate::progress::Progress;

use super::fetcher::{fetch, reshape, TileBuffer};

// =============================================================================
// Configuration
// =============================================================================

/// Settings for one reconstruction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssembleConfig {
    /// How fetches are scheduled
    pub mode: ConcurrencyMode,

    /// Maximum number of fetches in flight (ignored in sequential mode)
    pub workers: usize,

    /// Only reconstruct the first `max_tiles` tiles in container order
    pub max_tiles: Option<usize>,
}

impl Default for AssembleConfig {
    fn default() -> Self {
        Self {
            mode: ConcurrencyMode::ThreadPool,
            workers: default_workers(),
            max_tiles: None,
        }
    }
}

impl AssembleConfig {
    /// One fetch at a time, in container order.
    pub fn sequential() -> Self {
        Self {
            mode: ConcurrencyMode::Sequential,
            workers: 1,
            max_tiles: None,
        }
    }

    /// `workers` concurrent fetches in the given mode.
    pub fn with_workers(mode: ConcurrencyMode, workers: usize) -> Self {
        Self {
            mode,
            workers: workers.max(1),
            max_tiles: None,
        }
    }
}

// =============================================================================
// Assembly Result
// =============================================================================

/// A reconstructed mosaic.
///
/// The canvas is returned even when some tiles failed; their regions stay
/// zero-filled and their indices are listed in `failures`.
#[derive(Debug)]
pub struct Assembly {
    /// Pixels of shape `(plan.height, plan.width, channels)`
    pub canvas: Array3<Pixel>,

    /// Placement of the mosaic on the canvas
    pub plan: CanvasPlan,

    /// Tiles that were scheduled, in container order
    pub tiles: Vec<TileRecord>,

    /// Tiles that could not be read, sorted by index
    pub failures: Vec<TileReadError>,

    /// Overlapping tile pairs (resolved last-write-wins)
    pub overlaps: Vec<TileOverlap>,
}

impl Assembly {
    /// Whether every scheduled tile was written.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Container indices of failed tiles.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }

    /// Summary without pixel data, suitable for serialization.
    pub fn report(&self) -> AssemblyReport {
        AssemblyReport {
            width: self.plan.width,
            height: self.plan.height,
            channels: self.canvas.dim().2,
            origin: self.plan.origin,
            tiles: self.tiles.len(),
            tiles_written: self.tiles.len() - self.failures.len(),
            failures: self.failures.clone(),
            overlaps: self.overlaps.clone(),
        }
    }
}

/// Serializable summary of an [`Assembly`].
#[derive(Debug, Clone, Serialize)]
pub struct AssemblyReport {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub origin: (i64, i64),
    pub tiles: usize,
    pub tiles_written: usize,
    pub failures: Vec<TileReadError>,
    pub overlaps: Vec<TileOverlap>,
}

// =============================================================================
// Mosaic Assembler
// =============================================================================

/// Reconstructs mosaics into a single canvas.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use wsi_mosaic::assemble::{AssembleConfig, MosaicAssembler};
/// use wsi_mosaic::config::ConcurrencyMode;
/// use wsi_mosaic::mosaic::{BoundingBox, InMemoryMosaic};
///
/// #[tokio::main]
/// async fn main() {
///     let mosaic = InMemoryMosaic::builder(3)
///         .tile(BoundingBox::new(0, 0, 64, 64))
///         .tile(BoundingBox::new(64, 0, 64, 64))
///         .build();
///
///     let assembler =
///         MosaicAssembler::new(AssembleConfig::with_workers(ConcurrencyMode::ThreadPool, 4));
///     let assembly = assembler.assemble(Arc::new(mosaic)).await.unwrap();
///
///     assert_eq!(assembly.canvas.dim(), (64, 128, 3));
///     assert!(assembly.is_complete());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MosaicAssembler {
    config: AssembleConfig,
    progress: Progress,
}

impl MosaicAssembler {
    pub fn new(config: AssembleConfig) -> Self {
        Self {
            config,
            progress: Progress::new(),
        }
    }

    /// Report completed fetches through an existing progress handle.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Progress of the current or last run.
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn config(&self) -> &AssembleConfig {
        &self.config
    }

    /// Reconstruct the mosaic held by `container`.
    ///
    /// # Errors
    ///
    /// Fails before any tile is fetched if the container has no mosaic
    /// dimension ([`MosaicError::ContainerFormat`]) or no tiles
    /// ([`MosaicError::EmptyTileSet`]). Individual tile failures do not fail
    /// the call; they are listed in [`Assembly::failures`].
    pub async fn assemble<C>(&self, container: Arc<C>) -> Result<Assembly, MosaicError>
    where
        C: MosaicContainer + 'static,
    {
        let tiles = list_tiles(container.as_ref(), self.config.max_tiles)?;
        let plan = plan(&tiles)?;

        let overlaps = find_overlaps(&tiles);
        if !overlaps.is_empty() {
            warn!(
                "{} overlapping tile pair(s) in {}; overlapping regions take the last written tile",
                overlaps.len(),
                container.identifier()
            );
        }

        let channels = container.channels();
        info!(
            "Assembling {} tile(s) from {} into {}x{}x{} canvas ({:?}, {} worker(s))",
            tiles.len(),
            container.identifier(),
            plan.width,
            plan.height,
            channels,
            self.config.mode,
            self.config.workers
        );

        let mut canvas = Array3::<Pixel>::zeros((plan.height, plan.width, channels));
        let mut failures = Vec::new();
        self.progress.reset(tiles.len());

        match self.config.mode {
            ConcurrencyMode::Sequential => {
                for record in &tiles {
                    let result = fetch(container.as_ref(), record, &plan).await;
                    self.merge(&mut canvas, result, &mut failures);
                }
            }
            ConcurrencyMode::ThreadPool | ConcurrencyMode::ProcessPool => {
                self.assemble_concurrent(container, &tiles, plan, &mut canvas, &mut failures)
                    .await;
            }
        }

        failures.sort_by_key(|f| f.index);
        info!(
            "Assembled {}/{} tile(s), {} failure(s)",
            tiles.len() - failures.len(),
            tiles.len(),
            failures.len()
        );

        Ok(Assembly {
            canvas,
            plan,
            tiles,
            failures,
            overlaps,
        })
    }

    /// Keep up to `workers` fetch tasks in flight, merging each as it lands.
    async fn assemble_concurrent<C>(
        &self,
        container: Arc<C>,
        tiles: &[TileRecord],
        plan: CanvasPlan,
        canvas: &mut Array3<Pixel>,
        failures: &mut Vec<TileReadError>,
    ) where
        C: MosaicContainer + 'static,
    {
        let workers = self.config.workers.max(1);
        let reshape_on_blocking_pool = self.config.mode == ConcurrencyMode::ProcessPool;
        let channels = container.channels();

        let mut pending = JoinSet::new();
        let mut outstanding = HashSet::with_capacity(tiles.len());

        for record in tiles {
            while pending.len() >= workers {
                if let Some(joined) = pending.join_next().await {
                    self.collect(joined, canvas, failures, &mut outstanding);
                }
            }

            let container = Arc::clone(&container);
            let record = *record;
            outstanding.insert(record.index);

            pending.spawn(async move {
                let result = if reshape_on_blocking_pool {
                    match container.read_tile(record.index).await {
                        Ok(raw) => tokio::task::spawn_blocking(move || {
                            reshape(&record, &plan, channels, raw)
                        })
                        .await
                        .unwrap_or_else(|e| {
                            Err(TileReadError::new(
                                record.index,
                                TileReadErrorKind::Aborted(e.to_string()),
                            ))
                        }),
                        Err(e) => Err(e),
                    }
                } else {
                    fetch(container.as_ref(), &record, &plan).await
                };
                (record.index, result)
            });
        }

        while let Some(joined) = pending.join_next().await {
            self.collect(joined, canvas, failures, &mut outstanding);
        }

        // Tasks that panicked never reported their index
        let mut lost: Vec<usize> = outstanding.into_iter().collect();
        lost.sort_unstable();
        for index in lost {
            self.merge(
                canvas,
                Err(TileReadError::new(
                    index,
                    TileReadErrorKind::Aborted("fetch task panicked".to_string()),
                )),
                failures,
            );
        }
    }

    fn collect(
        &self,
        joined: Result<(usize, Result<TileBuffer, TileReadError>), JoinError>,
        canvas: &mut Array3<Pixel>,
        failures: &mut Vec<TileReadError>,
        outstanding: &mut HashSet<usize>,
    ) {
        match joined {
            Ok((index, result)) => {
                outstanding.remove(&index);
                self.merge(canvas, result, failures);
            }
            Err(e) => error!("Fetch task failed: {}", e),
        }
    }

    /// Write one fetch result into the canvas, or record its failure.
    fn merge(
        &self,
        canvas: &mut Array3<Pixel>,
        result: Result<TileBuffer, TileReadError>,
        failures: &mut Vec<TileReadError>,
    ) {
        match result {
            Ok(buffer) => {
                write_tile(canvas, &buffer);
                let done = self.progress.advance();
                debug!(
                    "Merged tile {} at ({}, {}) [{}/{}]",
                    buffer.index,
                    buffer.rect.x,
                    buffer.rect.y,
                    done,
                    self.progress.total()
                );
            }
            Err(err) => {
                let done = self.progress.advance();
                warn!(
                    "Skipping tile {}: {} [{}/{}]",
                    err.index,
                    err.kind,
                    done,
                    self.progress.total()
                );
                failures.push(err);
            }
        }
    }
}

/// Copy a tile's pixels into its destination rectangle.
fn write_tile(canvas: &mut Array3<Pixel>, buffer: &TileBuffer) {
    let rect = buffer.rect;
    canvas
        .slice_mut(s![rect.y..rect.bottom(), rect.x..rect.right(), ..])
        .assign(&buffer.pixels);
}
