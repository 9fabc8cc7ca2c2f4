//! Batched parallel transform engine.
//!
//! The engine applies an opaque per-tile transform over a whole canvas by
//! splitting it into a grid of batches.
//!
//! # Architecture
//!
//! ```text
//!   input canvas ──► batch_grid ──► [b0, b1, ... bn]   (row-major)
//!                                       │
//!                  ┌────────────────────┴─────────────────────┐
//!                  │ workers < 2          │ workers >= 2      │
//!                  ▼                      ▼                   │
//!          apply on views,       super-batch of batch_size    │
//!          one at a time         ├─ copy sub-arrays           │
//!                  │             ├─ spawn on rayon pool ──────┤
//!                  │             └─ recv (batch, result) ◄────┘ flume
//!                  ▼                      ▼
//!           ┌──────────────────────────────────────┐
//!           │ calling thread writes output canvas  │
//!           └──────────────────────────────────────┘
//! ```
//!
//! Workers never see the output canvas. Each one sends its result back over
//! a channel and the calling thread merges it, so there is exactly one
//! writer. Only one super-batch of sub-arrays is materialised at a time.

use std::panic::{catch_unwind, AssertUnwindSafe};

use ndarray::{s, Array3, ArrayView3, Ix3, SliceInfo, SliceInfoElem};
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};

use crate::config::{default_workers, DEFAULT_BATCH_SIZE, DEFAULT_TILE_SIZE};
use crate::error::{TransformError, TransformErrorKind, TransformSetupError};
use crate::progress::Progress;

use super::grid::{batch_grid, BatchDescriptor};

/// Error type returned by transforms.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Transform Trait
// =============================================================================

/// A function from one channel-last tile to another.
///
/// The output must keep the tile's height and width. Its channel count is
/// given by [`output_channels`](TileTransform::output_channels), which
/// defaults to the input's.
pub trait TileTransform<A, B>: Send + Sync {
    /// Channels produced for an input with `input_channels` channels.
    fn output_channels(&self, input_channels: usize) -> usize {
        input_channels
    }

    fn apply(&self, tile: ArrayView3<'_, A>) -> Result<Array3<B>, BoxError>;
}

/// A [`TileTransform`] backed by a closure.
#[derive(Debug, Clone)]
pub struct FnTransform<F> {
    f: F,
    output_channels: Option<usize>,
}

/// Wrap a closure as a [`TileTransform`].
///
/// ```
/// use wsi_mosaic::transform::tile_fn;
///
/// let invert = tile_fn(|tile: ndarray::ArrayView3<'_, u16>| Ok(tile.mapv(|v| u16::MAX - v)));
/// ```
pub fn tile_fn<A, B, F>(f: F) -> FnTransform<F>
where
    F: Fn(ArrayView3<'_, A>) -> Result<Array3<B>, BoxError> + Send + Sync,
{
    FnTransform {
        f,
        output_channels: None,
    }
}

impl<F> FnTransform<F> {
    /// Declare a fixed output channel count.
    pub fn with_output_channels(mut self, channels: usize) -> Self {
        self.output_channels = Some(channels);
        self
    }
}

impl<A, B, F> TileTransform<A, B> for FnTransform<F>
where
    F: Fn(ArrayView3<'_, A>) -> Result<Array3<B>, BoxError> + Send + Sync,
{
    fn output_channels(&self, input_channels: usize) -> usize {
        self.output_channels.unwrap_or(input_channels)
    }

    fn apply(&self, tile: ArrayView3<'_, A>) -> Result<Array3<B>, BoxError> {
        (self.f)(tile)
    }
}

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformConfig {
    /// Edge length of a batch in pixels
    pub tile_size: usize,

    /// Worker threads; fewer than 2 runs sequentially on the calling thread
    pub workers: usize,

    /// Batches materialised and in flight at once
    pub batch_size: usize,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            workers: default_workers(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl TransformConfig {
    pub fn new(tile_size: usize, workers: usize, batch_size: usize) -> Self {
        Self {
            tile_size,
            workers,
            batch_size,
        }
    }

    pub fn validate(&self) -> Result<(), TransformSetupError> {
        if self.tile_size == 0 {
            return Err(TransformSetupError::InvalidConfig(
                "tile_size must be greater than 0".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(TransformSetupError::InvalidConfig(
                "workers must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(TransformSetupError::InvalidConfig(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Output
// =============================================================================

/// Result of a transform run.
#[derive(Debug)]
pub struct TransformOutput<B> {
    /// Output of shape `(H, W, output_channels)`
    pub canvas: Array3<B>,

    /// Batches whose region was left at `B::default()`
    pub failures: Vec<TransformError>,

    /// Number of batches the canvas was split into
    pub batches: usize,
}

impl<B> TransformOutput<B> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Applies a [`TileTransform`] over a canvas in batches.
#[derive(Debug, Clone)]
pub struct BatchTransformEngine {
    config: TransformConfig,
    progress: Progress,
}

impl BatchTransformEngine {
    pub fn new(config: TransformConfig) -> Self {
        Self {
            config,
            progress: Progress::new(),
        }
    }

    /// Report merged batches through an existing progress handle.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Transform `input` batch by batch into a new canvas.
    ///
    /// Failing batches do not stop the run; they are returned in
    /// [`TransformOutput::failures`], in row-major batch order, and their
    /// output region keeps the default value.
    ///
    /// # Errors
    ///
    /// Returns [`TransformSetupError`] before any batch runs if the
    /// configuration is invalid or the worker pool cannot be built.
    pub fn transform<A, B, F>(
        &self,
        input: Array3<A>,
        transform: F,
    ) -> Result<TransformOutput<B>, TransformSetupError>
    where
        A: Clone + Send + Sync,
        B: Clone + Default + Send,
        F: TileTransform<A, B>,
    {
        self.config.validate()?;

        let (height, width, channels) = input.dim();
        let out_channels = transform.output_channels(channels);
        let batches = batch_grid(height, width, self.config.tile_size);

        info!(
            "Transforming {}x{}x{} canvas in {} batch(es) of {}px ({} worker(s))",
            width,
            height,
            channels,
            batches.len(),
            self.config.tile_size,
            self.config.workers
        );

        let mut run = MergeState {
            output: Array3::default((height, width, out_channels)),
            out_channels,
            failures: Vec::new(),
            progress: &self.progress,
        };
        self.progress.reset(batches.len());

        if self.config.workers < 2 {
            for batch in &batches {
                let result = run_batch(&transform, input.slice(region(batch)));
                run.merge(*batch, result);
            }
        } else {
            self.transform_parallel(&input, &transform, &batches, &mut run)?;
        }

        let mut failures = run.failures;
        failures.sort_by_key(|f| (f.batch.row_start, f.batch.col_start));
        info!(
            "Transformed {}/{} batch(es), {} failure(s)",
            batches.len() - failures.len(),
            batches.len(),
            failures.len()
        );

        Ok(TransformOutput {
            canvas: run.output,
            failures,
            batches: batches.len(),
        })
    }

    fn transform_parallel<A, B, F>(
        &self,
        input: &Array3<A>,
        transform: &F,
        batches: &[BatchDescriptor],
        run: &mut MergeState<'_, B>,
    ) -> Result<(), TransformSetupError>
    where
        A: Clone + Send + Sync,
        B: Clone + Default + Send,
        F: TileTransform<A, B>,
    {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("transform-{}", i))
            .build()
            .map_err(|e| TransformSetupError::WorkerPool(e.to_string()))?;

        for chunk in batches.chunks(self.config.batch_size) {
            // Materialise the whole super-batch before any worker starts
            let owned: Vec<(BatchDescriptor, Array3<A>)> = chunk
                .iter()
                .map(|batch| (*batch, input.slice(region(batch)).to_owned()))
                .collect();

            let (tx, rx) = flume::unbounded();

            pool.in_place_scope(|scope| {
                for (batch, tile) in owned {
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        let result = run_batch(transform, tile.view());
                        let _ = tx.send((batch, result));
                    });
                }
                drop(tx);

                // Merge in completion order until every worker has reported
                for (batch, result) in rx.iter() {
                    run.merge(batch, result);
                }
            });

            debug!(
                "Super-batch done [{}/{}]",
                self.progress.completed(),
                self.progress.total()
            );
        }

        Ok(())
    }
}

/// Output canvas plus bookkeeping, owned by the calling thread.
struct MergeState<'a, B> {
    output: Array3<B>,
    out_channels: usize,
    failures: Vec<TransformError>,
    progress: &'a Progress,
}

impl<B: Clone> MergeState<'_, B> {
    fn merge(&mut self, batch: BatchDescriptor, result: Result<Array3<B>, TransformErrorKind>) {
        let result = result.and_then(|tile| {
            let expected = (batch.height(), batch.width(), self.out_channels);
            if tile.dim() == expected {
                Ok(tile)
            } else {
                Err(TransformErrorKind::ShapeMismatch {
                    expected,
                    actual: tile.dim(),
                })
            }
        });

        let done = self.progress.advance();
        match result {
            Ok(tile) => {
                self.output.slice_mut(region(&batch)).assign(&tile);
                debug!("Merged batch {} [{}/{}]", batch, done, self.progress.total());
            }
            Err(kind) => {
                warn!(
                    "Batch {} failed: {} [{}/{}]",
                    batch,
                    kind,
                    done,
                    self.progress.total()
                );
                self.failures.push(TransformError { batch, kind });
            }
        }
    }
}

/// Run the transform on one batch, turning errors and panics into values.
fn run_batch<A, B, F>(
    transform: &F,
    tile: ArrayView3<'_, A>,
) -> Result<Array3<B>, TransformErrorKind>
where
    F: TileTransform<A, B> + ?Sized,
{
    match catch_unwind(AssertUnwindSafe(|| transform.apply(tile))) {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(TransformErrorKind::Failed(e.to_string())),
        Err(payload) => Err(TransformErrorKind::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn region(batch: &BatchDescriptor) -> SliceInfo<[SliceInfoElem; 3], Ix3, Ix3> {
    s![batch.row_start..batch.row_end, batch.col_start..batch.col_end, ..]
}
