//! Batch transform integration tests.
//!
//! Tests verify:
//! - Batched parallel output equals direct whole-array application
//! - Results do not depend on tile size, batch size or worker count
//! - Failing batches are isolated
//! - Assembled canvases flow through the engine unchanged in shape

use std::sync::Arc;

use ndarray::{s, Array3, ArrayView3};
use proptest::prelude::*;

use wsi_mosaic::assemble::{AssembleConfig, MosaicAssembler};
use wsi_mosaic::error::TransformErrorKind;
use wsi_mosaic::progress::Progress;
use wsi_mosaic::transform::{
    batch_grid, tile_fn, BatchTransformEngine, BoxError, TileTransform, TransformConfig,
};

use super::test_utils::grid_mosaic;

/// Optical-density style pixel map from 3 channels to 2.
struct Unmix;

impl TileTransform<u16, f32> for Unmix {
    fn output_channels(&self, _input_channels: usize) -> usize {
        2
    }

    fn apply(&self, tile: ArrayView3<'_, u16>) -> Result<Array3<f32>, BoxError> {
        let (h, w, _) = tile.dim();
        Ok(Array3::from_shape_fn((h, w, 2), |(y, x, c)| {
            let r = f32::from(tile[[y, x, 0]]);
            let g = f32::from(tile[[y, x, 1]]);
            let b = f32::from(tile[[y, x, 2]]);
            if c == 0 {
                0.6 * r + 0.3 * g + 0.1 * b
            } else {
                0.2 * r - 0.5 * g + 0.3 * b
            }
        }))
    }
}

fn sample_canvas(height: usize, width: usize) -> Array3<u16> {
    Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
        ((y * 31 + x * 17 + c * 1013) % 4096) as u16
    })
}

#[test]
fn test_parallel_batches_equal_direct_application() {
    let input = sample_canvas(100, 100);
    let direct = Unmix.apply(input.view()).unwrap();

    let progress = Progress::new();
    let engine =
        BatchTransformEngine::new(TransformConfig::new(30, 3, 4)).with_progress(progress.clone());
    let output = engine.transform(input, Unmix).unwrap();

    assert_eq!(output.batches, 16);
    assert_eq!(batch_grid(100, 100, 30).len(), 16);
    assert!(output.is_complete());
    assert_eq!(output.canvas, direct);
    assert_eq!(progress.completed(), 16);
    assert!(progress.is_done());
}

#[test]
fn test_isolated_failures_do_not_cancel_siblings() {
    let input = sample_canvas(40, 40);
    let flaky = tile_fn(|tile: ArrayView3<'_, u16>| -> Result<Array3<u16>, BoxError> {
        // Batches whose first pixel is a multiple of 3 fail
        if tile[[0, 0, 0]] % 3 == 0 {
            return Err("batch rejected".into());
        }
        Ok(tile.mapv(|v| v + 1))
    });

    let output = BatchTransformEngine::new(TransformConfig::new(10, 4, 3))
        .transform(input.clone(), flaky)
        .unwrap();

    assert_eq!(output.batches, 16);
    assert!(!output.failures.is_empty());
    assert!(output.failures.len() < 16);

    for batch in batch_grid(40, 40, 10) {
        let rows = batch.row_start..batch.row_end;
        let cols = batch.col_start..batch.col_end;
        let failed = output.failures.iter().any(|f| f.batch == batch);
        let out = output.canvas.slice(s![rows.clone(), cols.clone(), ..]);
        if failed {
            assert!(out.iter().all(|&v| v == 0), "batch {}", batch);
        } else {
            let expected = input.slice(s![rows, cols, ..]).mapv(|v| v + 1);
            assert_eq!(out, expected, "batch {}", batch);
        }
    }
    assert!(output
        .failures
        .iter()
        .all(|f| f.kind == TransformErrorKind::Failed("batch rejected".to_string())));
}

#[test]
fn test_failures_serialize_for_retry() {
    let input = sample_canvas(8, 8);
    let reject_all = tile_fn(|_: ArrayView3<'_, u16>| -> Result<Array3<u16>, BoxError> {
        Err("rejected".into())
    });

    let output = BatchTransformEngine::new(TransformConfig::new(4, 2, 2))
        .transform(input, reject_all)
        .unwrap();

    let json = serde_json::to_value(&output.failures).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 4);
    assert_eq!(json[0]["kind"]["kind"], "failed");
    assert!(json[0]["batch"]["row_end"].is_u64());
}

#[tokio::test]
async fn test_assembled_canvas_through_engine() {
    let mosaic = Arc::new(grid_mosaic(3, 3, 12, 3, (5, -5)));
    let assembly = MosaicAssembler::new(AssembleConfig::default())
        .assemble(mosaic)
        .await
        .unwrap();
    let direct = Unmix.apply(assembly.canvas.view()).unwrap();

    let output = tokio::task::spawn_blocking(move || {
        BatchTransformEngine::new(TransformConfig::new(7, 2, 5)).transform(assembly.canvas, Unmix)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(output.canvas.dim(), (36, 36, 2));
    assert_eq!(output.canvas, direct);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Batching never changes the result of a pixel-wise transform.
    #[test]
    fn prop_batching_is_semantics_neutral(
        height in 1usize..40,
        width in 1usize..40,
        tile_size in 1usize..16,
        workers in 1usize..5,
        batch_size in 1usize..6,
    ) {
        let input = sample_canvas(height, width);
        let direct = Unmix.apply(input.view()).unwrap();

        let output = BatchTransformEngine::new(TransformConfig::new(tile_size, workers, batch_size))
            .transform(input, Unmix)
            .unwrap();

        prop_assert!(output.is_complete());
        prop_assert_eq!(output.batches, height.div_ceil(tile_size) * width.div_ceil(tile_size));
        prop_assert_eq!(output.canvas, direct);
    }
}
