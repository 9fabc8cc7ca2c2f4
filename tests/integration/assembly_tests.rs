//! Mosaic assembly integration tests.
//!
//! Tests verify:
//! - Canvas planning and stitching for disjoint tile grids
//! - Identical canvases under every concurrency mode
//! - Failed tiles leave a zero region and are reported
//! - Bounded number of reads in flight
//! - Overlap reporting and container format errors

use std::sync::Arc;

use ndarray::s;
use proptest::prelude::*;

use wsi_mosaic::assemble::{AssembleConfig, MosaicAssembler};
use wsi_mosaic::config::ConcurrencyMode;
use wsi_mosaic::error::{MosaicError, TileReadErrorKind};
use wsi_mosaic::mosaic::{list_tiles, plan, BoundingBox, InMemoryMosaic};

use super::test_utils::{expected_canvas, gradient, grid_mosaic, DelayedMosaic, FailingMosaic};

const ALL_MODES: [ConcurrencyMode; 3] = [
    ConcurrencyMode::Sequential,
    ConcurrencyMode::ThreadPool,
    ConcurrencyMode::ProcessPool,
];

// =============================================================================
// Stitching
// =============================================================================

#[tokio::test]
async fn test_four_tiles_identical_across_modes() {
    let expected = expected_canvas(20, 20, 3, (0, 0));

    for mode in ALL_MODES {
        let mosaic = Arc::new(grid_mosaic(2, 2, 10, 3, (0, 0)));
        let assembler = MosaicAssembler::new(AssembleConfig::with_workers(mode, 4));
        let assembly = assembler.assemble(mosaic).await.unwrap();

        assert_eq!(assembly.plan.origin, (0, 0), "mode {:?}", mode);
        assert_eq!(assembly.plan.size(), (20, 20), "mode {:?}", mode);
        assert!(assembly.is_complete(), "mode {:?}", mode);
        assert_eq!(assembly.canvas, expected, "mode {:?}", mode);
    }
}

#[tokio::test]
async fn test_negative_origin_translates_tiles() {
    let origin = (-250, 1_000);
    let mosaic = Arc::new(grid_mosaic(3, 2, 16, 2, origin));

    let assembly = MosaicAssembler::new(AssembleConfig::default())
        .assemble(mosaic)
        .await
        .unwrap();

    assert_eq!(assembly.plan.origin, origin);
    assert_eq!(assembly.canvas.dim(), (32, 48, 2));
    assert_eq!(assembly.canvas, expected_canvas(48, 32, 2, origin));
}

#[tokio::test]
async fn test_out_of_order_completion_gives_same_canvas() {
    let inner = grid_mosaic(4, 4, 8, 3, (0, 0));
    let mosaic = Arc::new(DelayedMosaic::new(inner));

    let assembly = MosaicAssembler::new(AssembleConfig::with_workers(
        ConcurrencyMode::ThreadPool,
        16,
    ))
    .assemble(Arc::clone(&mosaic))
    .await
    .unwrap();

    assert_eq!(mosaic.reads(), 16);
    assert_eq!(assembly.canvas, expected_canvas(32, 32, 3, (0, 0)));
}

#[tokio::test]
async fn test_sparse_layout_leaves_gaps_zero() {
    let mosaic = InMemoryMosaic::builder(1)
        .tile_fn(BoundingBox::new(0, 0, 4, 4), gradient)
        .tile_fn(BoundingBox::new(12, 8, 4, 4), gradient)
        .build();

    let assembly = MosaicAssembler::new(AssembleConfig::sequential())
        .assemble(Arc::new(mosaic))
        .await
        .unwrap();

    assert_eq!(assembly.plan.size(), (16, 12));
    assert!(assembly
        .canvas
        .slice(s![0..8, 4..16, ..])
        .iter()
        .all(|&v| v == 0));
    assert_eq!(assembly.canvas[[9, 13, 0]], gradient(13, 9, 0));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_failing_tile_leaves_zero_region() {
    for mode in ALL_MODES {
        let mosaic = FailingMosaic::new(grid_mosaic(2, 2, 10, 3, (0, 0))).fail_tile(2);

        let assembly = MosaicAssembler::new(AssembleConfig::with_workers(mode, 3))
            .assemble(Arc::new(mosaic))
            .await
            .unwrap();

        assert_eq!(assembly.failed_indices(), vec![2], "mode {:?}", mode);
        assert!(matches!(
            assembly.failures[0].kind,
            TileReadErrorKind::Io(_)
        ));
        assert!(assembly
            .canvas
            .slice(s![10..20, 0..10, ..])
            .iter()
            .all(|&v| v == 0));

        let expected = expected_canvas(20, 20, 3, (0, 0));
        assert_eq!(
            assembly.canvas.slice(s![0..10, .., ..]),
            expected.slice(s![0..10, .., ..])
        );
        assert_eq!(
            assembly.canvas.slice(s![10..20, 10..20, ..]),
            expected.slice(s![10..20, 10..20, ..])
        );
    }
}

#[tokio::test]
async fn test_missing_mosaic_dimension_is_fatal() {
    let mosaic = FailingMosaic::new(grid_mosaic(1, 1, 10, 3, (0, 0))).plain_image();

    let result = MosaicAssembler::new(AssembleConfig::default())
        .assemble(Arc::new(mosaic))
        .await;
    assert!(matches!(result, Err(MosaicError::ContainerFormat { .. })));
}

// =============================================================================
// Concurrency Bounds
// =============================================================================

#[tokio::test]
async fn test_workers_bound_reads_in_flight() {
    for mode in [ConcurrencyMode::ThreadPool, ConcurrencyMode::ProcessPool] {
        let mosaic = Arc::new(DelayedMosaic::new(grid_mosaic(6, 4, 4, 1, (0, 0))));

        let assembly = MosaicAssembler::new(AssembleConfig::with_workers(mode, 3))
            .assemble(Arc::clone(&mosaic))
            .await
            .unwrap();

        assert!(assembly.is_complete());
        assert!(mosaic.max_in_flight() <= 3, "mode {:?}", mode);
        assert!(mosaic.max_in_flight() >= 2, "mode {:?}", mode);
    }
}

#[tokio::test]
async fn test_sequential_reads_one_at_a_time() {
    let mosaic = Arc::new(DelayedMosaic::new(grid_mosaic(3, 3, 4, 1, (0, 0))));

    MosaicAssembler::new(AssembleConfig::sequential())
        .assemble(Arc::clone(&mosaic))
        .await
        .unwrap();

    assert_eq!(mosaic.max_in_flight(), 1);
    assert_eq!(mosaic.reads(), 9);
}

// =============================================================================
// Overlaps
// =============================================================================

#[tokio::test]
async fn test_overlapping_tiles_are_reported() {
    let mosaic = InMemoryMosaic::builder(1)
        .tile_fn(BoundingBox::new(0, 0, 10, 10), |_, _, _| 1)
        .tile_fn(BoundingBox::new(8, 0, 10, 10), |_, _, _| 2)
        .tile_fn(BoundingBox::new(20, 0, 10, 10), |_, _, _| 3)
        .build();

    let assembly = MosaicAssembler::new(AssembleConfig::sequential())
        .assemble(Arc::new(mosaic))
        .await
        .unwrap();

    assert_eq!(assembly.overlaps.len(), 1);
    assert_eq!(
        (assembly.overlaps[0].first, assembly.overlaps[0].second),
        (0, 1)
    );
    // Sequential mode writes in container order
    assert_eq!(assembly.canvas[[0, 9, 0]], 2);
}

#[tokio::test]
async fn test_overlap_under_concurrency_keeps_one_writer() {
    // Which tile lands last depends on completion order, so only the
    // reported pair and a value from one of the two writers are fixed.
    for mode in [ConcurrencyMode::ThreadPool, ConcurrencyMode::ProcessPool] {
        for _ in 0..4 {
            let mosaic = InMemoryMosaic::builder(1)
                .tile_fn(BoundingBox::new(0, 0, 10, 10), |_, _, _| 1)
                .tile_fn(BoundingBox::new(6, 0, 10, 10), |_, _, _| 2)
                .tile_fn(BoundingBox::new(16, 0, 10, 10), |_, _, _| 3)
                .build();
            let mosaic = Arc::new(DelayedMosaic::new(mosaic));

            let assembly = MosaicAssembler::new(AssembleConfig::with_workers(mode, 3))
                .assemble(mosaic)
                .await
                .unwrap();

            assert!(assembly.is_complete(), "mode {:?}", mode);
            assert_eq!(assembly.overlaps.len(), 1, "mode {:?}", mode);
            assert_eq!(
                (assembly.overlaps[0].first, assembly.overlaps[0].second),
                (0, 1)
            );

            let shared = assembly.canvas.slice(s![.., 6..10, 0]);
            let winner = shared[[0usize, 0]];
            assert!(winner == 1 || winner == 2, "mode {:?}: {}", mode, winner);
            assert!(shared.iter().all(|&v| v == winner), "mode {:?}", mode);

            assert!(assembly.canvas.slice(s![.., 0..6, 0]).iter().all(|&v| v == 1));
            assert!(assembly.canvas.slice(s![.., 10..16, 0]).iter().all(|&v| v == 2));
            assert!(assembly.canvas.slice(s![.., 16..26, 0]).iter().all(|&v| v == 3));
        }
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Destination rects of a disjoint grid never overlap and stay in bounds.
    #[test]
    fn prop_grid_rects_cover_canvas_disjointly(
        cols in 1usize..6,
        rows in 1usize..6,
        tile in 1u32..9,
        ox in -50i64..50,
        oy in -50i64..50,
    ) {
        let mosaic = grid_mosaic(cols, rows, tile, 1, (ox, oy));
        let tiles = list_tiles(&mosaic, None).unwrap();
        let canvas = plan(&tiles).unwrap();

        prop_assert_eq!(canvas.size(), (cols * tile as usize, rows * tile as usize));

        let mut covered = vec![0u8; canvas.pixel_count()];
        for record in &tiles {
            let rect = canvas.place(&record.bbox);
            prop_assert!(rect.fits_within(canvas.width, canvas.height));
            for y in rect.y..rect.bottom() {
                for x in rect.x..rect.right() {
                    covered[y * canvas.width + x] += 1;
                }
            }
        }
        prop_assert!(covered.iter().all(|&n| n == 1));
    }
}
