//! Manifest-backed mosaic integration tests.
//!
//! Tests verify:
//! - End-to-end assembly from PNG tiles on local disk
//! - Missing tile objects become per-tile failures
//! - Malformed manifests fail before any tile is read

use std::sync::Arc;

use ndarray::s;

use wsi_mosaic::assemble::{AssembleConfig, MosaicAssembler};
use wsi_mosaic::config::ConcurrencyMode;
use wsi_mosaic::error::{IoError, MosaicError, TileReadErrorKind};
use wsi_mosaic::io::LocalTileStore;
use wsi_mosaic::mosaic::{ManifestMosaic, MosaicContainer};

use super::test_utils::{
    expected_canvas, gradient_png, manifest_json, write_grid_manifest, MockTileStore,
};

#[tokio::test]
async fn test_local_manifest_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_grid_manifest(dir.path(), 12, (300, -40));

    let mosaic = ManifestMosaic::open(LocalTileStore::new(dir.path()), &manifest)
        .await
        .unwrap();
    assert_eq!(mosaic.channels(), 3);
    assert_eq!(mosaic.tile_indices().unwrap(), vec![0, 1, 2, 3]);

    let assembly = MosaicAssembler::new(AssembleConfig::with_workers(
        ConcurrencyMode::ProcessPool,
        2,
    ))
    .assemble(Arc::new(mosaic))
    .await
    .unwrap();

    assert!(assembly.is_complete());
    assert_eq!(assembly.plan.origin, (300, -40));
    assert_eq!(assembly.canvas, expected_canvas(24, 24, 3, (300, -40)));
}

#[tokio::test]
async fn test_missing_tile_object_is_reported() {
    let json = manifest_json(
        3,
        &[
            (0, 0, 8, 8, "tiles/a.png"),
            (8, 0, 8, 8, "tiles/missing.png"),
        ],
    );
    let store = MockTileStore::new()
        .with_object("run1/manifest.json", json)
        .with_object("run1/tiles/a.png", gradient_png(8, 8, (0, 0)));

    let mosaic = ManifestMosaic::open(store.clone(), "run1/manifest.json")
        .await
        .unwrap();
    let assembly = MosaicAssembler::new(AssembleConfig::default())
        .assemble(Arc::new(mosaic))
        .await
        .unwrap();

    assert_eq!(assembly.failed_indices(), vec![1]);
    assert!(matches!(
        assembly.failures[0].kind,
        TileReadErrorKind::Io(_)
    ));
    assert!(assembly
        .canvas
        .slice(s![.., 8..16, ..])
        .iter()
        .all(|&v| v == 0));
    assert_eq!(
        assembly.canvas.slice(s![.., 0..8, ..]),
        expected_canvas(8, 8, 3, (0, 0))
    );

    assert_eq!(store.request_count("run1/tiles/missing.png").await, 1);
}

#[tokio::test]
async fn test_undecodable_tile_is_reported() {
    let json = manifest_json(1, &[(0, 0, 4, 4, "t.png")]);
    let store = MockTileStore::new()
        .with_object("m.json", json)
        .with_object("t.png", &b"not an image"[..]);

    let mosaic = ManifestMosaic::open(store, "m.json").await.unwrap();
    let assembly = MosaicAssembler::new(AssembleConfig::sequential())
        .assemble(Arc::new(mosaic))
        .await
        .unwrap();

    assert!(matches!(
        assembly.failures[0].kind,
        TileReadErrorKind::Decode(_)
    ));
}

#[tokio::test]
async fn test_manifest_without_tiles_is_container_error() {
    let store = MockTileStore::new().with_object("m.json", r#"{"channels": 3}"#);
    let result = ManifestMosaic::open(store, "m.json").await;
    assert!(matches!(result, Err(MosaicError::ContainerFormat { .. })));
}

#[tokio::test]
async fn test_missing_manifest_is_io_error() {
    let result = ManifestMosaic::open(MockTileStore::new(), "absent.json").await;
    assert!(matches!(
        result,
        Err(MosaicError::Io(IoError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_undecodable_channel_count_is_rejected_before_reads() {
    let json = manifest_json(2, &[(0, 0, 8, 8, "tiles/a.png")]);
    let store = MockTileStore::new()
        .with_object("run2/manifest.json", json)
        .with_object("run2/tiles/a.png", gradient_png(8, 8, (0, 0)));

    let result = ManifestMosaic::open(store.clone(), "run2/manifest.json").await;
    assert!(matches!(result, Err(MosaicError::ContainerFormat { .. })));
    assert_eq!(store.request_count("run2/tiles/a.png").await, 0);
}
