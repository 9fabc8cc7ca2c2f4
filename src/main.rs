//! WSI Mosaic - Reconstruct tiled mosaic microscopy images.
//!
//! This binary opens a tile manifest from local disk or S3, plans or
//! assembles the mosaic, and prints a JSON report to stdout. Logs go to
//! stderr.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ndarray::{s, ArrayView2};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_mosaic::{
    assemble::{AssembleConfig, Assembly, AssemblyReport, MosaicAssembler},
    config::{AssembleArgs, Command, Config},
    error::WindowError,
    io::{create_s3_client, LocalTileStore, S3TileStore, TileStore},
    mosaic::{
        find_overlaps, list_tiles, plan, CanvasPlan, ManifestMosaic, MosaicContainer, TileOverlap,
    },
    window::{region_statistics, summarize, RegionSummary},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match (&config.command, &config.s3_bucket) {
        (Command::Plan(_), Some(bucket)) => {
            let store = s3_store(&config, bucket).await;
            run_plan(store, config.manifest()).await
        }
        (Command::Plan(_), None) => {
            let (root, key) = config.local_root_and_key();
            run_plan(LocalTileStore::new(root), &key).await
        }
        (Command::Assemble(args), Some(bucket)) => {
            let store = s3_store(&config, bucket).await;
            run_assemble(store, config.manifest(), args).await
        }
        (Command::Assemble(args), None) => {
            let (root, key) = config.local_root_and_key();
            run_assemble(LocalTileStore::new(root), &key, args).await
        }
    }
}

async fn s3_store(config: &Config, bucket: &str) -> S3TileStore {
    info!("S3 bucket: {}", bucket);
    if let Some(ref endpoint) = config.s3_endpoint {
        info!("S3 endpoint: {}", endpoint);
    }
    info!("S3 region: {}", config.s3_region);

    let client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;
    S3TileStore::new(client, bucket.to_string())
}

// =============================================================================
// Plan Command
// =============================================================================

#[derive(Serialize)]
struct PlanOutput<'a> {
    mosaic: &'a str,
    channels: usize,
    tiles: usize,
    plan: CanvasPlan,
    overlaps: Vec<TileOverlap>,
}

async fn run_plan<S: TileStore>(store: S, manifest: &str) -> ExitCode {
    let mosaic = match ManifestMosaic::open(store, manifest).await {
        Ok(mosaic) => mosaic,
        Err(e) => {
            error!("Failed to open {}: {}", manifest, e);
            return ExitCode::FAILURE;
        }
    };

    let planned = list_tiles(&mosaic, None).and_then(|tiles| Ok((plan(&tiles)?, tiles)));
    let (canvas_plan, tiles) = match planned {
        Ok(planned) => planned,
        Err(e) => {
            error!("Failed to plan {}: {}", mosaic.identifier(), e);
            return ExitCode::FAILURE;
        }
    };

    let output = PlanOutput {
        mosaic: mosaic.identifier(),
        channels: mosaic.channels(),
        tiles: tiles.len(),
        plan: canvas_plan,
        overlaps: find_overlaps(&tiles),
    };
    print_json(&output)
}

// =============================================================================
// Assemble Command
// =============================================================================

#[derive(Serialize)]
struct AssembleOutput {
    #[serde(flatten)]
    report: AssemblyReport,

    #[serde(skip_serializing_if = "Option::is_none")]
    channel_stats: Option<Vec<RegionSummary>>,
}

async fn run_assemble<S: TileStore + 'static>(
    store: S,
    manifest: &str,
    args: &AssembleArgs,
) -> ExitCode {
    let mosaic = match ManifestMosaic::open(store, manifest).await {
        Ok(mosaic) => mosaic,
        Err(e) => {
            error!("Failed to open {}: {}", manifest, e);
            return ExitCode::FAILURE;
        }
    };

    let assembler = MosaicAssembler::new(AssembleConfig {
        mode: args.mode,
        workers: args.workers,
        max_tiles: args.max_tiles,
    });

    let assembly = match assembler.assemble(Arc::new(mosaic)).await {
        Ok(assembly) => assembly,
        Err(e) => {
            error!("Assembly failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if !assembly.is_complete() {
        warn!(
            "{} tile(s) could not be read: {:?}",
            assembly.failures.len(),
            assembly.failed_indices()
        );
    }

    let channel_stats = match args.stats_tile {
        Some(tile_size) => match channel_statistics(&assembly, tile_size, args.stats_overlap) {
            Ok(stats) => Some(stats),
            Err(e) => {
                error!("Failed to compute statistics: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    print_json(&AssembleOutput {
        report: assembly.report(),
        channel_stats,
    })
}

/// Windowed totals for each channel of the canvas.
fn channel_statistics(
    assembly: &Assembly,
    tile_size: usize,
    overlap: usize,
) -> Result<Vec<RegionSummary>, WindowError> {
    let channels = assembly.canvas.dim().2;
    (0..channels)
        .map(|c| {
            let plane = assembly.canvas.slice(s![.., .., c]);
            let stats = region_statistics(plane, None::<ArrayView2<'_, u8>>, tile_size, overlap)?;
            Ok(summarize(&stats))
        })
        .collect()
}

// =============================================================================
// Helpers
// =============================================================================

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to serialize report: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with tracing-subscriber.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_mosaic=debug"
    } else {
        "wsi_mosaic=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
