//! Configuration management for WSI Mosaic.
//!
//! This module provides:
//! - Command-line arguments via clap, with subcommands for planning and
//!   assembling a mosaic
//! - Environment variables with `WSI_MOSAIC_` prefix
//! - Defaults shared by the library configuration types
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use wsi_mosaic::config::Config;
//!
//! let config = Config::parse();
//! config.validate()?;
//! ```
//!
//! # Environment Variables
//!
//! - `WSI_MOSAIC_S3_BUCKET` - Read manifests and tiles from this bucket
//! - `WSI_MOSAIC_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `WSI_MOSAIC_S3_REGION` - AWS region (default: us-east-1)
//! - `WSI_MOSAIC_MANIFEST` - Manifest path (or key when reading from S3)
//! - `WSI_MOSAIC_MODE` - Concurrency mode (default: thread-pool)
//! - `WSI_MOSAIC_WORKERS` - Concurrent fetches (default: available parallelism)
//! - `WSI_MOSAIC_MAX_TILES` - Only assemble the first N tiles

use std::num::NonZeroUsize;
use std::path::Path;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Default Values
// =============================================================================

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default edge length of a transform batch.
pub const DEFAULT_TILE_SIZE: usize = 4096;

/// Default number of batches materialised at once by the transform engine.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Number of workers to use when none is configured.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

// =============================================================================
// Concurrency Mode
// =============================================================================

/// How tile fetches are scheduled during assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConcurrencyMode {
    /// One fetch at a time, in container order
    Sequential,

    /// Concurrent async fetches with decoding inline
    #[default]
    ThreadPool,

    /// Concurrent async fetches with decoding on the blocking pool
    ProcessPool,
}

// =============================================================================
// Errors
// =============================================================================

/// Invalid command-line or library configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be greater than 0")]
    Zero { name: &'static str },

    #[error("stats_overlap ({overlap}) must be smaller than stats_tile ({tile})")]
    StatsOverlap { tile: usize, overlap: usize },

    #[error("manifest path is required. Set --manifest or WSI_MOSAIC_MANIFEST")]
    MissingManifest,

    #[error("S3 bucket name is empty")]
    EmptyBucket,
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// WSI Mosaic - Reconstruct tiled mosaic microscopy images.
///
/// Reads a JSON tile manifest from a local directory or S3, reconstructs the
/// mosaic into a single canvas, and reports failed tiles and optional
/// per-window statistics.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-mosaic")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    // =========================================================================
    // S3 Configuration
    // =========================================================================
    /// Read the manifest and tiles from this S3 bucket instead of the local
    /// filesystem.
    #[arg(long, global = true, env = "WSI_MOSAIC_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, global = true, env = "WSI_MOSAIC_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, global = true, default_value = DEFAULT_REGION, env = "WSI_MOSAIC_S3_REGION")]
    pub s3_region: String,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the canvas plan and overlapping tiles without reading pixels.
    Plan(PlanArgs),

    /// Reconstruct the mosaic and print a JSON report.
    Assemble(AssembleArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Manifest path, or object key when reading from S3.
    #[arg(long, env = "WSI_MOSAIC_MANIFEST")]
    pub manifest: String,
}

#[derive(Args, Debug, Clone)]
pub struct AssembleArgs {
    /// Manifest path, or object key when reading from S3.
    #[arg(long, env = "WSI_MOSAIC_MANIFEST")]
    pub manifest: String,

    /// Concurrency mode for tile fetches.
    #[arg(long, value_enum, default_value_t = ConcurrencyMode::ThreadPool, env = "WSI_MOSAIC_MODE")]
    pub mode: ConcurrencyMode,

    /// Maximum number of fetches in flight.
    #[arg(short, long, default_value_t = default_workers(), env = "WSI_MOSAIC_WORKERS")]
    pub workers: usize,

    /// Only assemble the first N tiles.
    #[arg(long, env = "WSI_MOSAIC_MAX_TILES")]
    pub max_tiles: Option<usize>,

    /// Window size for per-channel statistics in the report.
    ///
    /// Statistics are skipped when not set.
    #[arg(long)]
    pub stats_tile: Option<usize>,

    /// Overlap between statistics windows.
    #[arg(long, default_value_t = 0)]
    pub stats_overlap: usize,
}

impl Config {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(bucket) = &self.s3_bucket {
            if bucket.is_empty() {
                return Err(ConfigError::EmptyBucket);
            }
        }

        match &self.command {
            Command::Plan(args) => validate_manifest(&args.manifest),
            Command::Assemble(args) => args.validate(),
        }
    }

    /// Manifest named by the active subcommand.
    pub fn manifest(&self) -> &str {
        match &self.command {
            Command::Plan(args) => &args.manifest,
            Command::Assemble(args) => &args.manifest,
        }
    }

    /// Split the manifest location into a store root and a key within it.
    ///
    /// Locally the store is rooted at the manifest's directory so tile paths
    /// resolve next to it; on S3 the key is used as given.
    pub fn local_root_and_key(&self) -> (&Path, String) {
        let path = Path::new(self.manifest());
        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let key = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        (root, key)
    }
}

impl AssembleArgs {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_manifest(&self.manifest)?;

        if self.workers == 0 {
            return Err(ConfigError::Zero { name: "workers" });
        }
        if self.max_tiles == Some(0) {
            return Err(ConfigError::Zero { name: "max_tiles" });
        }
        if let Some(tile) = self.stats_tile {
            if tile == 0 {
                return Err(ConfigError::Zero { name: "stats_tile" });
            }
            if self.stats_overlap >= tile {
                return Err(ConfigError::StatsOverlap {
                    tile,
                    overlap: self.stats_overlap,
                });
            }
        }

        Ok(())
    }
}

fn validate_manifest(manifest: &str) -> Result<(), ConfigError> {
    if manifest.trim().is_empty() {
        return Err(ConfigError::MissingManifest);
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
