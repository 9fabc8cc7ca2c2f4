use serde::Serialize;
use thiserror::Error;

use crate::transform::BatchDescriptor;

/// I/O errors that can occur when reading tile data from storage
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Local filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),
}

/// Fatal errors raised while opening or indexing a mosaic.
///
/// These abort the whole operation before any tile is scheduled.
#[derive(Debug, Clone, Error)]
pub enum MosaicError {
    /// I/O error while opening the container
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Required mosaic dimension or metadata is missing or malformed
    #[error("Container format error: {reason}")]
    ContainerFormat { reason: String },

    /// The container holds no tiles
    #[error("Mosaic contains no tiles")]
    EmptyTileSet,
}

/// What went wrong while reading a single tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TileReadErrorKind {
    /// Storage read failed
    #[error("I/O failure: {0}")]
    Io(String),

    /// Pixel payload could not be decoded
    #[error("decode failure: {0}")]
    Decode(String),

    /// Pixel buffer does not match the tile bounding box or canvas channels
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    /// The container has no tile with this index
    #[error("no such tile")]
    MissingTile,

    /// The fetch task itself died before returning
    #[error("fetch task aborted: {0}")]
    Aborted(String),
}

/// Non-fatal failure of one tile read.
///
/// The assembler skips the tile and leaves its canvas region zero-filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("tile {index}: {kind}")]
pub struct TileReadError {
    /// Container index of the failed tile
    pub index: usize,

    /// Failure detail
    pub kind: TileReadErrorKind,
}

impl TileReadError {
    pub fn new(index: usize, kind: TileReadErrorKind) -> Self {
        Self { index, kind }
    }
}

/// What went wrong while transforming a single batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TransformErrorKind {
    /// The transform returned an error
    #[error("transform failed: {0}")]
    Failed(String),

    /// The transform panicked on a worker
    #[error("transform panicked: {0}")]
    Panicked(String),

    /// The transform returned an array of the wrong shape
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },
}

/// Non-fatal failure of one transform batch.
///
/// The batch's output region stays zero-filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("batch {batch}: {kind}")]
pub struct TransformError {
    /// Region of the failed batch
    pub batch: BatchDescriptor,

    /// Failure detail
    pub kind: TransformErrorKind,
}

/// Fatal errors raised before a transform run starts.
#[derive(Debug, Clone, Error)]
pub enum TransformSetupError {
    /// Tile size, worker count or batch size is invalid
    #[error("Invalid transform configuration: {0}")]
    InvalidConfig(String),

    /// The worker pool could not be created
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// Errors raised when constructing a window grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// Tile size must be positive
    #[error("Tile size must be greater than 0")]
    ZeroTileSize,

    /// Overlap must leave a positive step
    #[error("Overlap {overlap} must be smaller than tile size {tile_size}")]
    OverlapTooLarge { tile_size: usize, overlap: usize },

    /// Windows need at least a row and a column axis
    #[error("Array has {ndim} axes, windows need at least 2")]
    TooFewAxes { ndim: usize },

    /// Resampling needs a non-empty source
    #[error("Cannot resample an empty array")]
    EmptyArray,

    /// Mask does not share the array's spatial shape
    #[error("Mask shape {mask:?} does not match array shape {array:?}")]
    MaskShapeMismatch {
        array: (usize, usize),
        mask: (usize, usize),
    },
}
