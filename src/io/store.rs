use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;

/// Trait for fetching whole tile objects from storage.
///
/// Tile images are small relative to the mosaic, so each one is fetched in a
/// single request. Implementations must be thread-safe: several fetch tasks
/// read through the same store concurrently.
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Fetch the object stored under `key`.
    async fn get(&self, key: &str) -> Result<Bytes, IoError>;

    /// Get a unique identifier for the object under `key` (for logging).
    ///
    /// For S3, this would typically be `s3://bucket/key`.
    fn identifier(&self, key: &str) -> String;
}

/// Tile store backed by a local directory.
///
/// Keys are relative paths below the root. Keys that would escape the root
/// (absolute paths or `..` components) are rejected as not found.
#[derive(Debug, Clone)]
pub struct LocalTileStore {
    root: PathBuf,
}

impl LocalTileStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl TileStore for LocalTileStore {
    async fn get(&self, key: &str) -> Result<Bytes, IoError> {
        let path = self
            .resolve(key)
            .ok_or_else(|| IoError::NotFound(self.identifier(key)))?;

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(IoError::NotFound(self.identifier(key)))
            }
            Err(e) => Err(IoError::Filesystem(format!("{}: {}", path.display(), e))),
        }
    }

    fn identifier(&self, key: &str) -> String {
        format!("file://{}", self.root.join(key).display())
    }
}
