mod s3_store;
mod store;

pub use s3_store::{create_s3_client, S3TileStore};
pub use store::{LocalTileStore, TileStore};
