use std::path::PathBuf;

use thiserror::Error;

use super::split::DatasetSplit;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("failed to read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to load image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Invalid split ratios: {message}")]
    InvalidSplitRatios { message: String },

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("invalid shard index {index} for {num_shards} shards")]
    InvalidShard { index: usize, num_shards: usize },

    #[error("split {0:?} not found")]
    MissingSplit(DatasetSplit),
}

impl DatasetError {
    pub(crate) fn read_dir(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::ReadDir { path, source }
    }
}
