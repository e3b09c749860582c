use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatasetError>;

/// Everything that can go wrong while indexing, loading or transforming samples.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0:?} is not a directory")]
    NotADirectory(PathBuf),
    #[error("could not decode image {path:?}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("malformed config file: {0}")]
    Config(#[from] serde_json::Error),
    #[error("tensor error: {0}")]
    Tensor(#[from] tch::TchError),
}

impl DatasetError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        DatasetError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
