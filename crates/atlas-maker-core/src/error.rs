use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("Source image {path} cannot be read: {source}")]
    MissingSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Source image {path} cannot be decoded: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Images do not fit into the atlas (placed {placed} of {total})")]
    PackingOverflow { placed: usize, total: usize },
    #[error("Encoding error: {0}")]
    EncodeFailure(String),
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Nothing to pack")]
    Empty,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AtlasError>;
