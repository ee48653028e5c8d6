use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A cascade resource could not be read. The detector is unusable
    /// without it.
    #[error("failed to read cascade {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cascade resource was read but is not a cascade we can evaluate.
    #[error("invalid cascade {path:?}: {source}")]
    Cascade {
        path: PathBuf,
        #[source]
        source: CascadeError,
    },

    #[error("failed to load image {path:?}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write result to {path:?}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Reasons an OpenCV cascade document is rejected.
#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("malformed xml: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("unsupported cascade: {0}")]
    Unsupported(String),

    #[error("missing <{0}>")]
    Missing(&'static str),

    #[error("bad value in <{element}>: {value:?}")]
    BadValue {
        element: &'static str,
        value: String,
    },

    #[error("{0}")]
    Inconsistent(String),
}

pub type Result<T> = std::result::Result<T, Error>;
