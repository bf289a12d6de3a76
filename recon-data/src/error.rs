//! Error type shared by the data loaders and writers.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing dataset files.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PLY parsing error: {0}")]
    Ply(String),

    #[error("Missing '{property}' at vertex {index}")]
    MissingProperty { property: &'static str, index: usize },

    #[error("Depth hint {}: expected {expected} values, found {found}", .path.display())]
    DepthHintSize {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("Depth buffer has {found} values, {width}x{height} needs {expected}")]
    DepthLength {
        width: usize,
        height: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown dense model type: {0} (expected f, p or d)")]
    UnknownModelKind(String),
}
